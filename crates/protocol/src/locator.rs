//! Uniform addressing for local paths and object-store locations.
//!
//! A [`ResourceLocator`] is a pure value: parsing, path substitution and
//! joining never touch the filesystem or the network.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors produced while parsing an address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    #[error("empty address")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("object-store address has no bucket: {0}")]
    MissingBucket(String),
}

/// Storage kind a locator points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Local,
    ObjectStore,
}

impl Scheme {
    /// URL scheme prefix used in the canonical string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Local => "file",
            Scheme::ObjectStore => "s3",
        }
    }
}

/// Address of a file tree or object prefix.
///
/// Object-store locators always carry a non-empty bucket; the constructors
/// and the parser enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocator {
    scheme: Scheme,
    bucket: String,
    path: String,
}

impl ResourceLocator {
    /// Creates a local filesystem locator.
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::Local,
            bucket: String::new(),
            path: path.into(),
        }
    }

    /// Creates an object-store locator. Fails when `bucket` is empty.
    pub fn object_store(
        bucket: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<Self, LocatorError> {
        let bucket = bucket.into();
        let path = path.into();
        if bucket.is_empty() {
            return Err(LocatorError::MissingBucket(format!("s3://{path}")));
        }
        Ok(Self {
            scheme: Scheme::ObjectStore,
            bucket,
            path: canonical_key_path(path),
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Bucket name (empty for local locators).
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_local(&self) -> bool {
        self.scheme == Scheme::Local
    }

    pub fn is_object_store(&self) -> bool {
        self.scheme == Scheme::ObjectStore
    }

    /// Object key: the path without its leading separator.
    pub fn key(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }

    /// The path as a local filesystem path.
    pub fn as_local_path(&self) -> &Path {
        Path::new(&self.path)
    }

    /// Returns a locator with the same scheme and bucket but a different path.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            scheme: self.scheme,
            bucket: self.bucket.clone(),
            path: match self.scheme {
                Scheme::Local => path,
                Scheme::ObjectStore => canonical_key_path(path),
            },
        }
    }

    /// Appends a relative component, inserting a single `/` between the parts.
    pub fn join(&self, relative: &str) -> Self {
        let relative = relative.trim_start_matches('/');
        let path = if self.path.is_empty() {
            relative.to_string()
        } else if self.path.ends_with('/') {
            format!("{}{relative}", self.path)
        } else {
            format!("{}/{relative}", self.path)
        };
        self.with_path(path)
    }

    /// Defaults an empty path to the root (`/`).
    pub fn or_root(self) -> Self {
        if self.path.is_empty() {
            self.with_path("/")
        } else {
            self
        }
    }

    /// Last path component, ignoring a trailing separator.
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }

    pub fn has_trailing_separator(&self) -> bool {
        self.path.ends_with('/')
    }
}

/// Object-store paths are stored with a leading `/` (empty stays empty) so
/// that a locator built from a bare key equals its parsed string form.
fn canonical_key_path(path: String) -> String {
    if path.is_empty() || path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

impl FromStr for ResourceLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(LocatorError::Empty);
        }

        let Some((scheme, rest)) = s.split_once("://") else {
            return Ok(Self::local(s));
        };

        match scheme {
            "" | "file" => Ok(Self::local(rest)),
            "s3" => {
                let (bucket, path) = match rest.find('/') {
                    Some(idx) => (&rest[..idx], &rest[idx..]),
                    None => (rest, ""),
                };
                if bucket.is_empty() {
                    return Err(LocatorError::MissingBucket(s.to_string()));
                }
                Self::object_store(bucket, path)
            }
            other => Err(LocatorError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::Local => f.write_str(&self.path),
            Scheme::ObjectStore => {
                write!(f, "{}://{}{}", self.scheme.as_str(), self.bucket, self.path)
            }
        }
    }
}

impl Serialize for ResourceLocator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceLocator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
