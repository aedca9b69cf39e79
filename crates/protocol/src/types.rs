use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::locator::ResourceLocator;

/// One file discovered while walking a directory or listing a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Path or key exactly as enumerated, before normalization.
    pub name: String,
    pub size: u64,
    /// Content digest or store ETag (quotes included). Empty when unknown.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

impl InventoryEntry {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            checksum: String::new(),
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = checksum.into();
        self
    }
}

/// What a worker should do with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Copy,
    VerifyChecksum,
    Remove,
}

/// A unit of queued work produced by the diff step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResourceLocator>,
    pub destination: ResourceLocator,
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected_checksum: String,
}

impl Action {
    pub fn copy(source: ResourceLocator, destination: ResourceLocator, size: u64) -> Self {
        Self {
            kind: ActionKind::Copy,
            source: Some(source),
            destination,
            size,
            expected_checksum: String::new(),
        }
    }

    pub fn verify(
        source: ResourceLocator,
        destination: ResourceLocator,
        size: u64,
        expected_checksum: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActionKind::VerifyChecksum,
            source: Some(source),
            destination,
            size,
            expected_checksum: expected_checksum.into(),
        }
    }

    pub fn remove(destination: ResourceLocator) -> Self {
        Self {
            kind: ActionKind::Remove,
            source: None,
            destination,
            size: 0,
            expected_checksum: String::new(),
        }
    }
}

/// Error returned for a storage class outside the accepted set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid storage class provided: {0}")]
pub struct InvalidStorageClass(pub String);

/// Storage classes accepted for uploads. `Unspecified` leaves the choice to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    #[serde(rename = "STANDARD")]
    Standard,
    #[serde(rename = "REDUCED_REDUNDANCY")]
    ReducedRedundancy,
    #[serde(rename = "GLACIER")]
    Glacier,
    #[serde(rename = "STANDARD_IA")]
    StandardIa,
    #[serde(rename = "ONEZONE_IA")]
    OnezoneIa,
    #[serde(rename = "INTELLIGENT_TIERING")]
    IntelligentTiering,
    #[serde(rename = "DEEP_ARCHIVE")]
    DeepArchive,
}

impl StorageClass {
    pub const ALL: [StorageClass; 8] = [
        StorageClass::Unspecified,
        StorageClass::Standard,
        StorageClass::ReducedRedundancy,
        StorageClass::Glacier,
        StorageClass::StandardIa,
        StorageClass::OnezoneIa,
        StorageClass::IntelligentTiering,
        StorageClass::DeepArchive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageClass::Unspecified => "",
            StorageClass::Standard => "STANDARD",
            StorageClass::ReducedRedundancy => "REDUCED_REDUNDANCY",
            StorageClass::Glacier => "GLACIER",
            StorageClass::StandardIa => "STANDARD_IA",
            StorageClass::OnezoneIa => "ONEZONE_IA",
            StorageClass::IntelligentTiering => "INTELLIGENT_TIERING",
            StorageClass::DeepArchive => "DEEP_ARCHIVE",
        }
    }
}

impl FromStr for StorageClass {
    type Err = InvalidStorageClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| InvalidStorageClass(s.to_string()))
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
