//! Object store backed by a local directory.
//!
//! Each bucket is a directory under the store root and each key a file
//! below it. ETags are the quoted content hash, the same value a real
//! object store reports for an upload of that body.

use std::path::{Component, Path, PathBuf};

use bucketsync_file_ops::{walk_files, write_file};
use bucketsync_transfer::content_hash;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{
    DEFAULT_PAGE_SIZE, ListPage, MAX_DELETE_BATCH, ObjectInfo, ObjectStore, PutOptions,
    StoreFuture, paginate,
};

/// Directory-backed object store rooted at `root`.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    page_size: usize,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory for `bucket` if it does not exist yet.
    pub fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        validate_bucket(bucket)?;
        std::fs::create_dir_all(self.root.join(bucket))?;
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        validate_bucket(bucket)?;
        let dir = self.root.join(bucket);
        if !dir.is_dir() {
            return Err(StoreError::NoSuchBucket(bucket.to_string()));
        }
        Ok(dir)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.bucket_dir(bucket)?.join(key))
    }
}

fn validate_bucket(bucket: &str) -> Result<(), StoreError> {
    if bucket.is_empty() || bucket.contains('/') || bucket == "." || bucket == ".." {
        return Err(StoreError::Backend(format!("invalid bucket name: {bucket}")));
    }
    Ok(())
}

/// Rejects keys that would resolve outside the bucket directory.
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.ends_with('/') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }

    let path = Path::new(key);
    if path.is_absolute() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }

    for component in path.components() {
        match component {
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                return Err(StoreError::InvalidKey(key.to_string()));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}

fn describe(path: &Path, key: String) -> Result<ObjectInfo, StoreError> {
    let size = std::fs::metadata(path)?.len();
    let hash = content_hash(path).map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(ObjectInfo {
        key,
        size,
        etag: format!("\"{hash}\""),
    })
}

/// Sorted keys under `prefix`, without reading any object content.
fn list_keys(dir: &Path, prefix: &str) -> Result<Vec<(String, ())>, StoreError> {
    let root_str = dir.to_string_lossy().into_owned();
    let mut keys: Vec<(String, ())> = walk_files(dir, true)?
        .into_iter()
        .map(|file| {
            file.name
                .strip_prefix(root_str.as_str())
                .unwrap_or(&file.name)
                .trim_start_matches('/')
                .to_string()
        })
        .filter(|key| key.starts_with(prefix))
        .map(|key| (key, ()))
        .collect();
    keys.sort();
    Ok(keys)
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
}

impl ObjectStore for DirStore {
    fn list_page<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        continuation: Option<String>,
    ) -> StoreFuture<'a, ListPage> {
        Box::pin(async move {
            let dir = self.bucket_dir(bucket)?;
            let prefix = prefix.to_string();
            let page_size = self.page_size;

            // Only the keys on this page are hashed.
            blocking(move || {
                let keys = list_keys(&dir, &prefix)?;
                let (page, next_token) = paginate(keys, continuation.as_deref(), page_size);
                let objects = page
                    .into_iter()
                    .map(|(key, ())| describe(&dir.join(&key), key))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ListPage {
                    objects,
                    next_token,
                })
            })
            .await
        })
    }

    fn head<'a>(&'a self, bucket: &'a str, key: &'a str) -> StoreFuture<'a, Option<ObjectInfo>> {
        Box::pin(async move {
            let path = self.object_path(bucket, key)?;
            if !path.is_file() {
                return Ok(None);
            }
            let key = key.to_string();
            blocking(move || describe(&path, key)).await.map(Some)
        })
    }

    fn get<'a>(&'a self, bucket: &'a str, key: &'a str) -> StoreFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let path = self.object_path(bucket, key)?;
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(data),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NoSuchKey {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn put<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = self.object_path(bucket, key)?;
            debug!(
                bucket,
                key,
                bytes = body.len(),
                storage_class = options.storage_class.as_str(),
                "put object"
            );
            blocking(move || write_file(&path, &body).map_err(StoreError::from)).await
        })
    }

    fn delete_batch<'a>(&'a self, bucket: &'a str, keys: Vec<String>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if keys.len() > MAX_DELETE_BATCH {
                return Err(StoreError::BatchTooLarge(keys.len()));
            }
            let dir = self.bucket_dir(bucket)?;
            for key in &keys {
                validate_key(key)?;
            }

            blocking(move || {
                for key in &keys {
                    match std::fs::remove_file(dir.join(key)) {
                        Ok(()) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(())
            })
            .await
        })
    }
}
