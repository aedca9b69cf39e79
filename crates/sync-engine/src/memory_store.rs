//! In-process object store.
//!
//! Keeps objects in memory, paginates listings with a configurable page
//! size and records every bulk delete, which makes it the store of choice
//! for tests and for embedding the engine without a backend.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bucketsync_protocol::StorageClass;
use bucketsync_transfer::content_hash_reader;

use crate::error::StoreError;
use crate::store::{
    DEFAULT_PAGE_SIZE, ListPage, MAX_DELETE_BATCH, ObjectInfo, ObjectStore, PutOptions,
    StoreFuture, paginate,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    etag: String,
    storage_class: StorageClass,
}

#[derive(Default)]
struct Inner {
    buckets: BTreeMap<String, BTreeMap<String, StoredObject>>,
    delete_calls: Vec<(String, usize)>,
}

/// Object store held entirely in memory.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the listing page size (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.lock().buckets.entry(bucket.to_string()).or_default();
    }

    /// Stores an object directly, bypassing the async interface.
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        let object = StoredObject {
            etag: quoted_etag(&data),
            data,
            storage_class: StorageClass::Unspecified,
        };
        self.lock()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }

    /// Returns a copy of an object's body.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.clone())
    }

    pub fn storage_class(&self, bucket: &str, key: &str) -> Option<StorageClass> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.storage_class)
    }

    /// All keys in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// `(bucket, key count)` for every bulk delete issued so far.
    pub fn delete_calls(&self) -> Vec<(String, usize)> {
        self.lock().delete_calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn quoted_etag(data: &[u8]) -> String {
    // Hashing an in-memory slice cannot fail.
    let hash = content_hash_reader(data, data.len() as u64).unwrap_or_default();
    format!("\"{hash}\"")
}

fn no_such_bucket(bucket: &str) -> StoreError {
    StoreError::NoSuchBucket(bucket.to_string())
}

impl ObjectStore for MemoryStore {
    fn list_page<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        continuation: Option<String>,
    ) -> StoreFuture<'a, ListPage> {
        Box::pin(async move {
            let inner = self.lock();
            let objects = inner.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;

            let matching: Vec<(String, ObjectInfo)> = objects
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, object)| {
                    let info = ObjectInfo {
                        key: key.clone(),
                        size: object.data.len() as u64,
                        etag: object.etag.clone(),
                    };
                    (key.clone(), info)
                })
                .collect();

            let (page, next_token) = paginate(matching, continuation.as_deref(), self.page_size);
            Ok(ListPage {
                objects: page.into_iter().map(|(_, info)| info).collect(),
                next_token,
            })
        })
    }

    fn head<'a>(&'a self, bucket: &'a str, key: &'a str) -> StoreFuture<'a, Option<ObjectInfo>> {
        Box::pin(async move {
            let inner = self.lock();
            let objects = inner.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
            Ok(objects.get(key).map(|object| ObjectInfo {
                key: key.to_string(),
                size: object.data.len() as u64,
                etag: object.etag.clone(),
            }))
        })
    }

    fn get<'a>(&'a self, bucket: &'a str, key: &'a str) -> StoreFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let inner = self.lock();
            let objects = inner.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
            objects
                .get(key)
                .map(|object| object.data.clone())
                .ok_or_else(|| StoreError::NoSuchKey {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
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
            if key.is_empty() {
                return Err(StoreError::InvalidKey(key.to_string()));
            }
            let mut inner = self.lock();
            let objects = inner
                .buckets
                .get_mut(bucket)
                .ok_or_else(|| no_such_bucket(bucket))?;
            objects.insert(
                key.to_string(),
                StoredObject {
                    etag: quoted_etag(&body),
                    data: body,
                    storage_class: options.storage_class,
                },
            );
            Ok(())
        })
    }

    fn delete_batch<'a>(&'a self, bucket: &'a str, keys: Vec<String>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if keys.len() > MAX_DELETE_BATCH {
                return Err(StoreError::BatchTooLarge(keys.len()));
            }
            let mut inner = self.lock();
            let objects = inner
                .buckets
                .get_mut(bucket)
                .ok_or_else(|| no_such_bucket(bucket))?;
            for key in &keys {
                objects.remove(key);
            }
            inner.delete_calls.push((bucket.to_string(), keys.len()));
            Ok(())
        })
    }
}
