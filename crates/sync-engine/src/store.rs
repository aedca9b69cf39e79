//! Object-store capability seen by the sync engine.
//!
//! Session, credential and endpoint handling live outside the engine. A
//! backend only has to list a prefix page by page, describe one object,
//! download, upload, and delete keys in bulk. Using a trait keeps the
//! engine decoupled from any SDK and testable with in-process stores.

use std::future::Future;
use std::pin::Pin;

use bucketsync_protocol::StorageClass;

use crate::error::StoreError;

/// Maximum number of keys accepted by one bulk delete.
pub const MAX_DELETE_BATCH: usize = 500;

/// Default number of objects returned per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Boxed future returned by [`ObjectStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Metadata for one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    /// ETag as reported by the store, surrounding quotes included.
    pub etag: String,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    /// Token to pass back for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

/// Upload parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub storage_class: StorageClass,
    /// Multi-part part size hint in bytes (0 = store default).
    pub part_size: u64,
}

/// Abstract object store.
pub trait ObjectStore: Send + Sync {
    /// Lists objects whose key starts with `prefix`, one page at a time.
    fn list_page<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        continuation: Option<String>,
    ) -> StoreFuture<'a, ListPage>;

    /// Returns metadata for `key`, or `None` if it does not exist.
    fn head<'a>(&'a self, bucket: &'a str, key: &'a str) -> StoreFuture<'a, Option<ObjectInfo>>;

    /// Downloads the full body of `key`.
    fn get<'a>(&'a self, bucket: &'a str, key: &'a str) -> StoreFuture<'a, Vec<u8>>;

    /// Uploads `body` to `key`, replacing any existing object.
    fn put<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> StoreFuture<'a, ()>;

    /// Deletes up to [`MAX_DELETE_BATCH`] keys. Missing keys are not an error.
    fn delete_batch<'a>(&'a self, bucket: &'a str, keys: Vec<String>) -> StoreFuture<'a, ()>;
}

/// Lists every object under `prefix`, following continuation tokens.
pub async fn list_all(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<ObjectInfo>, StoreError> {
    let mut objects = Vec::new();
    let mut token = None;
    loop {
        let page = store.list_page(bucket, prefix, token).await?;
        objects.extend(page.objects);
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(objects)
}

/// Selects the page of `keys` (sorted) that follows `continuation`.
///
/// Shared by the bundled backends: the continuation token is the last key
/// of the previous page.
pub(crate) fn paginate<T>(
    sorted: Vec<(String, T)>,
    continuation: Option<&str>,
    page_size: usize,
) -> (Vec<(String, T)>, Option<String>) {
    let mut remaining: Vec<(String, T)> = match continuation {
        Some(after) => sorted
            .into_iter()
            .filter(|(key, _)| key.as_str() > after)
            .collect(),
        None => sorted,
    };

    let page_size = page_size.max(1);
    if remaining.len() > page_size {
        remaining.truncate(page_size);
        let next = remaining.last().map(|(key, _)| key.clone());
        (remaining, next)
    } else {
        (remaining, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<(String, ())> {
        (0..n).map(|i| (format!("k{i:03}"), ())).collect()
    }

    #[test]
    fn paginate_single_page() {
        let (page, next) = paginate(keys(3), None, 10);
        assert_eq!(page.len(), 3);
        assert!(next.is_none());
    }

    #[test]
    fn paginate_follows_token() {
        let (page, next) = paginate(keys(5), None, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(next.as_deref(), Some("k001"));

        let (page, next) = paginate(keys(5), next.as_deref(), 2);
        assert_eq!(page[0].0, "k002");
        assert_eq!(next.as_deref(), Some("k003"));

        let (page, next) = paginate(keys(5), next.as_deref(), 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].0, "k004");
        assert!(next.is_none());
    }

    #[test]
    fn paginate_exact_multiple_ends_without_token() {
        let (page, next) = paginate(keys(4), Some("k001"), 2);
        assert_eq!(page.len(), 2);
        assert!(next.is_none());
    }
}
