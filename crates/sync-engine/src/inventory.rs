//! Inventory collection for both sides of a sync.
//!
//! Every entry is keyed by its destination-relative name so the two sides
//! can be compared key by key. The source drops its own root and takes on
//! the destination base instead; the destination is keyed by its raw names.

use std::collections::BTreeMap;
use std::io::ErrorKind;

use bucketsync_file_ops::walk_files;
use bucketsync_protocol::{InventoryEntry, ResourceLocator};
use tracing::debug;

use crate::error::SyncError;
use crate::store::{ObjectStore, list_all};

/// Normalized key → entry.
pub type Inventory = BTreeMap<String, InventoryEntry>;

/// How source names are rewritten into destination keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    /// Bytes removed from the front of each source name.
    pub source_drop: usize,
    /// Prepended to what remains of each source name.
    pub source_prefix: String,
    /// Destination root with a trailing `/` (empty for a bucket root).
    pub destination_base: String,
}

/// Both inventories for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventories {
    pub source: Inventory,
    pub destination: Inventory,
    /// The source resolved to a single file rather than a tree.
    pub single_file: bool,
}

/// The string inventory names are built from: the key for object stores,
/// the path for local trees.
fn root_of(locator: &ResourceLocator) -> &str {
    if locator.is_object_store() {
        locator.key()
    } else {
        locator.path()
    }
}

/// Computes the prefix arithmetic for syncing `source` into `destination`.
///
/// A source root without a trailing `/` is copied as a directory of its own
/// (`site` lands in `<dst>/site/`), one with a trailing `/` has its contents
/// copied straight into the destination.
pub fn key_layout(source: &ResourceLocator, destination: &ResourceLocator) -> KeyLayout {
    let mut destination_base = root_of(destination).to_string();
    if !destination_base.is_empty() && !destination_base.ends_with('/') {
        destination_base.push('/');
    }

    let root = root_of(source);
    let mut source_drop = root.len();
    let mut source_prefix = destination_base.clone();
    if !root.is_empty() && !root.ends_with('/') {
        source_drop += 1;
        if let Some(name) = source.file_name() {
            if name != "." && name != ".." {
                source_prefix.push_str(name);
                source_prefix.push('/');
            }
        }
    }

    KeyLayout {
        source_drop,
        source_prefix,
        destination_base,
    }
}

/// Enumerates `locator` into an inventory keyed by
/// `add_prefix + name[drop..]`.
///
/// Local roots that do not exist yield an empty inventory. Object-store
/// listings skip directory markers and keys that only share a textual
/// prefix with the root (`foo` never picks up `foobar/x`).
pub async fn build_inventory(
    locator: &ResourceLocator,
    drop: usize,
    add_prefix: &str,
    recursive: bool,
    store: Option<&dyn ObjectStore>,
) -> Result<Inventory, SyncError> {
    let mut inventory = Inventory::new();

    if locator.is_local() {
        let root = locator.as_local_path().to_path_buf();
        let walked = tokio::task::spawn_blocking(move || walk_files(&root, recursive)).await?;
        let files = match walked {
            Ok(files) => files,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(root = %locator, "local root does not exist, treating as empty");
                Vec::new()
            }
            Err(error) => {
                return Err(SyncError::Walk {
                    path: locator.to_string(),
                    error,
                });
            }
        };

        for file in files {
            let Some(rest) = file.name.get(drop..) else {
                continue;
            };
            inventory.insert(
                format!("{add_prefix}{rest}"),
                InventoryEntry::new(file.name, file.size),
            );
        }
        return Ok(inventory);
    }

    let store = store.ok_or_else(|| SyncError::NoStore(locator.to_string()))?;
    let prefix = locator.key();
    let objects = list_all(store, locator.bucket(), prefix)
        .await
        .map_err(|error| SyncError::Listing {
            locator: locator.to_string(),
            error,
        })?;

    let boundary = prefix.trim_end_matches('/').len();
    for object in objects {
        let name = object.key;
        if name.ends_with('/') {
            continue;
        }
        if boundary > 0 && name.len() > boundary && name.as_bytes()[boundary] != b'/' {
            continue;
        }
        let Some(rest) = name.get(drop..) else {
            continue;
        };
        if !recursive && rest.contains('/') {
            continue;
        }
        let key = format!("{add_prefix}{rest}");
        inventory.insert(
            key,
            InventoryEntry::new(name, object.size).with_checksum(object.etag),
        );
    }

    debug!(root = %locator, entries = inventory.len(), "listed object store prefix");
    Ok(inventory)
}

/// Describes `locator` when it names a single file or object.
///
/// Returns `None` for directories, prefixes and anything that does not
/// exist.
pub async fn stat_single(
    locator: &ResourceLocator,
    store: Option<&dyn ObjectStore>,
) -> Result<Option<InventoryEntry>, SyncError> {
    if locator.is_local() {
        return Ok(match tokio::fs::metadata(locator.as_local_path()).await {
            Ok(metadata) if metadata.is_file() => {
                Some(InventoryEntry::new(locator.path(), metadata.len()))
            }
            _ => None,
        });
    }

    let key = locator.key();
    if key.is_empty() || key.ends_with('/') {
        return Ok(None);
    }
    let store = store.ok_or_else(|| SyncError::NoStore(locator.to_string()))?;
    let info = store
        .head(locator.bucket(), key)
        .await
        .map_err(|error| SyncError::Listing {
            locator: locator.to_string(),
            error,
        })?;
    Ok(info.map(|info| InventoryEntry::new(info.key, info.size).with_checksum(info.etag)))
}

/// Whether any object lives under `<key>/` for an object-store locator.
async fn has_objects_below(
    locator: &ResourceLocator,
    store: Option<&dyn ObjectStore>,
) -> Result<bool, SyncError> {
    if locator.is_local() {
        return Ok(false);
    }
    let store = store.ok_or_else(|| SyncError::NoStore(locator.to_string()))?;
    let prefix = format!("{}/", locator.key());
    let page = store
        .list_page(locator.bucket(), &prefix, None)
        .await
        .map_err(|error| SyncError::Listing {
            locator: locator.to_string(),
            error,
        })?;
    Ok(!page.objects.is_empty())
}

/// Builds the source and destination inventories for one run.
///
/// A source that is a single file is compared against its one target key
/// only, so nothing else in the destination is ever removed. An object whose
/// key is also a non-empty prefix (`site` next to `site/a.txt`) is synced as
/// the prefix. With
/// `recursive` off, the destination is restricted to the level the source
/// files land on.
pub async fn collect(
    source: &ResourceLocator,
    destination: &ResourceLocator,
    recursive: bool,
    store: Option<&dyn ObjectStore>,
) -> Result<Inventories, SyncError> {
    let layout = key_layout(source, destination);

    let single = match stat_single(source, store).await? {
        Some(entry) if !has_objects_below(source, store).await? => Some(entry),
        _ => None,
    };
    if let Some(entry) = single {
        let name = source.file_name().unwrap_or_default();
        let key = format!("{}{name}", layout.destination_base);

        let mut destination_inventory = Inventory::new();
        if let Some(existing) = stat_single(&destination.with_path(key.clone()), store).await? {
            destination_inventory.insert(key.clone(), existing);
        }

        let mut source_inventory = Inventory::new();
        source_inventory.insert(key, entry);
        return Ok(Inventories {
            source: source_inventory,
            destination: destination_inventory,
            single_file: true,
        });
    }

    let source_inventory = build_inventory(
        source,
        layout.source_drop,
        &layout.source_prefix,
        recursive,
        store,
    )
    .await?;

    let mut destination_inventory = build_inventory(destination, 0, "", true, store).await?;
    if !recursive {
        destination_inventory.retain(|key, _| {
            key.strip_prefix(layout.source_prefix.as_str())
                .is_some_and(|rest| !rest.contains('/'))
        });
    }

    debug!(
        source = %source,
        destination = %destination,
        source_entries = source_inventory.len(),
        destination_entries = destination_inventory.len(),
        "inventories built"
    );

    Ok(Inventories {
        source: source_inventory,
        destination: destination_inventory,
        single_file: false,
    })
}
