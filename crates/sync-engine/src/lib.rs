//! One-way mirror engine between local trees and object-store prefixes.
//!
//! # Pipeline
//!
//! 1. **Inventory**: walk the local tree or list the store prefix on each side
//! 2. **Classify**: compare the inventories key by key into copy, verify and
//!    remove actions
//! 3. **Execute**: drain the action queues with the copy, verify and remove
//!    workers while the progress line repaints
//!
//! Object stores are reached through the [`ObjectStore`] trait; the crate
//! ships an in-memory and a directory-backed implementation.

pub mod classify;
pub mod config;
pub mod copier;
pub mod dir_store;
pub mod error;
pub mod inventory;
pub mod memory_store;
pub mod store;
pub mod sync;
mod workers;

// Re-export primary types for convenience.
pub use classify::{Plan, classify};
pub use config::{DEFAULT_CONCURRENCY, SyncConfig};
pub use copier::Transfers;
pub use dir_store::DirStore;
pub use error::{StoreError, SyncError};
pub use inventory::{Inventories, Inventory, KeyLayout, build_inventory, collect, key_layout};
pub use memory_store::MemoryStore;
pub use store::{ListPage, MAX_DELETE_BATCH, ObjectInfo, ObjectStore, PutOptions, list_all};
pub use sync::{SyncEngine, SyncReport, parse_destination, parse_source};
