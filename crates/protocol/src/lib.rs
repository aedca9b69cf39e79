//! Value types shared across the bucketsync workspace.
//!
//! Nothing in this crate performs I/O; the engine and the transfer crate
//! build on these types.

pub mod locator;
pub mod types;

// Re-export primary types for convenience.
pub use locator::{LocatorError, ResourceLocator, Scheme};
pub use types::{Action, ActionKind, InventoryEntry, InvalidStorageClass, StorageClass};
