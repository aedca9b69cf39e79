//! Local filesystem primitives for the sync engine.
//!
//! Tree walking for inventories, file copies that create their parent
//! directories, and best-effort deletion for the remove worker.

mod copy;
mod delete;
mod walk;

pub use copy::{copy_file, write_file};
pub use delete::remove_file_best_effort;
pub use walk::{WalkedFile, join_name, walk_files};

/// Returns the user's home directory.
pub fn home_dir() -> std::path::PathBuf {
    std::env::var("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("/tmp"))
}

/// Expands a `~` prefix to the user's home directory.
pub fn expand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        std::path::PathBuf::from(path)
    }
}
