//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Mirror a local directory tree or object-store prefix to a destination
#[derive(Parser, Debug)]
#[command(name = "bucketsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Destination: a local path, file:///path or s3://bucket/prefix
    pub destination: String,

    /// Source to mirror (a trailing `/` copies its contents, not the directory itself)
    #[arg(short, long, env = "SRC_DIR")]
    pub source: String,

    /// Object-store access key
    #[arg(long)]
    pub access_key: Option<String>,

    /// Object-store secret key
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Storage class for uploads (STANDARD, GLACIER, ...)
    #[arg(long)]
    pub storage_class: Option<String>,

    /// Number of parallel copy workers
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Multi-part upload part size in MiB
    #[arg(long)]
    pub part_size: Option<u64>,

    /// Compare content hashes of same-size files
    #[arg(long)]
    pub check_md5: bool,

    /// Report what would change without touching the destination
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Descend into subdirectories (`--recursive false` to stay at the top level)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub recursive: Option<bool>,

    /// Accepted for compatibility; has no effect
    #[arg(long)]
    pub force: bool,

    /// Accepted for compatibility; has no effect
    #[arg(long)]
    pub skip_existing: bool,

    /// Configuration file (defaults to ~/.config/bucketsync/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory backing s3:// addresses (one subdirectory per bucket)
    #[arg(long)]
    pub store_root: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("bucketsync").chain(args.iter().copied()))
    }

    #[test]
    fn cli_parse_minimal() {
        let cli = parse(&["--source", "/srv/www/", "s3://bucket/site"]).unwrap();
        assert_eq!(cli.source, "/srv/www/");
        assert_eq!(cli.destination, "s3://bucket/site");
        assert!(!cli.check_md5);
        assert!(cli.recursive.is_none());
        assert!(cli.concurrency.is_none());
    }

    #[test]
    fn cli_parse_all_flags() {
        let cli = parse(&[
            "--source",
            "data",
            "--access-key",
            "AK",
            "--secret-key",
            "SK",
            "--storage-class",
            "GLACIER",
            "--concurrency",
            "8",
            "--part-size",
            "16",
            "--check-md5",
            "--dry-run",
            "--verbose",
            "--recursive",
            "false",
            "--force",
            "--skip-existing",
            "--store-root",
            "/var/lib/store",
            "/backup",
        ])
        .unwrap();

        assert_eq!(cli.access_key.as_deref(), Some("AK"));
        assert_eq!(cli.storage_class.as_deref(), Some("GLACIER"));
        assert_eq!(cli.concurrency, Some(8));
        assert_eq!(cli.part_size, Some(16));
        assert!(cli.check_md5 && cli.dry_run && cli.verbose && cli.force && cli.skip_existing);
        assert_eq!(cli.recursive, Some(false));
        assert_eq!(cli.store_root, Some(PathBuf::from("/var/lib/store")));
        assert_eq!(cli.destination, "/backup");
    }

    #[test]
    fn cli_bare_recursive_flag_means_true() {
        let cli = parse(&["--recursive", "--source", "a", "b"]).unwrap();
        assert_eq!(cli.recursive, Some(true));
    }

    #[test]
    fn cli_requires_destination() {
        assert!(parse(&["--source", "a"]).is_err());
    }
}
