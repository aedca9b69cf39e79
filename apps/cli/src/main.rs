//! bucketsync entry point.

mod cli;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::bail;
use bucketsync_engine::{
    DirStore, Plan, SyncConfig, SyncEngine, SyncError, SyncReport, parse_destination,
    parse_source,
};
use bucketsync_protocol::ResourceLocator;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;

/// Exit status for a failed sync.
const EXIT_SYNC_FAILED: u8 = 1;
/// Exit status for unusable arguments or configuration.
const EXIT_USAGE: u8 = 2;

/// Everything resolved from flags and the config file before any I/O.
#[derive(Debug)]
struct Job {
    config: SyncConfig,
    store_root: Option<PathBuf>,
    source: ResourceLocator,
    destination: ResourceLocator,
}

impl Job {
    fn prepare(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        config.apply_flags(cli)?;

        let source = parse_source(&cli.source)?;
        if source.is_local() && !source.as_local_path().exists() {
            bail!("source directory does not exist (SRC_DIR: {})", cli.source);
        }
        let destination = parse_destination(&cli.destination)?;

        let uses_store = source.is_object_store() || destination.is_object_store();
        if uses_store && config.store_root.is_none() {
            bail!("s3:// addresses need --store-root or store_root in the config file");
        }

        Ok(Self {
            config: config.sync,
            store_root: config.store_root,
            source,
            destination,
        })
    }

    async fn run(self) -> anyhow::Result<SyncReport> {
        let verbose = self.config.verbose;
        let mut engine = SyncEngine::new(self.config);
        if let Some(root) = self.store_root {
            engine = engine.with_store(Arc::new(DirStore::new(root)));
        }

        let plan = engine.plan(&self.source, &self.destination).await?;
        if verbose {
            println!("{}", summary_line(&plan));
        }

        Ok(engine.execute(plan, std::io::stdout()).await?)
    }
}

/// The verbose pre-run summary.
fn summary_line(plan: &Plan) -> String {
    format!(
        "{} files to consider - {} bytes",
        plan.considered, plan.estimated_bytes
    )
}

/// Maps a failed run to its exit status.
fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<SyncError>() {
        Some(SyncError::Locator(_) | SyncError::Config(_) | SyncError::NoStore(_)) => EXIT_USAGE,
        _ => EXIT_SYNC_FAILED,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting bucketsync");

    let job = match Job::prepare(&cli) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    tracing::debug!(?job, "configuration resolved");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(EXIT_SYNC_FAILED);
        }
    };

    match rt.block_on(job.run()) {
        Ok(report) => {
            tracing::info!(
                copied = report.copied,
                recopied = report.recopied,
                removed = report.removed,
                "sync complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\nerror: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bucketsync").chain(args.iter().copied())).unwrap()
    }

    fn empty_config(dir: &TempDir) -> String {
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn exit_codes() {
        let usage = anyhow::Error::from(SyncError::Config("bad".into()));
        assert_eq!(exit_code(&usage), EXIT_USAGE);

        let failed = anyhow::Error::from(SyncError::Copy {
            from: "a".into(),
            to: "b".into(),
            reason: "disk full".into(),
        });
        assert_eq!(exit_code(&failed), EXIT_SYNC_FAILED);
    }

    #[test]
    fn summary_line_format() {
        let plan = Plan {
            actions: Vec::new(),
            estimated_bytes: 42,
            considered: 3,
        };
        assert_eq!(summary_line(&plan), "3 files to consider - 42 bytes");
    }

    #[tokio::test]
    async fn summary_counts_planned_work() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("site");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"0123456789").unwrap();
        fs::write(source.join("b.txt"), b"abc").unwrap();
        let destination = dir.path().join("mirror");

        let engine = SyncEngine::new(SyncConfig::default());
        let plan = engine
            .plan(
                &parse_source(&format!("{}/", source.to_string_lossy())).unwrap(),
                &parse_destination(&destination.to_string_lossy()).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(summary_line(&plan), "2 files to consider - 13 bytes");
    }

    #[test]
    fn prepare_rejects_missing_source() {
        let dir = TempDir::new().unwrap();
        let config = empty_config(&dir);
        let missing = dir.path().join("missing").to_string_lossy().into_owned();
        let cli = cli(&["--config", &config, "--source", &missing, "/tmp"]);
        let err = Job::prepare(&cli).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn prepare_requires_store_root_for_s3() {
        let dir = TempDir::new().unwrap();
        let config = empty_config(&dir);
        let source = dir.path().to_string_lossy().into_owned();
        let cli = cli(&["--config", &config, "--source", &source, "s3://bucket"]);
        assert!(Job::prepare(&cli).is_err());
    }

    #[test]
    fn prepare_rejects_unknown_scheme() {
        let dir = TempDir::new().unwrap();
        let config = empty_config(&dir);
        let source = dir.path().to_string_lossy().into_owned();
        let cli = cli(&["--config", &config, "--source", &source, "gs://bucket"]);
        let err = Job::prepare(&cli).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_USAGE);
    }

    #[tokio::test]
    async fn sync_into_directory_store() {
        let dir = TempDir::new().unwrap();
        let config = empty_config(&dir);
        let source = dir.path().join("site");
        fs::create_dir_all(source.join("css")).unwrap();
        fs::write(source.join("index.html"), b"<html>").unwrap();
        fs::write(source.join("css/app.css"), b"body{}").unwrap();
        let store_root = dir.path().join("store");
        fs::create_dir_all(store_root.join("bucket")).unwrap();

        let source_arg = format!("{}/", source.to_string_lossy());
        let store_arg = store_root.to_string_lossy().into_owned();
        let cli = cli(&[
            "--config",
            &config,
            "--source",
            &source_arg,
            "--store-root",
            &store_arg,
            "--check-md5",
            "s3://bucket/www",
        ]);

        let report = Job::prepare(&cli).unwrap().run().await.unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(
            fs::read(store_root.join("bucket/www/css/app.css")).unwrap(),
            b"body{}"
        );

        let again = Job::prepare(&cli).unwrap().run().await.unwrap();
        assert_eq!(again.copied, 0);
        assert_eq!(again.unchanged, 2);
    }
}
