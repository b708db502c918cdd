//! Poll daemon: entry point for serving the two-option vote.

mod config;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use poll_admission::AdmissionPolicy;
use poll_rpc::{AppState, PollMetrics, RpcServer};
use poll_store::{MetaStore, StoreError};
use poll_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment, LAYOUT_KEY};
use poll_types::{Clock, SystemClock};
use poll_utils::{init_logging, LogFormat};

use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "poll-daemon", about = "Jjajang vs jjamppong poll daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for ledger storage.
    #[arg(long, global = true, env = "POLL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP port.
    #[arg(long, global = true, env = "POLL_PORT")]
    port: Option<u16>,

    /// Address the HTTP server binds to.
    #[arg(long = "bind", global = true, env = "POLL_BIND")]
    bind_address: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "POLL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "POLL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Subcommand. Defaults to `serve`.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Print the current tally and exit.
    Tally,
    /// Verify ledger integrity and exit.
    Check,
    /// Print the effective configuration as TOML and exit.
    Config,
}

impl Cli {
    /// Merge the optional config file with CLI/env overrides.
    fn resolve_config(&self) -> anyhow::Result<DaemonConfig> {
        let base = match &self.config {
            Some(path) => DaemonConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => DaemonConfig::default(),
        };
        Ok(self.apply_overrides(base))
    }

    fn apply_overrides(&self, base: DaemonConfig) -> DaemonConfig {
        DaemonConfig {
            data_dir: self.data_dir.clone().unwrap_or(base.data_dir),
            bind_address: self.bind_address.clone().unwrap_or(base.bind_address),
            port: self.port.unwrap_or(base.port),
            log_level: self.log_level.clone().unwrap_or(base.log_level),
            log_format: self.log_format.unwrap_or(base.log_format),
            ..base
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let command = cli.command.unwrap_or(Command::Serve);

    if command == Command::Config {
        print!("{}", config.to_toml_string());
        return Ok(());
    }

    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    if let Err(e) = check_data_dir(&config.data_dir) {
        tracing::warn!("{e}");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let environment = LmdbEnvironment::open_with_clock(
        &config.data_dir,
        config.map_size_bytes(),
        Arc::clone(&clock),
    )
    .with_context(|| format!("opening ledger at {}", config.data_dir.display()))?;

    match command {
        Command::Serve => serve(&config, &environment, clock).await,
        Command::Tally => print_tally(&environment, clock),
        Command::Check => run_check(&environment),
        Command::Config => Ok(()),
    }
}

async fn serve(
    config: &DaemonConfig,
    environment: &LmdbEnvironment,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<()> {
    let report = check_integrity(environment)?;
    for error in &report.errors {
        tracing::warn!("integrity: {error}");
    }

    let policy = Arc::new(AdmissionPolicy::new(environment.ledger_store(), clock));
    let tally = policy.current_tally()?;
    tracing::info!(
        jjajang = tally.count_a,
        jjamppong = tally.count_b,
        "ledger ready"
    );

    let metrics = config.enable_metrics.then(|| Arc::new(PollMetrics::new()));
    let state = AppState { policy, metrics };

    RpcServer::new(config.bind_address.clone(), config.port, state)
        .with_allowed_origin(config.allowed_origin.clone())
        .start(shutdown::shutdown_signal())
        .await?;

    tracing::info!("poll daemon stopped");
    Ok(())
}

fn print_tally(environment: &LmdbEnvironment, clock: Arc<dyn Clock>) -> anyhow::Result<()> {
    let policy = AdmissionPolicy::new(environment.ledger_store(), clock);
    let summary = policy.summary()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_check(environment: &LmdbEnvironment) -> anyhow::Result<()> {
    let meta = environment.meta_store();
    let layout = stored_layout(&meta)?;
    println!(
        "schema v{} ({})",
        meta.get_schema_version()?,
        layout.as_deref().unwrap_or("no layout recorded")
    );

    let report = check_integrity(environment)?;
    println!(
        "{} votes, {} origin index entries",
        report.vote_entries, report.index_entries
    );
    if report.is_healthy() {
        println!("ok");
        return Ok(());
    }
    for error in &report.errors {
        eprintln!("error: {error}");
    }
    if report.suppressed > 0 {
        eprintln!("... and {} more", report.suppressed);
    }
    anyhow::bail!(
        "ledger integrity check failed ({} problems)",
        report.errors.len() + report.suppressed
    )
}

/// The recorded key layout. Only a missing key is tolerated.
fn stored_layout(meta: &impl MetaStore) -> Result<Option<String>, StoreError> {
    match meta.get_meta(LAYOUT_KEY) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_values() {
        let cli = Cli::parse_from(["poll-daemon", "--port", "9000", "--log-format", "json", "serve"]);
        let base = DaemonConfig::from_toml_str("port = 4000\nbind_address = \"127.0.0.1\"").unwrap();
        let config = cli.apply_overrides(base);
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(cli.command, Some(Command::Serve));
    }

    #[test]
    fn subcommand_defaults_to_none() {
        let cli = Cli::parse_from(["poll-daemon"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["poll-daemon", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    /// Meta table that fails every read with the given error.
    struct FailingMeta(fn() -> StoreError);

    impl MetaStore for FailingMeta {
        fn put_meta(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
            Err((self.0)())
        }

        fn get_meta(&self, _key: &str) -> Result<Vec<u8>, StoreError> {
            Err((self.0)())
        }

        fn get_schema_version(&self) -> Result<u32, StoreError> {
            Err((self.0)())
        }

        fn set_schema_version(&self, _version: u32) -> Result<(), StoreError> {
            Err((self.0)())
        }
    }

    #[test]
    fn stored_layout_reads_migrated_environment() {
        let dir = tempfile::tempdir().unwrap();
        let environment = LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        let layout = stored_layout(&environment.meta_store()).unwrap().unwrap();
        assert!(layout.contains("blake2b256"), "{layout}");
    }

    #[test]
    fn stored_layout_tolerates_only_missing_key() {
        let missing = FailingMeta(|| StoreError::NotFound("layout".into()));
        assert!(stored_layout(&missing).unwrap().is_none());

        let broken = FailingMeta(|| StoreError::Backend("mdb_get: EIO".into()));
        assert!(matches!(stored_layout(&broken), Err(StoreError::Backend(_))));

        let unreadable = FailingMeta(|| StoreError::Unavailable("switched off".into()));
        assert!(matches!(stored_layout(&unreadable), Err(StoreError::Unavailable(_))));
    }
}
