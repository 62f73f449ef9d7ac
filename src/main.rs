//! CLI entry point for retriever.
//!
//! Loads configuration from `retriever.yaml` / `RTVR_*` variables, fetches the
//! configured credentials and writes them to stdout. Logs go to stderr.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retriever::output::{OutputFormat, render};
use retriever::{ConfigLoader, fetch, qualified_key};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "retriever")]
#[command(about = "Fetch credentials from AWS Parameter Store or Secrets Manager", long_about = None)]
struct Cli {
    /// Config file to read instead of ./retriever.yaml
    #[arg(long, global = true, env = "RTVR_CONF", value_name = "PATH")]
    conf: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured credential and print the result
    Fetch {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the lookup key of every configured credential without fetching
    Keys,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _log_guard = init_logging()?;

    let cli = Cli::parse();

    let config = ConfigLoader::load_with(cli.conf.as_deref())
        .context("Failed to load retriever configuration")?;

    match cli.command {
        Commands::Fetch { format } => {
            let creds = fetch(&config)
                .await
                .context("Failed to fetch credentials")?;

            let rendered = render(&creds, format)?;
            if !rendered.is_empty() {
                println!("{rendered}");
            }
        }
        Commands::Keys => {
            let kind = config.backend_kind()?;
            info!(backend = %kind, count = config.credentials.len(), "Listing lookup keys");

            for name in &config.credentials {
                println!("{}", qualified_key(config.prefix(), name));
            }
        }
    }

    Ok(())
}

/// Logging setup: colored stderr, plus a JSON rolling log file when
/// `LOG_FILE_PATH` is set.
///
/// The returned guard flushes the file writer on drop.
fn init_logging() -> Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let (json_layer, guard) = match std::env::var("LOG_FILE_PATH") {
        Ok(log_file_path) => {
            let log_dir = Path::new(&log_file_path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("logs"));
            let log_file_name = Path::new(&log_file_path)
                .file_name()
                .unwrap_or(OsStr::new("retriever.log"));

            let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let json_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(non_blocking_file)
                .with_filter(
                    EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?),
                );
            (Some(json_layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}
