//! `mocktest`: take timed mock tests from the terminal.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use exam_core::model::TestId;
use services::config::DEFAULT_API_URL;
use services::{ApiConfig, Clock, HttpMockTestApi, MockTestApi, SessionConfig, SessionController};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod render;

#[derive(Parser)]
#[command(name = "mocktest", version, about = "Timed mock tests in the terminal")]
struct Cli {
    /// Base URL of the mock-test API
    #[arg(long, global = true, env = "MOCKTEST_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Bearer token for the API
    #[arg(long, global = true, env = "MOCKTEST_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// SQLite database holding resumable sessions
    #[arg(long, global = true, env = "MOCKTEST_DB_URL", default_value = "sqlite://mocktest.sqlite3")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available mock tests
    List,

    /// Take (or resume) a mock test
    Take {
        /// Test id as shown by `list`
        id: TestId,
    },

    /// Show past attempts
    History,

    /// Show progress across subjects
    Progress,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut api_config = ApiConfig::from_env();
    api_config.base_url = cli.api_url;
    let api_config = api_config.with_token(cli.token);
    tracing::debug!(?api_config, "api configured");
    let api: Arc<dyn MockTestApi> =
        Arc::new(HttpMockTestApi::new(api_config).context("building HTTP client")?);

    match cli.command {
        Commands::History => commands::history::execute(api.as_ref()).await,
        Commands::Progress => commands::progress::execute(api.as_ref()).await,
        Commands::List => {
            let storage = open_storage(&cli.db).await?;
            let mut controller = controller(api, &storage);
            commands::list::execute(&mut controller).await
        }
        Commands::Take { id } => {
            let storage = open_storage(&cli.db).await?;
            let mut controller = controller(api, &storage);
            commands::take::execute(&mut controller, id).await
        }
    }
}

fn controller(api: Arc<dyn MockTestApi>, storage: &Storage) -> SessionController {
    SessionController::new(
        api,
        Arc::clone(&storage.snapshots),
        Clock::default(),
        SessionConfig::from_env(),
    )
}

async fn open_storage(raw: &str) -> Result<Storage> {
    let db_url = normalize_sqlite_url(raw);
    prepare_sqlite_file(&db_url)?;
    Storage::sqlite(&db_url)
        .await
        .with_context(|| format!("opening {db_url}"))
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("data/mock.sqlite3");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/mock.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/x.db"),
            "sqlite:///tmp/x.db"
        );
    }

    #[test]
    fn cli_parses_take_with_global_flags() {
        let cli = Cli::try_parse_from([
            "mocktest",
            "take",
            "6f1c2d3e-0000-4000-8000-000000000001",
            "--api-url",
            "http://example.test/api",
        ])
        .unwrap();
        assert_eq!(cli.api_url, "http://example.test/api");
        assert!(matches!(cli.command, Commands::Take { .. }));
    }

    #[test]
    fn cli_rejects_malformed_test_id() {
        assert!(Cli::try_parse_from(["mocktest", "take", "seven"]).is_err());
    }
}
