use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::prelude::*;

use wotd_bot::bot::{self, MatchEngine, MerriamWebster, RedditClient, ReplyLedger, Scheduler};
use wotd_bot::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wotd.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("wotd-bot.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file: {e}");
            return ExitCode::FAILURE;
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting wotd-bot...");
    info!("Loaded config from {config_path}");
    if config.dry_run {
        info!("DRY RUN mode enabled");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), bot::Error> {
    // Refuse to start on an unreadable ledger rather than risk double replies
    let ledger = ReplyLedger::load(config.ledger_path())?;

    let http = bot::http_client(&config.credentials.user_agent)
        .map_err(|e| bot::Error::Auth(format!("Failed to build HTTP client: {e}")))?;
    let reddit = RedditClient::login(http.clone(), config.credentials.clone(), bot::SUBREDDIT).await?;
    let username = reddit.username().to_string();

    let engine = MatchEngine::new(reddit, ledger, username, bot::POLL_LIMIT).dry_run(config.dry_run);
    let source = MerriamWebster::new(http);

    Scheduler::new(source, engine, bot::POLL_INTERVAL).run().await
}
