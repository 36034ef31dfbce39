use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use novel_slides::app::functions::Functions;
use novel_slides::app::impressions::ImpressionLogger;
use novel_slides::app::queue::TaskQueue;
use novel_slides::app::sqlite_store::SqliteStore;
use novel_slides::app::store::ReaderStore;
use novel_slides::segment::{WORD_LIMIT_ENV, parse_default_word_limit};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// SQLite database file (created if missing).
    #[arg(long, default_value = "novel-slides.db")]
    database: PathBuf,

    /// Background jobs recording ad impressions at once.
    #[arg(long, default_value_t = 4)]
    impression_concurrency: usize,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    novel_slides::logging::init("info")?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting novel-slides-app");

    let store: Arc<dyn ReaderStore> =
        Arc::new(SqliteStore::open(&args.database).context("open store")?);
    let impressions = ImpressionLogger::new(
        Arc::clone(&store),
        TaskQueue::new(args.impression_concurrency),
    );
    let word_limit = parse_default_word_limit(std::env::var(WORD_LIMIT_ENV).ok().as_deref());
    let functions = Functions::new(store, impressions.clone()).with_default_word_limit(word_limit);

    let app = novel_slides::app::http::router(functions);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, word_limit, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("draining ad impression jobs");
    impressions.flush().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(?err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(?err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
