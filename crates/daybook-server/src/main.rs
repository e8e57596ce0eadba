use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use daybook_core::{JournalTransactor, SealedStore};
use directories::ProjectDirs;
use tracing::info;

use daybook_server::http::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about = "Encrypted personal journal server", long_about = None)]
struct Cli {
    /// Directory holding the sealed journal file pair
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daybook_server=info,daybook_core=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)?;

    let store = SealedStore::new(data_dir.join("journal.json"), data_dir.join("journal.pub"));
    let state = AppState {
        transactor: Arc::new(JournalTransactor::new(store)),
    };
    let app = http::router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("daybook listening on {addr} (data dir {})", data_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("daybook stopping");
    Ok(())
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "daybook", "daybook")
        .ok_or_else(|| anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
