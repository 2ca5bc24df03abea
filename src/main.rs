// Linked Spatial Index server entry point. Loads the process config,
// opens the Index Manager's data directory, and serves the HTTP shell.

use lsi::config::ServiceConfig;
use lsi::manager::IndexManager;
use lsi::Result;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    print_banner();

    let install_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let config = ServiceConfig::load(&install_dir);

    info!(data_dir = %config.data_dir.display(), bind_addr = %config.bind_addr, "starting linked spatial index");

    let manager = Arc::new(IndexManager::new(config.data_dir.clone())?);
    let app = lsi::http::router(manager);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server terminated");
    }

    Ok(())
}

fn print_banner() {
    println!(
        r#"
 _     ____  ___
| |   / ___||_ _|
| |   \___ \ | |
| |___ ___) || |
|_____|____/|___|  linked spatial index
"#
    );
}
