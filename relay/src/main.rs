use axum::serve;
use classchat_relay::{init_tracing, router, storage::SqliteMessageStore, AppConfig, AppState};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let store = Arc::new(SqliteMessageStore::open(&config.db_path)?);
    let state = AppState::new(config.clone(), store);

    let app = router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, db = %config.db_path, "starting ClassChat relay");

    serve(listener, app).await?;
    Ok(())
}
