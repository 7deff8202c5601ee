use todo_api::adapters::HttpServer;
use todo_api::config::ServerConfig;
use todo_api::core::TodoRepository;
use todo_api::storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    #[cfg(feature = "tracing")]
    {
        tracing_subscriber::fmt()
            .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
            .init();
    }

    let store = storage::open(&config.storage).await?;
    let repo = TodoRepository::new(store);
    if config.seed_sample_data && repo.count().await?.total == 0 {
        repo.seed_sample_data().await?;
    }

    let server = HttpServer::new(repo.clone(), &config).await?;
    let result = server.run(shutdown_signal()).await;
    repo.close().await;
    result
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available; serve until the process is killed
        std::future::pending::<()>().await;
    }
    #[cfg(feature = "tracing")]
    tracing::info!("shutdown signal received");
}
