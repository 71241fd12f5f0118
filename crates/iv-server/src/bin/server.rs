use tracing_subscriber::EnvFilter;

use iv_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iv_server=info,iv_optimizer=info,iv_data=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    run_server(config).await
}
