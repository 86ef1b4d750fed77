use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use initiative_insights::{create_router, AppState, BackendClient, Config};

#[derive(Parser)]
#[command(name = "initiative-insights")]
#[command(about = "Activity aggregation and automation scoring API for the initiatives dashboard")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "initiative-insights.toml")]
    config: PathBuf,

    /// HTTP port (overrides config file)
    #[arg(short, long, env = "INSIGHTS_PORT")]
    port: Option<u16>,

    /// Initiatives backend root URL (overrides config file)
    #[arg(long, env = "INSIGHTS_BACKEND_URL")]
    backend_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("initiative_insights=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    info!("Config file: {}", cli.config.display());

    let mut config = Config::load(&cli.config)?;

    // Apply CLI overrides
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.backend_url {
        config.backend.base_url = url;
    }

    let backend = BackendClient::new(&config.backend.base_url, config.backend.timeout())?;
    info!("Backend: {}", backend.base_url());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(AppState::new(backend, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
