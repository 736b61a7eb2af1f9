use clap::Parser;
use hearth_core::config::HearthConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod app;
mod http;

/// Web backend relaying browser chat to a local Ollama server.
#[derive(Parser, Debug)]
#[command(name = "hearth-gateway", version)]
struct Args {
    /// Config file (default: $HEARTH_CONFIG, then ./hearth.toml).
    #[arg(long)]
    config: Option<String>,
    /// Override gateway.bind.
    #[arg(long)]
    bind: Option<String>,
    /// Override gateway.port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hearth_gateway=info,hearth_agent=info,tower_http=debug".into()
            }),
        )
        .init();

    let args = Args::parse();

    // load config: --config > HEARTH_CONFIG env > ./hearth.toml
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("HEARTH_CONFIG").ok());
    let mut config = HearthConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        HearthConfig::default()
    });
    if let Some(bind) = args.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    ensure_dir(&config.web.uploads_dir)?;
    ensure_dir(&config.web.static_dir)?;

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;

    let state = Arc::new(app::AppState::new(config));
    info!(
        endpoint = %state.relay.endpoint(),
        model = %state.relay.model(),
        "Ollama relay configured"
    );
    info!(
        static_dir = %state.config.web.static_dir,
        uploads_dir = %state.config.web.uploads_dir,
        "serving web files"
    );

    let router = app::build_router(state);

    info!("Hearth gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Create a directory (and parents) if it does not exist yet.
fn ensure_dir(path: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
