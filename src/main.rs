use chat_app_demo::{build_app, config::Config, logging, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    run().await.inspect_err(|err| {
        error!(error = %err, "server failed");
    })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.port,
        mcp_path = %config.path,
        "server starting"
    );

    let app = build_app(AppState::new(config));
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
