use note_relay_server::{startup, AppError, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> note_relay_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully ({})", config.environment);

    let listener = TcpListener::bind(config.bind_address())?;
    info!(
        "Relay ready at ws://{}{}, serving static files from {}",
        config.bind_address(),
        config.websocket.path,
        config.static_files.dir
    );

    let state = AppState::new(config);

    startup::run(listener, state)?
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
