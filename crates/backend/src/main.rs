pub mod api;
pub mod routes;
pub mod shared;
pub mod system;
pub mod usecases;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    system::tracing::initialize()?;

    let config = shared::config::load_config()?;

    // One session for the whole process; a failure here is reported by the
    // upload endpoints instead of stopping the server
    let state = Arc::new(system::state::AppState::connect(&config.sheets).await);

    let static_dir = shared::config::resolve_path(&config.server.static_dir);
    tracing::info!("Serving upload form from {}", static_dir.display());

    let app = routes::configure_routes(state, &static_dir.to_string_lossy());

    let addr: SocketAddr = ([0, 0, 0, 0], config.server.port).into();

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port {} is already in use. Please ensure no other process is using this port.",
                    config.server.port
                );
            } else {
                tracing::error!("Failed to bind to port {}. Error: {}", config.server.port, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
