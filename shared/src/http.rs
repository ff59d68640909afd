use axum::Router;
use tokio::net::TcpListener;

/// Binds `host:port` and serves `router` until ctrl-c is received.
pub async fn serve(host: &str, port: u16, router: Router) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    let address = listener.local_addr()?;
    tracing::info!(%address, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, keep serving instead of exiting immediately
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
