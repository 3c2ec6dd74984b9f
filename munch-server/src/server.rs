//! munch-server/src/server.rs
//!
//! Builds the ServerContext and runs the HTTP API until ctrl-c.

use std::net::SocketAddr;
use std::time::Duration;

use axum_server::{Handle, Server};
use tracing::{error, info};
use munch_core::Error;

use crate::Args;
use crate::context::ServerContext;
use crate::routes;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub async fn run_server(args: Args) -> Result<(), Error> {
    let addr: SocketAddr = args
        .server_addr
        .parse()
        .map_err(|e| Error::InvalidInput(format!("server_addr '{}': {e}", args.server_addr)))?;

    let ctx = ServerContext::new(&args).await?;
    let app = routes::router(ctx.services.clone());

    let handle = Handle::new();
    let handle_clone = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        info!("Ctrl-C received; shutting down HTTP API.");
        handle_clone.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!("Munch HTTP API listening on http://{}", addr);
    Server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    if let Some(db) = ctx.db.as_ref() {
        db.close().await;
    }
    info!("HTTP API shut down.");
    Ok(())
}
