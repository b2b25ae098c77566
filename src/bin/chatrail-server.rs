// ABOUTME: Server binary for the chatrail chat API
// ABOUTME: Loads env config, initializes logging and serves the axum router until ctrl-c
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Chatrail Server Binary
//!
//! Starts the HTTP API with the database, cache and feature flag providers
//! configured from the environment.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chatrail_server::{config::ServerConfig, context::ServerContext, logging, routes};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "chatrail-server")]
#[command(about = "Chatrail - feature-flag-driven chat API")]
pub struct Args {
    /// Override HTTP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the feature flag file path
    #[arg(long)]
    flags: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(flags) = args.flags {
        config.feature_flags.path = flags;
    }

    logging::init_from_env()?;
    info!("{}", config.summary());

    let address = config.bind_address();
    let context = ServerContext::from_config(config).await?;
    let app = routes::router(&context);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Chatrail server listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Chatrail server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
