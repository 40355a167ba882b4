//! ihatepdf web service
//!
//! HTTP front-end for the PDF tool suite. Every tool endpoint accepts a
//! multipart upload, runs the in-memory pipeline (range planning, slicing,
//! merging, signature placement, text extraction) and streams the result
//! back as a download. No scratch files are written; uploads live only for
//! the duration of their request.

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod handlers;
mod registry;

/// Command-line arguments for the ihatepdf server
#[derive(Parser, Debug)]
#[command(name = "ihatepdf-server")]
#[command(about = "PDF merge, split, sign and extraction tools over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Public base URL used in robots.txt and sitemap.xml
    #[arg(long, default_value = "https://www.ihatepdf.co")]
    base_url: String,

    /// Maximum upload size in megabytes
    #[arg(long, default_value = "25")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Public base URL for absolute links
    pub base_url: String,
}

/// Build the service router; shared with the handler tests.
fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::handle_health))
        // Crawler surface
        .route("/robots.txt", get(registry::handle_robots))
        .route("/sitemap.xml", get(registry::handle_sitemap))
        .route("/api/tools", get(registry::handle_list_tools))
        // Tool endpoints
        .route("/api/convert", post(handlers::handle_convert))
        .route("/api/merge", post(handlers::handle_merge))
        .route("/api/split", post(handlers::handle_split))
        .route("/api/sign", post(handlers::handle_sign))
        .route("/api/identify-urls", post(handlers::handle_identify_urls))
        // Apply middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ihatepdf server on {}:{}", args.host, args.port);

    let state = AppState {
        base_url: args.base_url.trim_end_matches('/').to_string(),
    };

    let app = build_router(state, args.max_upload_mb * 1024 * 1024);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Upload limit: {} MB", args.max_upload_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
