pub mod config;
pub mod errors;
pub mod invoice;
pub mod mcp;
pub mod sheets;

use std::sync::Arc;

use crate::errors::InvoiceParserResult;
use crate::mcp::server::McpServer;
use crate::mcp::stdio_transport::StdioTransport;
use crate::sheets::auth::{ServiceAccountAuth, SPREADSHEETS_SCOPE};
use crate::sheets::google::GoogleSheetsStore;
use crate::sheets::SheetWriter;

/// Starts the stdio server. Returns once stdin closes or Ctrl-C is received;
/// configuration and credential problems fail before any request is read.
pub async fn run() -> InvoiceParserResult<()> {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cfg = config::load_config()?;
    let auth = ServiceAccountAuth::from_file(&cfg.credentials_path, SPREADSHEETS_SCOPE)?;
    let store = Arc::new(GoogleSheetsStore::new(cfg.spreadsheet_id.clone(), auth));
    let writer = Arc::new(SheetWriter::new(store, cfg.sheet_name.clone()));
    let server = McpServer::new(writer)?;

    tracing::info!(server = mcp::server::SERVER_NAME, "MCP server running on stdio");
    server.serve(StdioTransport::stdio(), interrupted()).await?;
    tracing::info!("MCP server stopped");
    Ok(())
}

/// Resolves on the first Ctrl-C. If the handler cannot be installed the
/// server keeps running until stdin closes.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
