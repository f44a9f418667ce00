//! Daemon entry point for the exsheet upload server.
//!
//! Loads configuration from the environment, assembles the extraction
//! pipeline with its conversion and encoding collaborators, and serves the
//! upload endpoint over HTTP.

mod config;

use std::sync::Arc;

use exsheet_convert::DocxMarkupConverter;
use exsheet_core::ExtractionPipeline;
use exsheet_ingest::{ExtractServer, ExtractServerConfig};
use exsheet_xlsx::XlsxEncoder;

use crate::config::ExsheetConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ExsheetConfig::from_args()?;
    let pipeline = Arc::new(ExtractionPipeline::new(DocxMarkupConverter, XlsxEncoder));

    let server_config = ExtractServerConfig::new(config.ingest_addr)
        .with_max_body_bytes(config.max_body_bytes)
        .with_request_timeout(config.request_timeout)
        .with_upload_dir(config.upload_dir);
    let server = ExtractServer::new(pipeline, server_config);
    server.serve().await?;
    Ok(())
}
