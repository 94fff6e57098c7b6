/// Flowsmith: workflow compiler backend
///
/// Main entry point for the flowsmith server. Initializes configuration and
/// starts the HTTP server with catalog management and execution capabilities.

use flowsmith::{config::Config, server::start_server};

/// Application entry point
///
/// Initializes the server with default configuration and starts listening.
/// The server provides:
/// - Catalog management API at /api/components, /api/workflows, /api/wirings
/// - Execution at /api/workflows/{id}/execute and /api/components/{id}/execute
/// - Async job intake at /api/jobs
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults with FLOWSMITH_* env overrides)
    let config = Config::default();

    // Start the server
    start_server(config).await?;

    Ok(())
}
