/// Configuration management for the flowsmith backend
///
/// Handles server binding, database location, engine endpoints and the job
/// channel, with environment-variable overrides for container deployment.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// External engine configuration
    pub engine: EngineConfig,
    /// Async job channel configuration
    pub jobs: JobConfig,
    /// Adapter catalog configuration
    pub adapters: AdapterConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g. "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// SQLite catalog database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (default: "sqlite://data/catalog.db?mode=rwc")
    pub url: String,
}

/// External execution engine and code generator endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Execution endpoint the compiled plans are posted to
    pub execution_url: String,
    /// Code-generation endpoint for component code
    pub codegen_url: String,
    /// When false, execution answers with a sentinel instead of calling out
    pub enabled: bool,
    /// Timeout for engine and codegen calls in seconds
    pub timeout_secs: u64,
}

/// Bounded job channel sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Capacity of the inbound job queue
    pub queue_capacity: usize,
}

/// Adapter catalog seeding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Optional JSON file with adapter metadata to seed the catalog from
    pub file: Option<String>,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("FLOWSMITH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("FLOWSMITH_PORT")
                    .unwrap_or_else(|_| "3006".to_string())
                    .parse()
                    .unwrap_or(3006),
            },
            database: DatabaseConfig {
                url: std::env::var("FLOWSMITH_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/catalog.db?mode=rwc".to_string()),
            },
            engine: EngineConfig {
                execution_url: std::env::var("FLOWSMITH_ENGINE_URL")
                    .unwrap_or_else(|_| "http://localhost:8090/runtime/execute".to_string()),
                codegen_url: std::env::var("FLOWSMITH_CODEGEN_URL")
                    .unwrap_or_else(|_| "http://localhost:8090/runtime/codegen".to_string()),
                enabled: std::env::var("FLOWSMITH_ENGINE_ENABLED")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(true),
                timeout_secs: std::env::var("FLOWSMITH_ENGINE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "90".to_string())
                    .parse()
                    .unwrap_or(90),
            },
            jobs: JobConfig {
                queue_capacity: std::env::var("FLOWSMITH_JOB_QUEUE_CAPACITY")
                    .unwrap_or_else(|_| "64".to_string())
                    .parse()
                    .unwrap_or(64),
            },
            adapters: AdapterConfig {
                file: std::env::var("FLOWSMITH_ADAPTERS_FILE").ok(),
            },
        }
    }
}
