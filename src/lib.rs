//! CRM export library
//!
//! This library provides the pieces of the `crm-export` tool: a typed
//! client for an Odoo-style record store and a streaming pipeline that
//! flattens leads and opportunities into CSV rows.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: RPC transport, authentication and typed reads
//! - `error`: Error types and handling
//! - `export`: Pagination, reference resolution, flattening and sinks
//! - `model`: Typed records returned by the store
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use crm_export::{config::Config, connection::{Connector, JsonRpcTransport}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let transport = JsonRpcTransport::new(&config.connection)?;
//!     let mut connector = Connector::new(transport, config.connection.clone());
//!
//!     let session = connector.authenticate().await?;
//!     println!("Authenticated as {}", session.uid);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod model;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use connection::{Connector, JsonRpcTransport, RpcTransport};
pub use error::{ExportError, Result};
pub use export::{CsvWriter, ExportCoordinator, ExportSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
