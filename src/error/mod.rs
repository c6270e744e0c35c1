//! Error handling module for export operations.
//!
//! This module provides error handling for the export pipeline with:
//! - Application-specific error types per pipeline stage
//! - Structured decoding of faults raised by the remote record store
//! - Exit-code mapping for the command-line entry point
//!
//! # Example
//!
//! ```rust,no_run
//! use crm_export::error::{AuthError, ExportError, Result};
//!
//! fn login(ok: bool) -> Result<()> {
//!     if !ok {
//!         return Err(AuthError::Unreachable("connection refused".into()).into());
//!     }
//!     Ok(())
//! }
//!
//! if let Err(e) = login(false) {
//!     eprintln!("Error: {e}");
//!     std::process::exit(e.exit_code());
//! }
//! ```

pub mod kinds;
pub mod remote;

// Re-export commonly used types
pub use kinds::{
    AuthError, ConfigError, ConnectionError, ExportError, PipelineError, Result, SinkError,
};
pub use remote::{FaultData, RemoteFault};
