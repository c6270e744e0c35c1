use std::{fmt, io};

use crate::error::remote::RemoteFault;

/// Crate-wide `Result` type using [`ExportError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Top-level error type for export operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum ExportError {
    /// Authentication against the record store failed.
    Auth(AuthError),

    /// RPC transport or remote call errors.
    Connection(ConnectionError),

    /// Batch fetch or reference resolution failures.
    Pipeline(PipelineError),

    /// Output file errors.
    Sink(SinkError),

    /// Configuration errors.
    Config(ConfigError),

    /// The export was interrupted after some rows were written.
    Interrupted { exported: u64, total: u64 },
}

/// Authentication-specific errors.
#[derive(Debug)]
pub enum AuthError {
    /// The store answered but refused the credentials.
    Rejected { login: String, database: String },

    /// The endpoint could not be reached or answered garbage.
    Unreachable(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Network or HTTP level failure.
    Transport(String),

    /// The remote side raised a fault.
    Remote(RemoteFault),

    /// A call was attempted before `authenticate` succeeded.
    NotAuthenticated,

    /// The response did not have the expected structure.
    InvalidResponse { model: String, message: String },
}

/// Pipeline-stage errors raised while exporting.
#[derive(Debug)]
pub enum PipelineError {
    /// Fetching a window of primary records failed.
    BatchFetch {
        batch: u64,
        offset: u64,
        message: String,
    },

    /// Bulk reading one relation for a batch failed.
    BulkResolve {
        batch: u64,
        relation: &'static str,
        message: String,
    },
}

/// Output file errors.
#[derive(Debug)]
pub enum SinkError {
    /// Parent directory of the output path is missing.
    DirectoryNotFound(String),

    /// The output file could not be created.
    Create { path: String, source: io::Error },

    /// Writing or flushing the output file failed.
    Write { path: String, source: io::Error },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

impl ExportError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::Interrupted { .. } => 130,
            _ => 1,
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Auth(e) => write!(f, "Authentication error: {e}"),
            ExportError::Connection(e) => write!(f, "Connection error: {e}"),
            ExportError::Pipeline(e) => write!(f, "Export failed: {e}"),
            ExportError::Sink(e) => write!(f, "Output error: {e}"),
            ExportError::Config(e) => write!(f, "Configuration error: {e}"),
            ExportError::Interrupted { exported, total } => {
                write!(f, "Interrupted after {exported}/{total} rows were written")
            }
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Rejected { login, database } => {
                write!(f, "credentials for '{login}' rejected by database '{database}'")
            }
            AuthError::Unreachable(msg) => write!(f, "endpoint unreachable: {msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Transport(msg) => write!(f, "Transport failure: {msg}"),
            ConnectionError::Remote(fault) => write!(f, "Remote fault: {fault}"),
            ConnectionError::NotAuthenticated => write!(f, "Not authenticated"),
            ConnectionError::InvalidResponse { model, message } => {
                write!(f, "Unexpected response shape from '{model}': {message}")
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::BatchFetch {
                batch,
                offset,
                message,
            } => write!(f, "batch {batch} (offset {offset}) fetch failed: {message}"),
            PipelineError::BulkResolve {
                batch,
                relation,
                message,
            } => write!(f, "batch {batch} could not resolve '{relation}': {message}"),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::DirectoryNotFound(dir) => write!(f, "Directory does not exist: {dir}"),
            SinkError::Create { path, source } => {
                write!(f, "Failed to create '{path}': {source}")
            }
            SinkError::Write { path, source } => write!(f, "Failed to write '{path}': {source}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for ExportError {}
impl std::error::Error for AuthError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for PipelineError {}
impl std::error::Error for ConfigError {}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Create { source, .. } | SinkError::Write { source, .. } => Some(source),
            SinkError::DirectoryNotFound(_) => None,
        }
    }
}

/* ========================= Conversions to ExportError ========================= */

impl From<AuthError> for ExportError {
    fn from(err: AuthError) -> Self {
        ExportError::Auth(err)
    }
}

impl From<ConnectionError> for ExportError {
    fn from(err: ConnectionError) -> Self {
        ExportError::Connection(err)
    }
}

impl From<PipelineError> for ExportError {
    fn from(err: PipelineError) -> Self {
        ExportError::Pipeline(err)
    }
}

impl From<SinkError> for ExportError {
    fn from(err: SinkError) -> Self {
        ExportError::Sink(err)
    }
}

impl From<ConfigError> for ExportError {
    fn from(err: ConfigError) -> Self {
        ExportError::Config(err)
    }
}
