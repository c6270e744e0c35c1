//! Export module for streaming CRM exports
//!
//! This module turns pages of primary records into spreadsheet rows without
//! ever holding more than one batch in memory.
//!
//! # Architecture
//!
//! 1. **Paginator**: fixed-size offset windows in ascending id order
//! 2. **ReferenceResolver**: one bulk read per relation per batch
//! 3. **Flattener**: record plus lookup maps into one row of the versioned schema
//! 4. **RowSink**: append-only destination, flushed after every batch
//!
//! These components are orchestrated by the **ExportCoordinator**, which
//! owns the connector and drives the state machine from login to summary.
//!
//! # Example
//!
//! ```no_run
//! use crm_export::config::Config;
//! use crm_export::connection::{Connector, JsonRpcTransport};
//! use crm_export::export::{CsvWriter, ExportCoordinator};
//!
//! # async fn run() -> crm_export::error::Result<()> {
//! let config = Config::default();
//! let transport = JsonRpcTransport::new(&config.connection)?;
//! let connector = Connector::new(transport, config.connection.clone());
//!
//! let mut coordinator = ExportCoordinator::new(connector, config.export.clone());
//! coordinator.prepare().await?;
//!
//! let mut sink = CsvWriter::open("leads.csv", config.export.line_ending).await?;
//! let summary = coordinator.export(&mut sink).await?;
//! println!("{} rows", summary.rows);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod flatten;
pub mod progress;
pub mod resolver;
pub mod schema;
pub mod streaming;
pub mod writers;

pub use coordinator::{ExportCoordinator, ExportSession, ExportState, ExportSummary};
pub use flatten::{Flattener, OutputRow};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use resolver::{LookupMaps, ReferenceResolver, Relation};
pub use schema::{CRM_LEAD_V2, Column, Schema, SchemaVersion};
pub use streaming::{BatchWindow, Paginator};
pub use writers::{CsvWriter, RowSink};
