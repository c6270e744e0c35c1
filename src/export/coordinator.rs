//! Export coordinator for orchestrating export operations
//!
//! This module provides the driver that brings together the connector,
//! pagination, reference resolution, flattening and the row sink. Batches
//! are processed strictly one after another: a batch is fetched, resolved,
//! flattened and written before the next fetch starts, and its records and
//! lookup maps are dropped at the end of the iteration.

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::connection::{Connector, Filter, RpcTransport, SearchRequest};
use crate::error::{ExportError, PipelineError, Result};
use crate::model::PRIMARY_FIELDS;

use super::flatten::Flattener;
use super::progress::{ProgressSnapshot, ProgressTracker};
use super::resolver::ReferenceResolver;
use super::schema::CRM_LEAD_V2;
use super::streaming::{BatchWindow, Paginator};
use super::writers::RowSink;

/// Ordering applied to every batch fetch
pub const FETCH_ORDER: &str = "id asc";

/// Driver lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Init,
    Counting,
    Exporting,
    Complete,
    Failed,
}

/// Process-wide export state
#[derive(Debug, Clone)]
pub struct ExportSession {
    /// Authenticated user id, once known
    pub uid: Option<i64>,
    pub state: ExportState,
    /// Records counted before the first fetch
    pub total: u64,
    /// Rows written so far
    pub exported: u64,
    /// Last batch started, 1-based
    pub batch_index: u64,
    pub total_batches: u64,
}

impl Default for ExportSession {
    fn default() -> Self {
        Self {
            uid: None,
            state: ExportState::Init,
            total: 0,
            exported: 0,
            batch_index: 0,
            total_batches: 0,
        }
    }
}

/// Result of a completed export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Rows written, header excluded
    pub rows: u64,
    /// Total counted at the start
    pub total: u64,
    pub batches: u64,
    /// Output size in bytes
    pub file_size_bytes: u64,
    /// Time taken for the export
    pub elapsed_ms: u64,
}

/// Coordinator for export operations
pub struct ExportCoordinator<T: RpcTransport> {
    connector: Connector<T>,
    config: ExportConfig,
    resolver: ReferenceResolver,
    flattener: Flattener,
    session: ExportSession,
    show_progress: bool,
    /// Cancellation token for aborting export
    cancel_token: Option<CancellationToken>,
}

impl<T: RpcTransport> ExportCoordinator<T> {
    /// Create a new export coordinator
    ///
    /// # Arguments
    /// * `connector` - Connector built from the connection configuration
    /// * `config` - Export settings (model, batch size, archive filter)
    pub fn new(connector: Connector<T>, config: ExportConfig) -> Self {
        let show_progress = config.progress;
        Self {
            connector,
            config,
            resolver: ReferenceResolver::default(),
            flattener: Flattener::new(&CRM_LEAD_V2),
            session: ExportSession::default(),
            show_progress,
            cancel_token: None,
        }
    }

    /// Set cancellation token for this export operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Replace the reference resolver
    pub fn with_resolver(mut self, resolver: ReferenceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn session(&self) -> &ExportSession {
        &self.session
    }

    pub fn connector(&self) -> &Connector<T> {
        &self.connector
    }

    fn filter(&self) -> Filter {
        Filter::new(self.config.include_archived)
    }

    /// Authenticate and count the records to export
    ///
    /// Runs before the sink is opened, so a rejected login or an interrupt
    /// during counting leaves no output file behind.
    ///
    /// # Returns
    /// * `Result<u64>` - Total number of records matching the filter
    pub async fn prepare(&mut self) -> Result<u64> {
        let token = self.cancel_token.clone();
        let outcome = match until_cancelled(token.as_ref(), self.authenticate_and_count()).await {
            Some(result) => result,
            None => Err(self.interrupted()),
        };
        if outcome.is_err() {
            self.session.state = ExportState::Failed;
        }
        outcome
    }

    async fn authenticate_and_count(&mut self) -> Result<u64> {
        let uid = self.connector.authenticate().await?.uid;
        self.session.uid = Some(uid);
        self.session.state = ExportState::Counting;

        let total = self
            .connector
            .count(&self.config.model, self.filter())
            .await?;
        let pages = Paginator::new(total, u64::from(self.config.batch_size));

        self.session.total = total;
        self.session.total_batches = pages.total_batches();
        info!(
            "{} '{}' records to export in {} batches of {}",
            total, self.config.model, self.session.total_batches, self.config.batch_size
        );
        Ok(total)
    }

    /// Execute the export operation
    ///
    /// Writes the header, then one `write_rows` call per batch window. A
    /// zero total completes right after the header. On any failure the rows
    /// of earlier batches stay in the destination.
    ///
    /// # Arguments
    /// * `sink` - Opened row sink
    ///
    /// # Returns
    /// * `Result<ExportSummary>` - Export statistics or error
    pub async fn export(&mut self, sink: &mut dyn RowSink) -> Result<ExportSummary> {
        if self.session.state == ExportState::Init {
            self.prepare().await?;
        }

        let start_time = Instant::now();
        let tracker = ProgressTracker::new(self.session.total, self.show_progress);
        self.session.state = ExportState::Exporting;

        match self.run_batches(sink, &tracker).await {
            Ok(()) => {
                sink.finalize().await?;
                tracker.finish();
                self.session.state = ExportState::Complete;

                let summary = ExportSummary {
                    rows: self.session.exported,
                    total: self.session.total,
                    batches: self.session.batch_index,
                    file_size_bytes: sink.file_size().await?,
                    elapsed_ms: start_time.elapsed().as_millis() as u64,
                };
                info!(
                    "Export completed: {} rows, {} bytes, {} ms",
                    summary.rows, summary.file_size_bytes, summary.elapsed_ms
                );
                Ok(summary)
            }
            Err(e) => {
                // Keep whatever was already written
                if let Err(close_err) = sink.finalize().await {
                    warn!("Failed to close output after error: {}", close_err);
                }
                tracker.abandon();
                self.session.state = ExportState::Failed;
                warn!(
                    "Export stopped after {}/{} rows",
                    self.session.exported, self.session.total
                );
                Err(e)
            }
        }
    }

    async fn run_batches(&mut self, sink: &mut dyn RowSink, tracker: &ProgressTracker) -> Result<()> {
        sink.write_header(&self.flattener.header()).await?;

        let pages = Paginator::new(self.session.total, u64::from(self.config.batch_size));
        for window in pages {
            if self.is_cancelled() {
                return Err(self.interrupted());
            }
            self.session.batch_index = window.index;
            self.export_window(window, sink).await?;

            let snapshot = ProgressSnapshot {
                exported: self.session.exported,
                total: self.session.total,
                batch: window.index,
                total_batches: self.session.total_batches,
            };
            tracker.update(&snapshot);
            debug!(
                "Batch {}/{}: {}/{} rows ({}%)",
                snapshot.batch,
                snapshot.total_batches,
                snapshot.exported,
                snapshot.total,
                snapshot.percent()
            );
            if window.index % 10 == 0 {
                info!(
                    "Progress: {} rows exported ({} batches)",
                    snapshot.exported, snapshot.batch
                );
            }
        }

        Ok(())
    }

    /// Fetch, resolve, flatten and write one window
    async fn export_window(&mut self, window: BatchWindow, sink: &mut dyn RowSink) -> Result<()> {
        let request = SearchRequest {
            model: &self.config.model,
            filter: self.filter(),
            fields: PRIMARY_FIELDS,
            limit: window.limit,
            offset: window.offset,
            order: FETCH_ORDER,
        };

        let fetched = until_cancelled(
            self.cancel_token.as_ref(),
            self.connector.fetch_batch(&request),
        )
        .await;
        let records = match fetched {
            None => return Err(self.interrupted()),
            Some(result) => result.map_err(|e| PipelineError::BatchFetch {
                batch: window.index,
                offset: window.offset,
                message: e.to_string(),
            })?,
        };

        if records.len() as u64 != window.expected {
            warn!(
                "Batch {}: expected {} records, received {} (records changed during export)",
                window.index,
                window.expected,
                records.len()
            );
        }

        let resolved = until_cancelled(
            self.cancel_token.as_ref(),
            self.resolver.resolve(&self.connector, &records, window.index),
        )
        .await;
        let lookups = match resolved {
            None => return Err(self.interrupted()),
            Some(result) => result?,
        };

        let rows = self.flattener.flatten_batch(&records, &lookups);
        let written = sink.write_rows(&rows).await?;
        self.session.exported += written as u64;
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn interrupted(&self) -> ExportError {
        info!("Export operation cancelled by user");
        ExportError::Interrupted {
            exported: self.session.exported,
            total: self.session.total,
        }
    }
}

/// Run `fut` unless the token fires first; `None` means cancelled
async fn until_cancelled<F, R>(token: Option<&CancellationToken>, fut: F) -> Option<Result<R>>
where
    F: Future<Output = Result<R>>,
{
    match token {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = fut => Some(result),
            }
        }
        None => Some(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::connection::testing::FakeStore;
    use crate::error::AuthError;
    use crate::export::flatten::OutputRow;
    use crate::model::record::fixtures::lead;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    /// Sink that keeps rows in memory
    #[derive(Default)]
    struct MemorySink {
        header: Vec<String>,
        batches: Vec<Vec<OutputRow>>,
        finalized: bool,
        /// Cancelled after the first batch is written
        cancel_after_first: Option<CancellationToken>,
    }

    impl MemorySink {
        fn rows(&self) -> Vec<&OutputRow> {
            self.batches.iter().flatten().collect()
        }

        fn column(&self, header: &str) -> usize {
            self.header.iter().position(|h| h == header).unwrap()
        }
    }

    #[async_trait]
    impl RowSink for MemorySink {
        async fn write_header(&mut self, columns: &[&str]) -> Result<()> {
            self.header = columns.iter().map(|c| c.to_string()).collect();
            Ok(())
        }

        async fn write_rows(&mut self, rows: &[OutputRow]) -> Result<usize> {
            self.batches.push(rows.to_vec());
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
            Ok(rows.len())
        }

        async fn finalize(&mut self) -> Result<()> {
            self.finalized = true;
            Ok(())
        }

        async fn file_size(&self) -> Result<u64> {
            Ok(self.rows().len() as u64)
        }
    }

    fn leads(count: i64) -> Vec<Value> {
        (1..=count)
            .map(|id| lead(id, json!({ "name": format!("Lead {id}") })))
            .collect()
    }

    fn coordinator(store: FakeStore, batch_size: u32) -> ExportCoordinator<FakeStore> {
        let config = ExportConfig {
            batch_size,
            progress: false,
            ..ExportConfig::default()
        };
        ExportCoordinator::new(Connector::new(store, ConnectionConfig::default()), config)
    }

    fn store(coord: &ExportCoordinator<FakeStore>) -> &FakeStore {
        coord.connector().transport()
    }

    #[tokio::test]
    async fn test_rows_match_total() {
        let mut coord = coordinator(FakeStore::new().with_leads(leads(7)), 3);
        let mut sink = MemorySink::default();

        let summary = coord.export(&mut sink).await.unwrap();

        assert_eq!(summary.rows, 7);
        assert_eq!(summary.total, 7);
        assert_eq!(summary.batches, 3);
        assert_eq!(
            sink.batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![3, 3, 1]
        );
        assert!(sink.finalized);
        assert_eq!(coord.session().state, ExportState::Complete);

        let offsets: Vec<Option<u64>> = store(&coord)
            .calls_to("crm.lead", "search_read")
            .iter()
            .map(|c| c.offset)
            .collect();
        assert_eq!(offsets, vec![Some(0), Some(3), Some(6)]);
    }

    #[tokio::test]
    async fn test_rows_are_in_ascending_id_order() {
        let shuffled = vec![lead(9, json!({})), lead(2, json!({})), lead(5, json!({}))];
        let mut coord = coordinator(FakeStore::new().with_leads(shuffled), 2);
        let mut sink = MemorySink::default();

        coord.export(&mut sink).await.unwrap();

        let ids: Vec<&str> = sink.rows().iter().map(|r| r.cells()[0].as_str()).collect();
        assert_eq!(ids, vec!["2", "5", "9"]);
    }

    #[tokio::test]
    async fn test_zero_total_writes_header_only() {
        let mut coord = coordinator(FakeStore::new(), 500);
        let mut sink = MemorySink::default();

        let summary = coord.export(&mut sink).await.unwrap();

        assert_eq!(summary.rows, 0);
        assert_eq!(summary.batches, 0);
        assert_eq!(sink.header.len(), CRM_LEAD_V2.len());
        assert!(sink.batches.is_empty());
        assert!(store(&coord).calls_to("crm.lead", "search_read").is_empty());
        assert_eq!(coord.session().state, ExportState::Complete);
    }

    #[tokio::test]
    async fn test_tags_read_once_per_batch() {
        let rows = vec![
            lead(1, json!({ "tag_ids": [1, 2] })),
            lead(2, json!({ "tag_ids": [2] })),
            lead(3, json!({ "tag_ids": [1] })),
            lead(4, json!({ "tag_ids": [3] })),
        ];
        let tags = vec![
            json!({ "id": 1, "name": "Hot" }),
            json!({ "id": 2, "name": "VIP" }),
            json!({ "id": 3, "name": "Cold" }),
        ];
        let store_ = FakeStore::new()
            .with_leads(rows)
            .with_related("crm.tag", tags);
        let mut coord = coordinator(store_, 3);
        let mut sink = MemorySink::default();

        coord.export(&mut sink).await.unwrap();

        let reads = store(&coord).calls_to("crm.tag", "read");
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].ids, vec![1, 2]);
        assert_eq!(reads[1].ids, vec![3]);

        let tags = sink.column("tags");
        let rendered: Vec<&str> = sink.rows().iter().map(|r| r.cells()[tags].as_str()).collect();
        assert_eq!(rendered, vec!["Hot | VIP", "VIP", "Hot", "Cold"]);
    }

    #[tokio::test]
    async fn test_deleted_partner_leaves_columns_empty() {
        let store_ = FakeStore::new()
            .with_leads(vec![
                lead(1, json!({ "partner_id": [9, "Gone Ltd"], "email_from": "x@example.com" })),
                lead(2, json!({ "partner_id": [4, "Acme"] })),
            ])
            .with_related(
                "res.partner",
                vec![json!({
                    "id": 4, "name": "Acme", "email": "info@acme.test", "phone": false,
                    "mobile": false, "street": false, "city": "Madrid", "zip": false,
                    "country_id": [68, "Spain"],
                })],
            );
        let mut coord = coordinator(store_, 10);
        let mut sink = MemorySink::default();

        coord.export(&mut sink).await.unwrap();

        let rows = sink.rows();
        let email = sink.column("partner_email");
        let city = sink.column("partner_city");
        let lead_email = sink.column("lead_email");
        assert_eq!(rows[0].cells()[email], "");
        assert_eq!(rows[0].cells()[lead_email], "x@example.com");
        assert_eq!(rows[1].cells()[email], "info@acme.test");
        assert_eq!(rows[1].cells()[city], "Madrid");
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_prior_rows() {
        let store_ = FakeStore::new()
            .with_leads(leads(5))
            .failing_on("crm.lead", "search_read", 1);
        let mut coord = coordinator(store_, 2);
        let mut sink = MemorySink::default();

        let err = coord.export(&mut sink).await.unwrap_err();

        match err {
            ExportError::Pipeline(PipelineError::BatchFetch { batch, offset, .. }) => {
                assert_eq!(batch, 2);
                assert_eq!(offset, 2);
            }
            other => panic!("expected batch fetch failure, got {other:?}"),
        }
        assert_eq!(sink.rows().len(), 2);
        assert!(sink.finalized);
        assert_eq!(coord.session().state, ExportState::Failed);
        assert_eq!(store(&coord).calls_to("crm.lead", "search_read").len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_failure_aborts_remaining_batches() {
        let store_ = FakeStore::new()
            .with_leads(vec![
                lead(1, json!({ "stage_id": [1, "New"] })),
                lead(2, json!({ "stage_id": [1, "New"] })),
            ])
            .with_related("crm.stage", vec![json!({ "id": 1, "name": "New", "sequence": 1 })])
            .failing_on("crm.stage", "read", 0);
        let mut coord = coordinator(store_, 1);
        let mut sink = MemorySink::default();

        let err = coord.export(&mut sink).await.unwrap_err();

        assert!(matches!(
            err,
            ExportError::Pipeline(PipelineError::BulkResolve { batch: 1, .. })
        ));
        assert!(sink.batches.is_empty());
        assert_eq!(store(&coord).calls_to("crm.lead", "search_read").len(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_before_any_output() {
        let mut coord = coordinator(FakeStore::new().rejecting_auth(), 10);

        let err = coord.prepare().await.unwrap_err();

        assert!(matches!(err, ExportError::Auth(AuthError::Rejected { .. })));
        assert_eq!(coord.session().state, ExportState::Failed);
        assert!(store(&coord).calls().is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_reports_partial_count() {
        let token = CancellationToken::new();
        let mut coord =
            coordinator(FakeStore::new().with_leads(leads(6)), 2).with_cancellation(token.clone());
        let mut sink = MemorySink {
            cancel_after_first: Some(token),
            ..MemorySink::default()
        };

        let err = coord.export(&mut sink).await.unwrap_err();

        assert_eq!(err.exit_code(), 130);
        match err {
            ExportError::Interrupted { exported, total } => {
                assert_eq!(exported, 2);
                assert_eq!(total, 6);
            }
            other => panic!("expected interruption, got {other:?}"),
        }
        assert!(sink.finalized);
        assert_eq!(sink.rows().len(), 2);
        assert_eq!(coord.session().state, ExportState::Failed);
    }

    #[tokio::test]
    async fn test_interrupt_before_export_writes_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let mut coord =
            coordinator(FakeStore::new().with_leads(leads(4)), 2).with_cancellation(token);

        let err = coord.prepare().await.unwrap_err();

        assert_eq!(err.exit_code(), 130);
        match err {
            ExportError::Interrupted { exported, total } => {
                assert_eq!(exported, 0);
                assert_eq!(total, 0);
            }
            other => panic!("expected interruption, got {other:?}"),
        }
        assert_eq!(coord.session().state, ExportState::Failed);
        assert_eq!(coord.session().uid, None);
        assert!(store(&coord).calls().is_empty());
    }

    #[tokio::test]
    async fn test_archive_filter_matches_between_count_and_fetch() {
        let rows = vec![
            lead(1, json!({})),
            lead(2, json!({ "active": false })),
            lead(3, json!({})),
        ];

        let mut active_only = coordinator(FakeStore::new().with_leads(rows.clone()), 10);
        let mut sink = MemorySink::default();
        let summary = active_only.export(&mut sink).await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.rows, 2);

        let config = ExportConfig {
            include_archived: true,
            progress: false,
            ..ExportConfig::default()
        };
        let mut archived = ExportCoordinator::new(
            Connector::new(FakeStore::new().with_leads(rows), ConnectionConfig::default()),
            config,
        );
        let mut sink = MemorySink::default();
        let summary = archived.export(&mut sink).await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.rows, 3);
        let active = sink.column("active");
        assert_eq!(sink.rows()[1].cells()[active], "False");
    }

    #[tokio::test]
    async fn test_shrinking_store_is_not_an_error() {
        // fifth record disappears between count and fetch
        let mut coord = coordinator(FakeStore::new().with_leads(leads(4)), 2);
        coord.prepare().await.unwrap();
        coord.session.total = 5;

        let mut sink = MemorySink::default();
        let summary = coord.export(&mut sink).await.unwrap();

        assert_eq!(summary.rows, 4);
        assert_eq!(summary.batches, 3);
    }
}
