//! Background sync worker.
//!
//! Runs one document through preflight, load, enrichment and write-back off
//! the caller's thread, reporting progress over the event bus.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use tokio::sync::broadcast::Sender;

use crate::backends::{DocumentStore, MetadataService};
use crate::metadata_client::{MetadataClient, SearchOptions};
use crate::protocol::{Message, SyncFailureKind, SyncMessage};
use crate::rate_limiter::Throttle;
use crate::reference_cache::Vocabulary;
use crate::sheet_sync::{self, SheetDocument};

/// Failed sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRunError {
    pub kind: SyncFailureKind,
    pub error: String,
    /// Rows enriched before a mid-run failure. Never written back.
    pub partial: Option<SheetDocument>,
}

/// Opens the metadata session. Called only after write access is confirmed.
pub type MetadataConnector =
    Box<dyn Fn() -> Result<Arc<dyn MetadataService>, String> + Send + Sync>;

/// Everything one sync run needs, owned so it can move onto a worker thread.
pub struct SyncRuntime {
    bus_producer: Sender<Message>,
    connect_metadata: MetadataConnector,
    document_store: Arc<dyn DocumentStore>,
    throttle: Arc<dyn Throttle>,
    options: SearchOptions,
    range: String,
}

impl SyncRuntime {
    pub fn new(
        bus_producer: Sender<Message>,
        connect_metadata: MetadataConnector,
        document_store: Arc<dyn DocumentStore>,
        throttle: Arc<dyn Throttle>,
        options: SearchOptions,
        range: &str,
    ) -> Self {
        Self {
            bus_producer,
            connect_metadata,
            document_store,
            throttle,
            options,
            range: range.to_string(),
        }
    }

    fn emit(&self, message: SyncMessage) {
        let _ = self.bus_producer.send(Message::Sync(message));
    }

    fn fail(&self, doc_id: &str, kind: SyncFailureKind, error: String) -> SyncRunError {
        self.emit(SyncMessage::Failed {
            doc_id: doc_id.to_string(),
            kind,
            error: error.clone(),
        });
        SyncRunError {
            kind,
            error,
            partial: None,
        }
    }

    fn preflight(&self, doc_id: &str) -> Result<(), SyncRunError> {
        match self.document_store.can_write(doc_id) {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("Pre flight checks failed, user is not an owner or writer of {doc_id}");
                Err(self.fail(
                    doc_id,
                    SyncFailureKind::Precondition,
                    format!("no write access to document {doc_id}"),
                ))
            }
            Err(err) => {
                warn!("Pre flight checks failed, could not get permissions for {doc_id}: {err}");
                Err(self.fail(doc_id, SyncFailureKind::Precondition, err))
            }
        }
    }

    /// Enriches `doc_id` and writes it back, returning the written document.
    ///
    /// Write access is verified before the metadata session is opened, so a
    /// read-only document costs no metadata quota. A failure after loading
    /// leaves the remote document untouched.
    pub fn run(&self, doc_id: &str) -> Result<SheetDocument, SyncRunError> {
        self.preflight(doc_id)?;
        let metadata_service = (self.connect_metadata)().map_err(|err| {
            warn!("Could not open metadata session for {doc_id}: {err}");
            self.fail(doc_id, SyncFailureKind::Precondition, err)
        })?;

        info!("Getting spreadsheet {doc_id}");
        let document = self
            .document_store
            .load_range(doc_id, &self.range)
            .map_err(|err| self.fail(doc_id, SyncFailureKind::Remote, err))?;
        self.emit(SyncMessage::Started {
            doc_id: doc_id.to_string(),
            rows: document.values.len(),
        });

        let mut client = MetadataClient::new(
            metadata_service.as_ref(),
            self.throttle.as_ref(),
            self.options,
        );
        let mut rows_enriched = 0usize;
        let synced = sheet_sync::sync(document, &mut client, |row_index, title, cells| {
            rows_enriched += 1;
            self.emit(SyncMessage::RowEnriched {
                row_index,
                title: title.to_string(),
                cells: cells.to_vec(),
            });
        });
        debug!(
            "Reference cache holds {} genres and {} keywords",
            client.cache().len(Vocabulary::Genre),
            client.cache().len(Vocabulary::Keyword)
        );
        let document = match synced {
            Ok(document) => document,
            Err(failure) => {
                error!(
                    "Lookup failed after {rows_enriched} rows, not updating {doc_id}: {}",
                    failure.error
                );
                let mut run_error = self.fail(doc_id, SyncFailureKind::Remote, failure.error);
                run_error.partial = Some(failure.document);
                return Err(run_error);
            }
        };

        debug!("Lookups complete, updating sheet {doc_id}");
        self.document_store
            .write_range(doc_id, &document)
            .map_err(|err| self.fail(doc_id, SyncFailureKind::Remote, err))?;
        info!("Sheet {doc_id} updated, {rows_enriched} rows enriched");
        self.emit(SyncMessage::Completed {
            doc_id: doc_id.to_string(),
            rows_enriched,
        });
        Ok(document)
    }
}

/// Runs `runtime` for `doc_id` on a dedicated worker thread.
pub fn spawn_sync_worker(
    runtime: SyncRuntime,
    doc_id: String,
) -> std::io::Result<JoinHandle<Result<SheetDocument, SyncRunError>>> {
    debug!("Starting sync worker for {doc_id}");
    thread::Builder::new()
        .name("sheet-sync".to_string())
        .spawn(move || runtime.run(&doc_id))
}
