//! Event-bus protocol between the sync worker and its caller.

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Sync(SyncMessage),
}

/// Why a sync run stopped before write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFailureKind {
    /// Checked before any metadata request: missing write access, missing credentials.
    Precondition,
    /// A remote call failed mid-run.
    Remote,
}

/// Sync-run lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    Started {
        doc_id: String,
        rows: usize,
    },
    RowEnriched {
        row_index: usize,
        title: String,
        cells: Vec<String>,
    },
    Completed {
        doc_id: String,
        rows_enriched: usize,
    },
    Failed {
        doc_id: String,
        kind: SyncFailureKind,
        error: String,
    },
}
