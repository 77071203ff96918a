//! Row-by-row enrichment of a loaded spreadsheet range.

use log::{debug, info};

use crate::match_resolver::resolve_match;
use crate::metadata_client::MetadataClient;

/// Cells in a row awaiting enrichment: title plus two padding slots.
pub const PENDING_ROW_LEN: usize = 3;
/// Cells in a fully enriched row.
pub const ENRICHED_ROW_LEN: usize = 8;

/// A spreadsheet value range, shaped like the Sheets API `ValueRange`.
#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDocument {
    pub range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

/// Sync run aborted by a remote failure.
///
/// `document` keeps every row enriched before the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub error: String,
    pub document: SheetDocument,
}

/// Pads short rows and reports whether the row still awaits enrichment.
fn normalize_row(row: &mut Vec<String>) -> bool {
    if row.len() < PENDING_ROW_LEN {
        debug!("Padding row {:?} out to {PENDING_ROW_LEN} columns", row.first());
        row.resize(PENDING_ROW_LEN, String::new());
    }
    row.len() == PENDING_ROW_LEN
}

/// Enriches every pending row of `document` in order.
///
/// Rows with more than three cells are left untouched, so running this twice
/// on the same document is a no-op the second time. `on_row_enriched` is
/// called with the row index and appended cells after each enrichment.
pub fn sync<F>(
    mut document: SheetDocument,
    client: &mut MetadataClient<'_>,
    mut on_row_enriched: F,
) -> Result<SheetDocument, SyncFailure>
where
    F: FnMut(usize, &str, &[String]),
{
    for index in 0..document.values.len() {
        let row = &mut document.values[index];
        if !normalize_row(row) {
            if row.len() == ENRICHED_ROW_LEN {
                debug!("Skipping row {index}: already enriched");
            } else {
                debug!("Skipping row {index}: {} columns, leaving as edited", row.len());
            }
            continue;
        }

        let title = row[0].clone();
        info!("Looking up game {title}");
        let candidates = match client.search(&title) {
            Ok(candidates) => candidates,
            Err(error) => return Err(SyncFailure { error, document }),
        };
        let cells = resolve_match(&title, candidates).into_cells();
        let row = &mut document.values[index];
        row.extend(cells.iter().cloned());
        on_row_enriched(index, &title, &cells);
    }
    Ok(document)
}
