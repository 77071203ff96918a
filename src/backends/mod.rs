//! Remote service abstractions and concrete implementations.

use std::collections::HashMap;

use crate::reference_cache::Vocabulary;
use crate::sheet_sync::SheetDocument;

pub mod google_sheets;
pub mod igdb;
pub mod twitch;

/// Game entry as returned by a metadata search, before reference expansion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawGame {
    pub id: u64,
    pub name: String,
    pub summary: Option<String>,
    pub rating: Option<f64>,
    /// `None` when the remote record carries no genre field at all.
    pub genre_ids: Option<Vec<u64>>,
    pub keyword_ids: Option<Vec<u64>>,
}

/// Spreadsheet listed in the user's drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetSummary {
    pub id: String,
    pub name: String,
}

/// Interface implemented by remote game metadata services.
pub trait MetadataService: Send + Sync {
    fn search(&self, text: &str, limit: u32) -> Result<Vec<RawGame>, String>;
    fn lookup(&self, vocabulary: Vocabulary, ids: &[u64]) -> Result<HashMap<u64, String>, String>;
    fn websites(&self, game_id: u64, category: u32) -> Result<Vec<String>, String>;
}

/// Interface implemented by spreadsheet document providers.
pub trait DocumentStore: Send + Sync {
    fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetSummary>, String>;
    fn can_write(&self, doc_id: &str) -> Result<bool, String>;
    fn load_range(&self, doc_id: &str, range: &str) -> Result<SheetDocument, String>;
    fn write_range(&self, doc_id: &str, document: &SheetDocument) -> Result<(), String>;
}
