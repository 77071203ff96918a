//! In-memory fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::backends::{DocumentStore, MetadataService, RawGame, SpreadsheetSummary};
use crate::rate_limiter::Throttle;
use crate::reference_cache::Vocabulary;
use crate::sheet_sync::SheetDocument;

pub fn raw_game(id: u64, name: &str) -> RawGame {
    RawGame {
        id,
        name: name.to_string(),
        ..RawGame::default()
    }
}

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

#[derive(Default)]
pub struct CountingThrottle {
    waits: AtomicUsize,
}

impl CountingThrottle {
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

impl Throttle for CountingThrottle {
    fn wait(&self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeMetadataService {
    games: HashMap<String, Vec<RawGame>>,
    genres: HashMap<u64, String>,
    keywords: HashMap<u64, String>,
    websites: HashMap<u64, Vec<String>>,
    failing_searches: HashMap<String, String>,
    lookup_error: Option<String>,
    search_calls: Mutex<Vec<String>>,
    lookup_calls: Mutex<Vec<(Vocabulary, Vec<u64>)>>,
    website_calls: Mutex<Vec<(u64, u32)>>,
    call_times: Mutex<Vec<Instant>>,
}

impl FakeMetadataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_games(mut self, title: &str, games: Vec<RawGame>) -> Self {
        self.games.insert(title.to_string(), games);
        self
    }

    pub fn with_genre(mut self, id: u64, name: &str) -> Self {
        self.genres.insert(id, name.to_string());
        self
    }

    pub fn with_keyword(mut self, id: u64, name: &str) -> Self {
        self.keywords.insert(id, name.to_string());
        self
    }

    pub fn with_websites(mut self, game_id: u64, urls: &[&str]) -> Self {
        self.websites
            .insert(game_id, urls.iter().map(|url| url.to_string()).collect());
        self
    }

    pub fn failing_search(mut self, title: &str, error: &str) -> Self {
        self.failing_searches
            .insert(title.to_string(), error.to_string());
        self
    }

    pub fn failing_lookups(mut self, error: &str) -> Self {
        self.lookup_error = Some(error.to_string());
        self
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().expect("search calls lock").clone()
    }

    pub fn lookup_calls(&self) -> Vec<(Vocabulary, Vec<u64>)> {
        self.lookup_calls.lock().expect("lookup calls lock").clone()
    }

    pub fn website_calls(&self) -> Vec<(u64, u32)> {
        self.website_calls.lock().expect("website calls lock").clone()
    }

    /// When each remote call arrived, across search, lookup and websites.
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().expect("call times lock").clone()
    }

    fn record_call(&self) {
        self.call_times
            .lock()
            .expect("call times lock")
            .push(Instant::now());
    }
}

impl MetadataService for FakeMetadataService {
    fn search(&self, text: &str, _limit: u32) -> Result<Vec<RawGame>, String> {
        self.record_call();
        self.search_calls
            .lock()
            .expect("search calls lock")
            .push(text.to_string());
        if let Some(error) = self.failing_searches.get(text) {
            return Err(error.clone());
        }
        Ok(self.games.get(text).cloned().unwrap_or_default())
    }

    fn lookup(&self, vocabulary: Vocabulary, ids: &[u64]) -> Result<HashMap<u64, String>, String> {
        self.record_call();
        self.lookup_calls
            .lock()
            .expect("lookup calls lock")
            .push((vocabulary, ids.to_vec()));
        if let Some(error) = &self.lookup_error {
            return Err(error.clone());
        }
        let source = match vocabulary {
            Vocabulary::Genre => &self.genres,
            Vocabulary::Keyword => &self.keywords,
        };
        Ok(ids
            .iter()
            .filter_map(|id| source.get(id).map(|name| (*id, name.clone())))
            .collect())
    }

    fn websites(&self, game_id: u64, category: u32) -> Result<Vec<String>, String> {
        self.record_call();
        self.website_calls
            .lock()
            .expect("website calls lock")
            .push((game_id, category));
        Ok(self.websites.get(&game_id).cloned().unwrap_or_default())
    }
}

pub struct FakeDocumentStore {
    writable: Result<bool, String>,
    document: SheetDocument,
    load_error: Option<String>,
    loads: AtomicUsize,
    writes: Mutex<Vec<(String, SheetDocument)>>,
}

impl FakeDocumentStore {
    pub fn new(document: SheetDocument) -> Self {
        Self {
            writable: Ok(true),
            document,
            load_error: None,
            loads: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = Ok(false);
        self
    }

    pub fn failing_permissions(mut self, error: &str) -> Self {
        self.writable = Err(error.to_string());
        self
    }

    pub fn failing_load(mut self, error: &str) -> Self {
        self.load_error = Some(error.to_string());
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<(String, SheetDocument)> {
        self.writes.lock().expect("writes lock").clone()
    }
}

impl DocumentStore for FakeDocumentStore {
    fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetSummary>, String> {
        Ok(vec![SpreadsheetSummary {
            id: "doc-1".to_string(),
            name: "Backlog".to_string(),
        }])
    }

    fn can_write(&self, _doc_id: &str) -> Result<bool, String> {
        self.writable.clone()
    }

    fn load_range(&self, _doc_id: &str, _range: &str) -> Result<SheetDocument, String> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.load_error {
            return Err(error.clone());
        }
        Ok(self.document.clone())
    }

    fn write_range(&self, doc_id: &str, document: &SheetDocument) -> Result<(), String> {
        self.writes
            .lock()
            .expect("writes lock")
            .push((doc_id.to_string(), document.clone()));
        Ok(())
    }
}
