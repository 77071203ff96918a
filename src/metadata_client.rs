//! Title search with genre/keyword expansion and storefront lookup.

use log::{debug, info};

use crate::backends::{MetadataService, RawGame};
use crate::rate_limiter::Throttle;
use crate::reference_cache::{ReferenceCache, Vocabulary};

/// IGDB website category code for Steam store pages.
pub const STEAM_WEBSITE_CATEGORY: u32 = 13;
pub const DEFAULT_RESULT_LIMIT: u32 = 10;

/// Fully expanded search result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameRecord {
    pub id: u64,
    pub name: String,
    pub summary: Option<String>,
    pub rating: Option<f64>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub storefront_links: Vec<String>,
}

/// Search options applied to every query issued by one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub result_limit: u32,
    pub storefront_category: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            result_limit: DEFAULT_RESULT_LIMIT,
            storefront_category: STEAM_WEBSITE_CATEGORY,
        }
    }
}

/// Resolves free-text titles into expanded game records.
///
/// Owns the reference cache for its lifetime, so one client should be reused
/// across all rows of a sync run.
pub struct MetadataClient<'a> {
    service: &'a dyn MetadataService,
    throttle: &'a dyn Throttle,
    cache: ReferenceCache,
    options: SearchOptions,
}

impl<'a> MetadataClient<'a> {
    pub fn new(
        service: &'a dyn MetadataService,
        throttle: &'a dyn Throttle,
        options: SearchOptions,
    ) -> Self {
        Self {
            service,
            throttle,
            cache: ReferenceCache::new(),
            options,
        }
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Searches `title` and expands every candidate in remote result order.
    ///
    /// Any remote failure aborts the whole search.
    pub fn search(&mut self, title: &str) -> Result<Vec<GameRecord>, String> {
        info!("Searching for {title}");
        let results = self.service.search(title, self.options.result_limit)?;
        debug!("IGDB returned {results:?}");
        info!("Found {} results", results.len());
        results
            .into_iter()
            .map(|raw| self.expand(raw))
            .collect()
    }

    fn expand(&mut self, raw: RawGame) -> Result<GameRecord, String> {
        let genres = self.cache.resolve(
            raw.genre_ids.as_deref().unwrap_or_default(),
            Vocabulary::Genre,
            self.service,
            self.throttle,
        )?;
        let keywords = self.cache.resolve(
            raw.keyword_ids.as_deref().unwrap_or_default(),
            Vocabulary::Keyword,
            self.service,
            self.throttle,
        )?;

        self.throttle.wait();
        info!("Looking up storefront page for game ID {}", raw.id);
        let storefront_links = self
            .service
            .websites(raw.id, self.options.storefront_category)?;
        debug!("Storefront links for {}: {storefront_links:?}", raw.id);

        Ok(GameRecord {
            id: raw.id,
            name: raw.name,
            summary: raw.summary,
            rating: raw.rating,
            genres,
            keywords,
            storefront_links,
        })
    }
}
