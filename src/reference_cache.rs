//! Memoized id -> name expansion for the genre and keyword vocabularies.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use crate::backends::MetadataService;
use crate::rate_limiter::Throttle;

/// Controlled id -> name dictionary exposed by the metadata service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    Genre,
    Keyword,
}

impl Vocabulary {
    /// Remote endpoint serving this vocabulary.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Genre => "genres",
            Self::Keyword => "keywords",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Genre => "genre",
            Self::Keyword => "keyword",
        }
    }
}

/// Session-scoped cache of vocabulary names, partitioned per vocabulary.
///
/// Entries are never evicted. Ids the remote service does not return stay
/// unresolved and are omitted from resolved output.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    genres: HashMap<u64, String>,
    keywords: HashMap<u64, String>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self, vocabulary: Vocabulary) -> &HashMap<u64, String> {
        match vocabulary {
            Vocabulary::Genre => &self.genres,
            Vocabulary::Keyword => &self.keywords,
        }
    }

    fn entries_mut(&mut self, vocabulary: Vocabulary) -> &mut HashMap<u64, String> {
        match vocabulary {
            Vocabulary::Genre => &mut self.genres,
            Vocabulary::Keyword => &mut self.keywords,
        }
    }

    /// Number of cached names for one vocabulary.
    pub fn len(&self, vocabulary: Vocabulary) -> usize {
        self.entries(vocabulary).len()
    }

    /// Resolves `ids` to names in input order.
    ///
    /// Issues at most one throttled batch lookup covering every id not yet
    /// cached. An empty id list never touches the cache or the service.
    pub fn resolve(
        &mut self,
        ids: &[u64],
        vocabulary: Vocabulary,
        service: &dyn MetadataService,
        throttle: &dyn Throttle,
    ) -> Result<Vec<String>, String> {
        if ids.is_empty() {
            debug!("No {} ids for game", vocabulary.label());
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        {
            let entries = self.entries(vocabulary);
            for id in ids {
                match entries.get(id) {
                    Some(name) => debug!(
                        "Found {} for {} {} in cache",
                        name,
                        vocabulary.label(),
                        id
                    ),
                    None => {
                        if seen.insert(*id) {
                            debug!("Did not find {} {} in cache", vocabulary.label(), id);
                            missing.push(*id);
                        }
                    }
                }
            }
        }

        if !missing.is_empty() {
            info!(
                "Looking up {} ids {:?} after throttle",
                vocabulary.label(),
                missing
            );
            throttle.wait();
            let fetched = service.lookup(vocabulary, &missing)?;
            for id in missing.iter().filter(|id| !fetched.contains_key(*id)) {
                warn!(
                    "{} {} was not returned by lookup; leaving it unresolved",
                    vocabulary.label(),
                    id
                );
            }
            self.entries_mut(vocabulary).extend(fetched);
        }

        let entries = self.entries(vocabulary);
        Ok(ids
            .iter()
            .filter_map(|id| entries.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{ReferenceCache, Vocabulary};
    use crate::test_support::{CountingThrottle, FakeMetadataService};

    fn service() -> FakeMetadataService {
        FakeMetadataService::new()
            .with_genre(5, "Puzzle")
            .with_genre(12, "Role-playing (RPG)")
            .with_genre(31, "Adventure")
            .with_keyword(7, "roguelike")
    }

    #[test]
    fn test_resolve_unseen_ids_issues_one_batch_and_keeps_input_order() {
        let service = service();
        let throttle = CountingThrottle::default();
        let mut cache = ReferenceCache::new();

        let names = cache
            .resolve(&[31, 5, 12], Vocabulary::Genre, &service, &throttle)
            .expect("resolve should succeed");

        assert_eq!(names, vec!["Adventure", "Puzzle", "Role-playing (RPG)"]);
        assert_eq!(service.lookup_calls(), vec![(Vocabulary::Genre, vec![31, 5, 12])]);
        assert_eq!(throttle.waits(), 1);
    }

    #[test]
    fn test_resolve_cached_ids_makes_no_remote_calls() {
        let service = service();
        let throttle = CountingThrottle::default();
        let mut cache = ReferenceCache::new();
        cache
            .resolve(&[5, 12], Vocabulary::Genre, &service, &throttle)
            .expect("warm-up resolve should succeed");

        let names = cache
            .resolve(&[12, 5], Vocabulary::Genre, &service, &throttle)
            .expect("cached resolve should succeed");

        assert_eq!(names, vec!["Role-playing (RPG)", "Puzzle"]);
        assert_eq!(service.lookup_calls().len(), 1);
        assert_eq!(throttle.waits(), 1);
    }

    #[test]
    fn test_resolve_fetches_only_missing_ids() {
        let service = service();
        let throttle = CountingThrottle::default();
        let mut cache = ReferenceCache::new();
        cache
            .resolve(&[5], Vocabulary::Genre, &service, &throttle)
            .expect("warm-up resolve should succeed");

        let names = cache
            .resolve(&[5, 31, 31], Vocabulary::Genre, &service, &throttle)
            .expect("resolve should succeed");

        assert_eq!(names, vec!["Puzzle", "Adventure", "Adventure"]);
        assert_eq!(
            service.lookup_calls(),
            vec![(Vocabulary::Genre, vec![5]), (Vocabulary::Genre, vec![31])]
        );
    }

    #[test]
    fn test_resolve_empty_ids_skips_cache_and_service() {
        let service = service();
        let throttle = CountingThrottle::default();
        let mut cache = ReferenceCache::new();

        let names = cache
            .resolve(&[], Vocabulary::Keyword, &service, &throttle)
            .expect("empty resolve should succeed");

        assert!(names.is_empty());
        assert!(service.lookup_calls().is_empty());
        assert_eq!(throttle.waits(), 0);
    }

    #[test]
    fn test_resolve_omits_ids_missing_upstream_without_requerying_forever() {
        let service = service();
        let throttle = CountingThrottle::default();
        let mut cache = ReferenceCache::new();

        let names = cache
            .resolve(&[5, 999], Vocabulary::Genre, &service, &throttle)
            .expect("resolve should tolerate missing ids");

        assert_eq!(names, vec!["Puzzle"]);
        assert_eq!(service.lookup_calls().len(), 1);
        assert_eq!(cache.len(Vocabulary::Genre), 1);
    }

    #[test]
    fn test_vocabularies_are_cached_independently() {
        let service = service();
        let throttle = CountingThrottle::default();
        let mut cache = ReferenceCache::new();
        cache
            .resolve(&[5], Vocabulary::Genre, &service, &throttle)
            .expect("genre resolve should succeed");

        let keywords = cache
            .resolve(&[7], Vocabulary::Keyword, &service, &throttle)
            .expect("keyword resolve should succeed");

        assert_eq!(keywords, vec!["roguelike"]);
        assert_eq!(cache.len(Vocabulary::Genre), 1);
        assert_eq!(cache.len(Vocabulary::Keyword), 1);
        assert_eq!(service.lookup_calls().len(), 2);
    }

    #[test]
    fn test_resolve_propagates_lookup_failure_without_caching() {
        let service = service().failing_lookups("IGDB request failed (genres): 503");
        let throttle = CountingThrottle::default();
        let mut cache = ReferenceCache::new();

        let error = cache
            .resolve(&[5], Vocabulary::Genre, &service, &throttle)
            .expect_err("lookup failure should propagate");

        assert!(error.contains("503"));
        assert_eq!(cache.len(Vocabulary::Genre), 0);
    }
}
