use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::{ResolverError, Result};
use crate::metrics;
use crate::storage::VenueStore;
use crate::types::VenueRecord;

/// The two forms of a missing slug that retrieval and scoring work from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugQuery {
    pub normalized: String,
    pub raw: String,
}

/// One independent way of pulling candidate venues out of the store.
/// Generators run concurrently and must not depend on each other.
#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, store: &dyn VenueStore, query: &SlugQuery) -> Result<Vec<VenueRecord>>;
}

/// Venue whose slug is exactly the normalized slug.
pub struct ExactGenerator;

#[async_trait]
impl CandidateGenerator for ExactGenerator {
    fn name(&self) -> &'static str {
        "exact"
    }

    async fn generate(&self, store: &dyn VenueStore, query: &SlugQuery) -> Result<Vec<VenueRecord>> {
        Ok(store.find_exact(&query.normalized).await?.into_iter().collect())
    }
}

/// Venues whose slug contains the normalized slug, or is contained by it.
pub struct ContainmentGenerator {
    pub limit: usize,
}

#[async_trait]
impl CandidateGenerator for ContainmentGenerator {
    fn name(&self) -> &'static str {
        "containment"
    }

    async fn generate(&self, store: &dyn VenueStore, query: &SlugQuery) -> Result<Vec<VenueRecord>> {
        store.find_containing(&query.normalized, self.limit).await
    }
}

/// Top venues by trigram similarity, keeping those at or above `floor`.
pub struct SimilarityGenerator {
    pub limit: usize,
    pub floor: f64,
}

#[async_trait]
impl CandidateGenerator for SimilarityGenerator {
    fn name(&self) -> &'static str {
        "similarity"
    }

    async fn generate(&self, store: &dyn VenueStore, query: &SlugQuery) -> Result<Vec<VenueRecord>> {
        let similar = store.find_similar(&query.normalized, self.limit).await?;
        Ok(similar
            .into_iter()
            .filter(|(_, sim)| *sim >= self.floor)
            .map(|(venue, _)| venue)
            .collect())
    }
}

pub fn default_generators(config: &ResolverConfig) -> Vec<Arc<dyn CandidateGenerator>> {
    vec![
        Arc::new(ExactGenerator),
        Arc::new(ContainmentGenerator {
            limit: config.retrieval_limit,
        }),
        Arc::new(SimilarityGenerator {
            limit: config.similarity_limit,
            floor: config.similarity_floor,
        }),
    ]
}

type GeneratorOutcome = (usize, &'static str, Result<Vec<VenueRecord>>);

/// Fans a query out to every generator and merges what comes back.
pub struct CandidateRetriever {
    store: Arc<dyn VenueStore>,
    generators: Vec<Arc<dyn CandidateGenerator>>,
    timeout: Duration,
    limit: usize,
}

impl CandidateRetriever {
    pub fn new(
        store: Arc<dyn VenueStore>,
        generators: Vec<Arc<dyn CandidateGenerator>>,
        timeout: Duration,
        limit: usize,
    ) -> Self {
        Self {
            store,
            generators,
            timeout,
            limit,
        }
    }

    pub fn store(&self) -> &Arc<dyn VenueStore> {
        &self.store
    }

    /// Candidates from all generators, merged in generator order and
    /// de-duplicated by venue id.
    ///
    /// A failing or timed-out generator is skipped. Only when every generator
    /// fails does retrieval report `StoreUnavailable`.
    #[tracing::instrument(skip(self), fields(normalized = %query.normalized))]
    pub async fn retrieve(&self, query: &SlugQuery) -> Result<Vec<VenueRecord>> {
        if query.normalized.is_empty() || self.generators.is_empty() {
            return Ok(Vec::new());
        }

        let mut tasks = JoinSet::new();
        for (idx, generator) in self.generators.iter().enumerate() {
            let generator = Arc::clone(generator);
            let store = Arc::clone(&self.store);
            let query = query.clone();
            let timeout = self.timeout;

            tasks.spawn(async move {
                let name = generator.name();
                let outcome = match tokio::time::timeout(timeout, generator.generate(store.as_ref(), &query)).await {
                    Ok(result) => result,
                    Err(_) => Err(ResolverError::Timeout {
                        operation: name.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                };
                (idx, name, outcome)
            });
        }

        let mut outcomes: Vec<GeneratorOutcome> = Vec::with_capacity(self.generators.len());
        let mut last_error: Option<String> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Candidate generator task failed: {}", e);
                    last_error = Some(e.to_string());
                }
            }
        }
        outcomes.sort_by_key(|(idx, _, _)| *idx);

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        let mut succeeded = 0usize;
        for (_, name, outcome) in outcomes {
            match outcome {
                Ok(venues) => {
                    succeeded += 1;
                    debug!(generator = name, count = venues.len(), "Generator returned candidates");
                    for venue in venues {
                        if seen.insert(venue.id) {
                            merged.push(venue);
                        }
                    }
                }
                Err(e) => {
                    warn!(generator = name, error = %e, "Candidate generator failed, continuing without it");
                    metrics::resolution::generator_failed(name);
                    last_error = Some(e.to_string());
                }
            }
        }

        if succeeded == 0 {
            return Err(ResolverError::store_unavailable(
                "retrieve",
                last_error.unwrap_or_else(|| "no generator completed".to_string()),
            ));
        }

        merged.truncate(self.limit);
        Ok(merged)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::in_memory::tests::venue;
    use crate::storage::InMemoryVenueStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps a store and fails or stalls chosen operations.
    pub(crate) struct FlakyStore {
        pub inner: InMemoryVenueStore,
        pub fail_exact: bool,
        pub fail_containing: bool,
        pub fail_similar: bool,
        pub stall_similar: bool,
        pub calls: AtomicUsize,
    }

    impl FlakyStore {
        pub(crate) fn new(inner: InMemoryVenueStore) -> Self {
            Self {
                inner,
                fail_exact: false,
                fail_containing: false,
                fail_similar: false,
                stall_similar: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn down(inner: InMemoryVenueStore) -> Self {
            Self {
                fail_exact: true,
                fail_containing: true,
                fail_similar: true,
                ..Self::new(inner)
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VenueStore for FlakyStore {
        async fn find_exact(&self, slug: &str) -> Result<Option<VenueRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_exact {
                return Err(ResolverError::store_unavailable("find_exact", "connection refused"));
            }
            self.inner.find_exact(slug).await
        }

        async fn find_containing(&self, fragment: &str, limit: usize) -> Result<Vec<VenueRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_containing {
                return Err(ResolverError::store_unavailable("find_containing", "connection refused"));
            }
            self.inner.find_containing(fragment, limit).await
        }

        async fn find_similar(&self, text: &str, limit: usize) -> Result<Vec<(VenueRecord, f64)>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.stall_similar {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail_similar {
                return Err(ResolverError::store_unavailable("find_similar", "connection refused"));
            }
            self.inner.find_similar(text, limit).await
        }
    }

    fn fixture() -> InMemoryVenueStore {
        InMemoryVenueStore::new(vec![
            venue("albion-hotel"),
            venue("albion-hotel-annex"),
            venue("district-hotel"),
        ])
    }

    fn retriever(store: Arc<dyn VenueStore>) -> CandidateRetriever {
        let config = ResolverConfig::default();
        CandidateRetriever::new(store, default_generators(&config), config.store_timeout(), config.retrieval_limit)
    }

    fn query(normalized: &str) -> SlugQuery {
        SlugQuery {
            normalized: normalized.to_string(),
            raw: normalized.to_string(),
        }
    }

    fn slugs(venues: &[VenueRecord]) -> Vec<&str> {
        venues.iter().map(|v| v.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn test_merges_and_dedupes_in_generator_order() {
        let retriever = retriever(Arc::new(fixture()));
        let found = retriever.retrieve(&query("albion-hotel")).await.unwrap();
        // exact first, then the containment hit; similarity repeats are dropped
        assert_eq!(slugs(&found), vec!["albion-hotel", "albion-hotel-annex"]);
    }

    #[tokio::test]
    async fn test_similarity_floor_applies() {
        let retriever = retriever(Arc::new(fixture()));
        let found = retriever.retrieve(&query("distric-hotel")).await.unwrap();
        assert_eq!(slugs(&found), vec!["district-hotel"]);
    }

    #[tokio::test]
    async fn test_empty_query_never_touches_store() {
        let store = Arc::new(FlakyStore::new(fixture()));
        let retriever = retriever(store.clone());
        assert!(retriever.retrieve(&query("")).await.unwrap().is_empty());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_results() {
        let mut flaky = FlakyStore::new(fixture());
        flaky.fail_exact = true;
        flaky.fail_similar = true;
        let retriever = retriever(Arc::new(flaky));

        let found = retriever.retrieve(&query("albion-hotel")).await.unwrap();
        assert_eq!(slugs(&found), vec!["albion-hotel", "albion-hotel-annex"]);
    }

    #[tokio::test]
    async fn test_total_failure_is_store_unavailable() {
        let retriever = retriever(Arc::new(FlakyStore::down(fixture())));
        let err = retriever.retrieve(&query("albion-hotel")).await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_generator_times_out_without_blocking() {
        let mut flaky = FlakyStore::new(fixture());
        flaky.stall_similar = true;
        let retriever = retriever(Arc::new(flaky));

        let found = retriever.retrieve(&query("distric-hotel")).await.unwrap();
        // similarity timed out; containment and exact found nothing
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_results_truncated_to_limit() {
        let venues = (0..20).map(|i| venue(&format!("quiz-bar-{}", i))).collect();
        let config = ResolverConfig::default();
        let retriever = CandidateRetriever::new(
            Arc::new(InMemoryVenueStore::new(venues)),
            default_generators(&config),
            config.store_timeout(),
            5,
        );
        let found = retriever.retrieve(&query("quiz-bar")).await.unwrap();
        assert_eq!(found.len(), 5);
    }
}
