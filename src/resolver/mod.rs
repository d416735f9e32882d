//! Venue resolution for slugs that no longer exist.
//!
//! `resolve` runs the pipeline normalize → retrieve → score → decide → guard,
//! memoized per normalized slug. The outcome is a `MatchResult`; translating
//! it to an HTTP redirect, a disambiguation page or a 404 is the caller's job.

pub mod cache;
pub mod decision;
pub mod guard;
pub mod normalize;
pub mod retriever;
pub mod score;

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ResolverConfig;
use crate::error::{ResolverError, Result};
use crate::metrics;
use crate::storage::VenueStore;
use crate::types::MatchResult;

pub use cache::{get_or_resolve, CacheStatus, NoopResultCache, ResultCache, TtlResultCache};
pub use decision::{decide, rank, score_candidates, Thresholds};
pub use guard::{guard, RedirectChain};
pub use normalize::normalize;
pub use retriever::{
    default_generators, CandidateGenerator, CandidateRetriever, ContainmentGenerator, ExactGenerator,
    SimilarityGenerator, SlugQuery,
};
pub use score::{score, SignalBreakdown};

pub struct VenueResolver {
    retriever: CandidateRetriever,
    cache: Arc<dyn ResultCache>,
    thresholds: Thresholds,
    config: ResolverConfig,
}

impl VenueResolver {
    pub fn new(store: Arc<dyn VenueStore>, cache: Arc<dyn ResultCache>, config: ResolverConfig) -> Self {
        let retriever = CandidateRetriever::new(
            store,
            default_generators(&config),
            config.store_timeout(),
            config.retrieval_limit,
        );
        Self {
            retriever,
            cache,
            thresholds: Thresholds::from(&config),
            config,
        }
    }

    /// Resolver with a TTL cache sized from `config`.
    pub fn with_ttl_cache(store: Arc<dyn VenueStore>, config: ResolverConfig) -> Self {
        let cache = Arc::new(TtlResultCache::new(config.cache_ttl()));
        Self::new(store, cache, config)
    }

    /// Replace the candidate generator list.
    pub fn with_generators(mut self, generators: Vec<Arc<dyn CandidateGenerator>>) -> Self {
        self.retriever = CandidateRetriever::new(
            Arc::clone(self.retriever.store()),
            generators,
            self.config.store_timeout(),
            self.config.retrieval_limit,
        );
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn ResultCache> {
        &self.cache
    }

    /// Resolve one missing slug for one external request.
    pub async fn resolve(&self, missing_slug: &str) -> MatchResult {
        let mut chain = RedirectChain::new();
        self.resolve_in_chain(missing_slug, &mut chain).await
    }

    /// Resolve within an existing request-scoped chain. Store failures are
    /// logged and reported as `NotFound`; this never returns an error.
    #[tracing::instrument(skip(self, chain))]
    pub async fn resolve_in_chain(&self, missing_slug: &str, chain: &mut RedirectChain) -> MatchResult {
        let started = Instant::now();

        let result = match self.try_resolve(missing_slug, chain).await {
            Ok(result) => result,
            Err(e) if e.is_store_unavailable() => {
                error!(slug = missing_slug, error = %e, "Venue store unavailable, reporting not found");
                metrics::resolution::store_unavailable();
                MatchResult::NotFound
            }
            Err(ResolverError::InvalidInput(reason)) => {
                debug!(slug = missing_slug, reason = %reason, "Rejected missing slug");
                MatchResult::NotFound
            }
            Err(e) => {
                error!(slug = missing_slug, error = %e, "Venue resolution failed, reporting not found");
                MatchResult::NotFound
            }
        };

        metrics::resolution::outcome(result.outcome_label());
        if let Some(confidence) = result.top_confidence() {
            metrics::resolution::top_confidence(confidence);
        }
        metrics::resolution::duration(started.elapsed().as_secs_f64());
        info!(slug = missing_slug, outcome = result.outcome_label(), "Venue resolution complete");
        result
    }

    async fn try_resolve(&self, missing_slug: &str, chain: &mut RedirectChain) -> Result<MatchResult> {
        let raw = missing_slug.trim();
        if raw.is_empty() {
            return Err(ResolverError::InvalidInput("missing slug is empty".to_string()));
        }

        if !chain.visit(raw) {
            warn!(slug = raw, chain = ?chain.visited(), "Slug already visited in this request");
            metrics::resolution::cycle_blocked();
            return Ok(MatchResult::NotFound);
        }

        let query = SlugQuery {
            normalized: normalize(raw),
            raw: raw.to_string(),
        };
        debug!(raw = %query.raw, normalized = %query.normalized, "Normalized missing slug");
        if query.normalized.is_empty() {
            return Err(ResolverError::InvalidInput(format!("'{}' has no usable search term", raw)));
        }

        let (mut result, status) =
            get_or_resolve(self.cache.as_ref(), &query.normalized, || self.compute(&query)).await?;

        // A remembered redirect may point at a venue deleted since it was cached
        if let (MatchResult::Redirect(candidate), CacheStatus::Hit) = (&result, status) {
            if !self.redirect_target_exists(&candidate.venue.slug).await? {
                warn!(target = %candidate.venue.slug, "Cached redirect target is gone, recomputing");
                metrics::cache::stale_redirect();
                self.cache.invalidate(&query.normalized);
                result = self.compute(&query).await?;
                self.cache.insert(&query.normalized, result.clone());
            }
        }

        Ok(guard(result, chain))
    }

    /// Retrieval, scoring and decision for one query, uncached.
    async fn compute(&self, query: &SlugQuery) -> Result<MatchResult> {
        let venues = self.retriever.retrieve(query).await?;
        let candidates = score_candidates(venues, &query.normalized, &query.raw);
        debug!(candidates = candidates.len(), "Scored candidates");
        Ok(decide(candidates, &self.thresholds))
    }

    async fn redirect_target_exists(&self, slug: &str) -> Result<bool> {
        let timeout = self.config.store_timeout();
        match tokio::time::timeout(timeout, self.retriever.store().find_exact(slug)).await {
            Ok(found) => Ok(found?.is_some()),
            Err(_) => Err(ResolverError::Timeout {
                operation: "find_exact".to_string(),
                timeout_ms: self.config.store_timeout_ms,
            }),
        }
    }
}
