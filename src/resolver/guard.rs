use std::collections::HashSet;
use tracing::warn;

use crate::metrics;
use crate::types::MatchResult;

/// Slugs visited while serving one external request, in visit order.
/// Lives for a single request and is never shared between requests.
///
/// Comparison is exact: venue slugs are case-sensitive keys, so
/// `Albion-Hotel` and `albion-hotel` are different requests.
#[derive(Debug, Default, Clone)]
pub struct RedirectChain {
    visited: Vec<String>,
    seen: HashSet<String>,
}

impl RedirectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a slug; returns `false` if it was already in the chain.
    pub fn visit(&mut self, slug: &str) -> bool {
        if self.seen.insert(slug.to_string()) {
            self.visited.push(slug.to_string());
            true
        } else {
            false
        }
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.seen.contains(slug)
    }

    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

/// Refuse a redirect back into a slug this request already visited.
/// Targets are recorded when they are themselves resolved, not here.
///
/// The blocked target is offered as a one-item suggestion instead, so the user
/// can still reach it without the engine bouncing them around.
pub fn guard(result: MatchResult, chain: &RedirectChain) -> MatchResult {
    match result {
        MatchResult::Redirect(candidate) => {
            if chain.contains(&candidate.venue.slug) {
                warn!(
                    target = %candidate.venue.slug,
                    chain = ?chain.visited(),
                    "Redirect cycle blocked"
                );
                metrics::resolution::cycle_blocked();
                MatchResult::suggestions(vec![candidate])
            } else {
                MatchResult::Redirect(candidate)
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::in_memory::tests::venue;
    use crate::types::Candidate;

    fn redirect(slug: &str) -> MatchResult {
        MatchResult::Redirect(Candidate {
            venue: venue(slug),
            confidence: 0.95,
        })
    }

    #[test]
    fn test_fresh_target_passes() {
        let mut chain = RedirectChain::new();
        chain.visit("albion-hotel-1759813035");

        let result = guard(redirect("albion-hotel"), &chain);
        assert!(matches!(result, MatchResult::Redirect(_)));
        assert_eq!(chain.visited(), ["albion-hotel-1759813035"]);
    }

    #[test]
    fn test_visited_target_is_downgraded() {
        let mut chain = RedirectChain::new();
        chain.visit("the-crown");
        chain.visit("the-crown-inn");

        match guard(redirect("the-crown"), &chain) {
            MatchResult::Suggestions(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].venue.slug, "the-crown");
            }
            other => panic!("expected suggestions, got {:?}", other),
        }
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_chain_comparison_is_exact() {
        let mut chain = RedirectChain::new();
        assert!(chain.visit("The-Crown"));
        assert!(!chain.visit("The-Crown"));
        assert!(chain.visit("the-crown"));
        assert!(!chain.contains("THE-CROWN"));
    }

    #[test]
    fn test_case_variant_of_request_is_not_a_cycle() {
        let mut chain = RedirectChain::new();
        chain.visit("Albion-Hotel");
        assert!(matches!(guard(redirect("albion-hotel"), &chain), MatchResult::Redirect(_)));
    }

    #[test]
    fn test_non_redirects_pass_through() {
        let chain = RedirectChain::new();
        assert_eq!(guard(MatchResult::NotFound, &chain), MatchResult::NotFound);
        assert!(chain.is_empty());
    }
}
