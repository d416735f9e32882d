use std::cmp::Ordering;

use crate::config::ResolverConfig;
use crate::types::{Candidate, MatchResult, VenueRecord};

use super::score::score;

/// Cut-offs for the decision state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub noise_floor: f64,
    pub suggestion: f64,
    pub redirect: f64,
    pub max_suggestions: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for Thresholds {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            noise_floor: config.noise_floor,
            suggestion: config.suggestion_threshold,
            redirect: config.redirect_threshold,
            max_suggestions: config.max_suggestions,
        }
    }
}

pub fn score_candidates(venues: Vec<VenueRecord>, normalized: &str, raw: &str) -> Vec<Candidate> {
    venues
        .into_iter()
        .map(|venue| {
            let confidence = score(&venue.slug, normalized, raw);
            Candidate { venue, confidence }
        })
        .collect()
}

/// Descending confidence, then slug for a deterministic order among ties.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.venue.slug.cmp(&b.venue.slug))
    });
}

/// Map scored candidates to an outcome.
///
/// Noise below the floor is dropped first. A lone survivor at or above the
/// redirect threshold redirects; anything else, including several candidates
/// above the redirect threshold, becomes a ranked suggestion list.
pub fn decide(candidates: Vec<Candidate>, thresholds: &Thresholds) -> MatchResult {
    let mut survivors: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.confidence >= thresholds.noise_floor)
        .collect();

    if survivors.is_empty() {
        return MatchResult::NotFound;
    }

    if survivors.len() == 1 && survivors[0].confidence >= thresholds.redirect {
        return MatchResult::Redirect(survivors.remove(0));
    }

    survivors.retain(|c| c.confidence >= thresholds.suggestion);
    rank(&mut survivors);
    survivors.truncate(thresholds.max_suggestions);
    MatchResult::suggestions(survivors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::in_memory::tests::venue;
    use proptest::prelude::*;

    fn candidate(slug: &str, confidence: f64) -> Candidate {
        Candidate {
            venue: venue(slug),
            confidence,
        }
    }

    #[test]
    fn test_no_candidates_is_not_found() {
        assert_eq!(decide(Vec::new(), &Thresholds::default()), MatchResult::NotFound);
    }

    #[test]
    fn test_noise_only_is_not_found() {
        let result = decide(vec![candidate("a", 0.2), candidate("b", 0.49)], &Thresholds::default());
        assert_eq!(result, MatchResult::NotFound);
    }

    #[test]
    fn test_single_confident_candidate_redirects() {
        let result = decide(vec![candidate("albion-hotel", 0.93), candidate("noise", 0.3)], &Thresholds::default());
        match result {
            MatchResult::Redirect(c) => assert_eq!(c.venue.slug, "albion-hotel"),
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[test]
    fn test_tied_confident_candidates_become_suggestions() {
        let result = decide(
            vec![candidate("the-crown-leeds", 1.0), candidate("the-crown-york", 1.0)],
            &Thresholds::default(),
        );
        match result {
            MatchResult::Suggestions(list) => {
                let slugs: Vec<&str> = list.iter().map(|c| c.venue.slug.as_str()).collect();
                assert_eq!(slugs, vec!["the-crown-leeds", "the-crown-york"]);
            }
            other => panic!("expected suggestions, got {:?}", other),
        }
    }

    #[test]
    fn test_survivor_between_floor_and_suggestion_is_not_found() {
        let result = decide(vec![candidate("a", 0.6), candidate("b", 0.65)], &Thresholds::default());
        assert_eq!(result, MatchResult::NotFound);
    }

    #[test]
    fn test_single_moderate_candidate_is_suggested() {
        let result = decide(vec![candidate("district-hotel", 0.78)], &Thresholds::default());
        assert!(matches!(result, MatchResult::Suggestions(ref list) if list.len() == 1));
    }

    #[test]
    fn test_suggestions_are_capped_and_ranked() {
        let candidates = (0..8).map(|i| candidate(&format!("venue-{}", i), 0.70 + i as f64 * 0.02)).collect();
        match decide(candidates, &Thresholds::default()) {
            MatchResult::Suggestions(list) => {
                assert_eq!(list.len(), 5);
                assert_eq!(list[0].venue.slug, "venue-7");
            }
            other => panic!("expected suggestions, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn decide_upholds_outcome_invariants(confidences in prop::collection::vec(0.0f64..=1.0, 0..12)) {
            let candidates: Vec<Candidate> = confidences
                .iter()
                .enumerate()
                .map(|(i, c)| candidate(&format!("venue-{}", i), *c))
                .collect();
            let survivors = confidences.iter().filter(|c| **c >= 0.5).count();

            match decide(candidates, &Thresholds::default()) {
                MatchResult::Redirect(c) => {
                    prop_assert_eq!(survivors, 1);
                    prop_assert!(c.confidence >= 0.9);
                }
                MatchResult::Suggestions(list) => {
                    prop_assert!(!list.is_empty() && list.len() <= 5);
                    prop_assert!(list.windows(2).all(|w| w[0].confidence >= w[1].confidence));
                    prop_assert!(list.iter().all(|c| c.confidence >= 0.7));
                }
                MatchResult::NotFound => {}
            }
        }
    }
}
