//! Multi-signal confidence model for one candidate slug.
//!
//! Graded signals (Jaro-Winkler against the normalized and raw query, common
//! prefix ratio) are averaged by weight into a fuzzy similarity in [0, 1].
//! Binary signals (exact match, containment, starts-with) add fixed bonuses on
//! top. The total is capped at 1.0.

use serde::Serialize;

use crate::constants::{
    BONUS_CONTAINMENT, BONUS_EXACT, BONUS_STARTS_WITH, WEIGHT_COMMON_PREFIX, WEIGHT_JARO_NORMALIZED,
    WEIGHT_JARO_RAW,
};

/// Per-signal values, each already clamped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalBreakdown {
    pub exact: f64,
    pub jaro_normalized: f64,
    pub jaro_raw: f64,
    pub common_prefix: f64,
    pub containment: f64,
    pub starts_with: f64,
}

impl SignalBreakdown {
    pub fn compute(candidate_slug: &str, normalized: &str, raw: &str) -> Self {
        let flag = |hit: bool| if hit { 1.0 } else { 0.0 };

        Self {
            exact: flag(!normalized.is_empty() && candidate_slug == normalized),
            jaro_normalized: clamp_unit(strsim::jaro_winkler(candidate_slug, normalized)),
            jaro_raw: clamp_unit(strsim::jaro_winkler(candidate_slug, raw)),
            common_prefix: common_prefix_ratio(candidate_slug, normalized),
            containment: flag(is_contained(candidate_slug, normalized)),
            starts_with: flag(starts_with_slug(candidate_slug, normalized)),
        }
    }

    pub fn fuzzy(&self) -> f64 {
        let total = WEIGHT_JARO_NORMALIZED + WEIGHT_JARO_RAW + WEIGHT_COMMON_PREFIX;
        (self.jaro_normalized * WEIGHT_JARO_NORMALIZED
            + self.jaro_raw * WEIGHT_JARO_RAW
            + self.common_prefix * WEIGHT_COMMON_PREFIX)
            / total
    }

    pub fn bonus(&self) -> f64 {
        self.exact * BONUS_EXACT + self.containment * BONUS_CONTAINMENT + self.starts_with * BONUS_STARTS_WITH
    }

    pub fn confidence(&self) -> f64 {
        clamp_unit(self.fuzzy() + self.bonus())
    }
}

/// Confidence in [0, 1] that `candidate_slug` is the venue `raw` meant.
pub fn score(candidate_slug: &str, normalized: &str, raw: &str) -> f64 {
    SignalBreakdown::compute(candidate_slug, normalized, raw).confidence()
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Shared prefix length over the longer string's length, in characters.
fn common_prefix_ratio(a: &str, b: &str) -> f64 {
    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return 0.0;
    }
    let shared = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count();
    shared as f64 / longer as f64
}

fn is_contained(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(b) || b.contains(a)
}

/// `candidate` is `normalized` itself or `normalized` plus a hyphenated tail.
fn starts_with_slug(candidate: &str, normalized: &str) -> bool {
    if normalized.is_empty() {
        return false;
    }
    match candidate.strip_prefix(normalized) {
        Some(rest) => rest.is_empty() || rest.starts_with('-'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_match_is_certain() {
        assert_eq!(score("albion-hotel", "albion-hotel", "albion-hotel-1759813035"), 1.0);
        assert_eq!(score("the-crown", "the-crown", "the-crown"), 1.0);
    }

    #[test]
    fn test_typo_scores_as_suggestion() {
        let confidence = score("district-hotel", "distric-hotel", "distric-hotel");
        assert!(confidence >= 0.70, "got {}", confidence);
        assert!(confidence < 0.90, "got {}", confidence);
    }

    #[test]
    fn test_disambiguation_suffix_gets_starts_with_bonus() {
        let signals = SignalBreakdown::compute("albion-hotel-london", "albion-hotel", "albion-hotel");
        assert_eq!(signals.starts_with, 1.0);
        assert_eq!(signals.containment, 1.0);
        assert_eq!(signals.exact, 0.0);
        assert!(signals.confidence() >= 0.90);

        // A longer word sharing the prefix is not a disambiguation suffix
        let signals = SignalBreakdown::compute("albion-hotelier", "albion-hotel", "albion-hotel");
        assert_eq!(signals.starts_with, 0.0);
        assert_eq!(signals.containment, 1.0);
    }

    #[test]
    fn test_unrelated_slug_is_noise() {
        assert!(score("the-crown", "albion-hotel", "albion-hotel") < 0.50);
    }

    #[test]
    fn test_common_prefix_ratio() {
        assert_eq!(common_prefix_ratio("distric-hotel", "district-hotel"), 7.0 / 14.0);
        assert_eq!(common_prefix_ratio("", ""), 0.0);
        assert_eq!(common_prefix_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_empty_query_earns_no_bonus() {
        let signals = SignalBreakdown::compute("albion-hotel", "", "");
        assert_eq!(signals.bonus(), 0.0);
    }

    proptest! {
        #[test]
        fn score_is_within_unit_interval(
            candidate in "[a-z0-9-]{0,30}",
            normalized in "[a-z0-9-]{0,30}",
            raw in "[a-zA-Z0-9_-]{0,40}",
        ) {
            let s = score(&candidate, &normalized, &raw);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
