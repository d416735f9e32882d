use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A venue as exposed by the read-only venue store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub city_id: Uuid,
    pub country_id: Uuid,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A stored venue paired with its confidence against the current query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub venue: VenueRecord,
    /// Always within [0, 1]
    pub confidence: f64,
}

/// The decision for one missing slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum MatchResult {
    /// A single unambiguous match at or above the redirect threshold
    Redirect(Candidate),
    /// Non-empty, at most five, sorted by descending confidence
    Suggestions(Vec<Candidate>),
    NotFound,
}

impl MatchResult {
    pub fn outcome_label(&self) -> &'static str {
        match self {
            MatchResult::Redirect(_) => "redirect",
            MatchResult::Suggestions(_) => "suggestions",
            MatchResult::NotFound => "not_found",
        }
    }

    /// Wraps a ranked list, collapsing an empty one to `NotFound`.
    pub fn suggestions(candidates: Vec<Candidate>) -> Self {
        if candidates.is_empty() {
            MatchResult::NotFound
        } else {
            MatchResult::Suggestions(candidates)
        }
    }

    pub fn top_confidence(&self) -> Option<f64> {
        match self {
            MatchResult::Redirect(candidate) => Some(candidate.confidence),
            MatchResult::Suggestions(candidates) => candidates.first().map(|c| c.confidence),
            MatchResult::NotFound => None,
        }
    }
}
