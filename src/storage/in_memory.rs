use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::{sub_slugs, trigram, VenueStore};
use crate::error::Result;
use crate::types::VenueRecord;

/// Immutable in-memory venue snapshot for development and testing.
///
/// Lookups go through three indexes built once at construction: exact slug,
/// raw 3-character windows of each slug (substring containment), and padded
/// word trigrams (similarity ranking).
pub struct InMemoryVenueStore {
    venues: Vec<VenueRecord>,
    by_slug: HashMap<String, usize>,
    substring_index: HashMap<String, Vec<usize>>,
    trigram_index: HashMap<String, Vec<usize>>,
    trigram_sizes: Vec<usize>,
}

impl Default for InMemoryVenueStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryVenueStore {
    pub fn new(venues: Vec<VenueRecord>) -> Self {
        let mut by_slug = HashMap::new();
        let mut substring_index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut trigram_index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut trigram_sizes = Vec::with_capacity(venues.len());

        for (idx, venue) in venues.iter().enumerate() {
            by_slug.insert(venue.slug.clone(), idx);

            let windows: HashSet<String> = char_windows(&venue.slug).into_iter().collect();
            for window in windows {
                substring_index.entry(window).or_default().push(idx);
            }

            let grams = trigram::trigrams(&venue.slug);
            trigram_sizes.push(grams.len());
            for gram in grams {
                trigram_index.entry(gram).or_default().push(idx);
            }
        }

        debug!("Indexed {} venues ({} trigrams)", venues.len(), trigram_index.len());

        Self {
            venues,
            by_slug,
            substring_index,
            trigram_index,
            trigram_sizes,
        }
    }

    /// Load a JSON array of venue records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let venues: Vec<VenueRecord> = serde_json::from_str(&content)?;
        info!("Loaded {} venues from {}", venues.len(), path.display());
        Ok(Self::new(venues))
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    /// Venues whose slug contains `fragment`, shortest slug first. Fragments
    /// shorter than one window cannot be answered from the index.
    fn slugs_containing(&self, fragment: &str) -> Vec<usize> {
        let windows = char_windows(fragment);
        if windows.is_empty() {
            return Vec::new();
        }

        let mut postings: Vec<&Vec<usize>> = Vec::with_capacity(windows.len());
        for window in &windows {
            match self.substring_index.get(window) {
                Some(list) => postings.push(list),
                None => return Vec::new(),
            }
        }
        postings.sort_by_key(|list| list.len());

        let mut hits: Vec<usize> = postings[0]
            .iter()
            .copied()
            .filter(|idx| postings[1..].iter().all(|list| list.contains(idx)))
            .filter(|idx| self.venues[*idx].slug.contains(fragment))
            .collect();
        hits.sort_by(|a, b| {
            let (va, vb) = (&self.venues[*a], &self.venues[*b]);
            va.slug.len().cmp(&vb.slug.len()).then_with(|| va.slug.cmp(&vb.slug))
        });
        hits
    }
}

fn char_windows(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

#[async_trait]
impl VenueStore for InMemoryVenueStore {
    async fn find_exact(&self, slug: &str) -> Result<Option<VenueRecord>> {
        Ok(self.by_slug.get(slug).map(|idx| self.venues[*idx].clone()))
    }

    async fn find_containing(&self, fragment: &str, limit: usize) -> Result<Vec<VenueRecord>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        let inside = sub_slugs(fragment)
            .into_iter()
            .filter_map(|sub| self.by_slug.get(&sub).copied());

        for idx in self.slugs_containing(fragment).into_iter().chain(inside) {
            if out.len() >= limit {
                break;
            }
            if seen.insert(idx) {
                out.push(self.venues[idx].clone());
            }
        }
        Ok(out)
    }

    async fn find_similar(&self, text: &str, limit: usize) -> Result<Vec<(VenueRecord, f64)>> {
        let query = trigram::trigrams(text);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut shared: HashMap<usize, usize> = HashMap::new();
        for gram in &query {
            if let Some(list) = self.trigram_index.get(gram) {
                for idx in list {
                    *shared.entry(*idx).or_insert(0) += 1;
                }
            }
        }

        let mut scored: Vec<(usize, f64)> = shared
            .into_iter()
            .map(|(idx, count)| {
                let union = query.len() + self.trigram_sizes[idx] - count;
                (idx, count as f64 / union as f64)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.venues[a.0].slug.cmp(&self.venues[b.0].slug))
        });
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(idx, sim)| (self.venues[idx].clone(), sim))
            .collect())
    }
}
