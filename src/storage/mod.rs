pub mod in_memory;
#[cfg(feature = "db")]
pub mod libsql_store;
pub mod trigram;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::VenueRecord;

pub use in_memory::InMemoryVenueStore;
#[cfg(feature = "db")]
pub use libsql_store::LibsqlVenueStore;

/// Read-only view over stored venues. Every lookup must be answerable from an
/// index (exact slug index, trigram index); implementations never full-scan.
#[async_trait]
pub trait VenueStore: Send + Sync {
    async fn find_exact(&self, slug: &str) -> Result<Option<VenueRecord>>;

    /// Venues whose slug contains `fragment`, or which `fragment` contains.
    async fn find_containing(&self, fragment: &str, limit: usize) -> Result<Vec<VenueRecord>>;

    /// Venues ordered by descending raw similarity to `text`.
    async fn find_similar(&self, text: &str, limit: usize) -> Result<Vec<(VenueRecord, f64)>>;
}

/// Hyphen-delimited contiguous sub-slugs of `fragment`, longest first.
/// `"a-b-c"` yields `a-b-c, a-b, b-c, a, b, c`. Used to answer the
/// "venue slug inside fragment" half of containment with exact lookups.
pub fn sub_slugs(fragment: &str) -> Vec<String> {
    let tokens: Vec<&str> = fragment.split('-').filter(|t| !t.is_empty()).collect();
    let mut out = Vec::new();
    for len in (1..=tokens.len()).rev() {
        for start in 0..=(tokens.len() - len) {
            out.push(tokens[start..start + len].join("-"));
        }
    }
    out
}
