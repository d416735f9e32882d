use async_trait::async_trait;
use libsql::{Builder, Connection, Database, Row};
use std::collections::HashSet;
use std::env;
use tracing::{debug, info};
use uuid::Uuid;

use super::{sub_slugs, trigram, VenueStore};
use crate::error::{ResolverError, Result};
use crate::types::VenueRecord;

const VENUE_COLUMNS: &str = "v.id, v.slug, v.name, v.city_id, v.country_id, v.latitude, v.longitude";

/// Similarity recall fetches this many times `limit` rows from the trigram
/// index before re-ranking by Jaccard similarity.
const SIMILAR_RECALL_FACTOR: usize = 5;

fn db_err(context: &str, e: impl std::fmt::Display) -> ResolverError {
    ResolverError::Database {
        message: format!("{}: {}", context, e),
    }
}

/// Venue store backed by Turso/libSQL. Reads only; the exact lookup uses the
/// unique slug index, containment and similarity use the FTS5 trigram index.
pub struct LibsqlVenueStore {
    db: Database,
}

impl LibsqlVenueStore {
    /// Connect to a remote Turso database from `LIBSQL_URL` / `LIBSQL_AUTH_TOKEN`.
    pub async fn from_env() -> Result<Self> {
        let url = env::var("LIBSQL_URL").map_err(|_| ResolverError::Database {
            message: "LIBSQL_URL environment variable not set".to_string(),
        })?;
        let auth_token = env::var("LIBSQL_AUTH_TOKEN").map_err(|_| ResolverError::Database {
            message: "LIBSQL_AUTH_TOKEN environment variable not set".to_string(),
        })?;

        info!("Connecting to Turso database at {}", url);
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| db_err("Failed to connect to database", e))?;
        Ok(Self { db })
    }

    pub async fn open_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| db_err("Failed to open local database", e))?;
        Ok(Self { db })
    }

    fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| db_err("Failed to get database connection", e))
    }

    /// Create the development schema. Production stores are provisioned
    /// elsewhere and only read from.
    pub async fn run_migrations(&self) -> Result<()> {
        let conn = self.connection()?;
        let migration_sql = include_str!("../../migrations/001_create_venues.sql");
        conn.execute_batch(migration_sql)
            .await
            .map_err(|e| db_err("Failed to run migrations", e))?;
        info!("Venue schema migrations completed");
        Ok(())
    }

    async fn query_venues(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<VenueRecord>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| db_err("Failed to query venues", e))?;

        let mut venues = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("Failed to read row", e))? {
            venues.push(venue_from_row(&row)?);
        }
        Ok(venues)
    }
}

fn venue_from_row(row: &Row) -> Result<VenueRecord> {
    let text = |idx: i32, column: &str| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| db_err(&format!("Failed to get {}", column), e))
    };
    let uuid = |idx: i32, column: &str| -> Result<Uuid> {
        let raw = text(idx, column)?;
        Uuid::parse_str(&raw).map_err(|e| db_err(&format!("Invalid {} '{}'", column, raw), e))
    };

    Ok(VenueRecord {
        id: uuid(0, "id")?,
        slug: text(1, "slug")?,
        name: text(2, "name")?,
        city_id: uuid(3, "city_id")?,
        country_id: uuid(4, "country_id")?,
        latitude: row.get::<f64>(5).ok(),
        longitude: row.get::<f64>(6).ok(),
    })
}

/// FTS5 phrase literal; with the trigram tokenizer a phrase matches any slug
/// containing it as a substring.
fn fts_phrase(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

#[async_trait]
impl VenueStore for LibsqlVenueStore {
    async fn find_exact(&self, slug: &str) -> Result<Option<VenueRecord>> {
        let sql = format!("SELECT {} FROM venues v WHERE v.slug = ? LIMIT 1", VENUE_COLUMNS);
        let mut venues = self.query_venues(&sql, libsql::params![slug]).await?;
        Ok(venues.pop())
    }

    async fn find_containing(&self, fragment: &str, limit: usize) -> Result<Vec<VenueRecord>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();

        // Trigram tokenizer cannot answer phrases shorter than three characters
        if fragment.chars().count() >= 3 {
            let sql = format!(
                "SELECT {} FROM venue_slug_trigrams t JOIN venues v ON v.rowid = t.rowid \
                 WHERE venue_slug_trigrams MATCH ? ORDER BY length(v.slug), v.slug LIMIT ?",
                VENUE_COLUMNS
            );
            let inside = self
                .query_venues(&sql, libsql::params![fts_phrase(fragment), limit as i64])
                .await?;
            for venue in inside {
                if seen.insert(venue.id) {
                    out.push(venue);
                }
            }
        }

        let subs = sub_slugs(fragment);
        if out.len() < limit && !subs.is_empty() {
            let placeholders = vec!["?"; subs.len()].join(", ");
            let sql = format!(
                "SELECT {} FROM venues v WHERE v.slug IN ({}) ORDER BY length(v.slug) DESC, v.slug",
                VENUE_COLUMNS, placeholders
            );
            let around = self.query_venues(&sql, libsql::params_from_iter(subs)).await?;
            for venue in around {
                if out.len() >= limit {
                    break;
                }
                if seen.insert(venue.id) {
                    out.push(venue);
                }
            }
        }

        debug!("find_containing('{}') -> {} venues", fragment, out.len());
        Ok(out)
    }

    async fn find_similar(&self, text: &str, limit: usize) -> Result<Vec<(VenueRecord, f64)>> {
        let chars: Vec<char> = text.chars().collect();
        let windows: HashSet<String> = chars.windows(3).map(|w| w.iter().collect()).collect();
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let query = windows.iter().map(|w| fts_phrase(w)).collect::<Vec<_>>().join(" OR ");
        let sql = format!(
            "SELECT {} FROM venue_slug_trigrams t JOIN venues v ON v.rowid = t.rowid \
             WHERE venue_slug_trigrams MATCH ? ORDER BY rank LIMIT ?",
            VENUE_COLUMNS
        );
        let recalled = self
            .query_venues(&sql, libsql::params![query, (limit * SIMILAR_RECALL_FACTOR) as i64])
            .await?;

        let mut scored: Vec<(VenueRecord, f64)> = recalled
            .into_iter()
            .map(|venue| {
                let sim = trigram::similarity(&venue.slug, text);
                (venue, sim)
            })
            .filter(|(_, sim)| *sim > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.slug.cmp(&b.0.slug)));
        scored.truncate(limit);
        Ok(scored)
    }
}
