use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants;
use crate::error::{ResolverError, Result};

/// Tunables for the resolution engine. Every field has a default so a
/// partial `resolver.toml` (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub noise_floor: f64,
    pub suggestion_threshold: f64,
    pub redirect_threshold: f64,
    pub max_suggestions: usize,
    pub retrieval_limit: usize,
    pub similarity_limit: usize,
    pub similarity_floor: f64,
    pub cache_ttl_secs: u64,
    pub store_timeout_ms: u64,
    /// Directory for the daily-rolled JSON log
    pub log_dir: String,
    pub log_file: String,
    /// Default filter directive, applied on top of `RUST_LOG`
    pub log_directive: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            noise_floor: constants::NOISE_FLOOR,
            suggestion_threshold: constants::SUGGESTION_THRESHOLD,
            redirect_threshold: constants::REDIRECT_THRESHOLD,
            max_suggestions: constants::MAX_SUGGESTIONS,
            retrieval_limit: constants::RETRIEVAL_LIMIT,
            similarity_limit: constants::SIMILARITY_LIMIT,
            similarity_floor: constants::SIMILARITY_FLOOR,
            cache_ttl_secs: constants::CACHE_TTL_SECS,
            store_timeout_ms: constants::STORE_TIMEOUT_MS,
            log_dir: constants::LOG_DIR.to_string(),
            log_file: constants::LOG_FILE.to_string(),
            log_directive: constants::LOG_DIRECTIVE.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Load from a TOML file, then apply `VENUE_RESOLVER_*` overrides.
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ResolverError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            info!("Loaded resolver config from {}", path.display());
            Self::from_toml_str(&content)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        dotenv::dotenv().ok();
        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ResolverConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Overrides are looked up through `lookup` so tests don't have to touch
    /// the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
            raw.trim()
                .parse()
                .map_err(|_| ResolverError::Config(format!("Invalid value for {}: '{}'", key, raw)))
        }

        let var = |name: &str| {
            let key = format!("{}{}", constants::ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((k, v)) = var("NOISE_FLOOR") {
            self.noise_floor = parse(&k, &v)?;
        }
        if let Some((k, v)) = var("SUGGESTION_THRESHOLD") {
            self.suggestion_threshold = parse(&k, &v)?;
        }
        if let Some((k, v)) = var("REDIRECT_THRESHOLD") {
            self.redirect_threshold = parse(&k, &v)?;
        }
        if let Some((k, v)) = var("MAX_SUGGESTIONS") {
            self.max_suggestions = parse(&k, &v)?;
        }
        if let Some((k, v)) = var("RETRIEVAL_LIMIT") {
            self.retrieval_limit = parse(&k, &v)?;
        }
        if let Some((k, v)) = var("SIMILARITY_LIMIT") {
            self.similarity_limit = parse(&k, &v)?;
        }
        if let Some((k, v)) = var("SIMILARITY_FLOOR") {
            self.similarity_floor = parse(&k, &v)?;
        }
        if let Some((k, v)) = var("CACHE_TTL_SECS") {
            self.cache_ttl_secs = parse(&k, &v)?;
        }
        if let Some((k, v)) = var("STORE_TIMEOUT_MS") {
            self.store_timeout_ms = parse(&k, &v)?;
        }
        if let Some((_, v)) = var("LOG_DIR") {
            self.log_dir = v;
        }
        if let Some((_, v)) = var("LOG_FILE") {
            self.log_file = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("noise_floor", self.noise_floor),
            ("suggestion_threshold", self.suggestion_threshold),
            ("redirect_threshold", self.redirect_threshold),
            ("similarity_floor", self.similarity_floor),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ResolverError::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }

        if self.noise_floor > self.suggestion_threshold || self.suggestion_threshold > self.redirect_threshold {
            return Err(ResolverError::Config(format!(
                "thresholds must satisfy noise_floor <= suggestion_threshold <= redirect_threshold ({} / {} / {})",
                self.noise_floor, self.suggestion_threshold, self.redirect_threshold
            )));
        }

        let counts = [
            ("max_suggestions", self.max_suggestions),
            ("retrieval_limit", self.retrieval_limit),
            ("similarity_limit", self.similarity_limit),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(ResolverError::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.store_timeout_ms == 0 {
            return Err(ResolverError::Config("store_timeout_ms must be greater than zero".to_string()));
        }
        if self.log_dir.trim().is_empty() || self.log_file.trim().is_empty() {
            return Err(ResolverError::Config("log_dir and log_file must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
