/// Decision thresholds and scoring weights for venue resolution.
/// Runtime-tunable thresholds live in `ResolverConfig`; these are its defaults.

// Decision thresholds
pub const NOISE_FLOOR: f64 = 0.50;
pub const SUGGESTION_THRESHOLD: f64 = 0.70;
pub const REDIRECT_THRESHOLD: f64 = 0.90;
pub const MAX_SUGGESTIONS: usize = 5;

// Retrieval bounds
pub const RETRIEVAL_LIMIT: usize = 50;
pub const SIMILARITY_LIMIT: usize = 10;
pub const SIMILARITY_FLOOR: f64 = 0.50;

// Cache and store timing
pub const CACHE_TTL_SECS: u64 = 3600;
pub const STORE_TIMEOUT_MS: u64 = 2000;

// Normalization
pub const MIN_DISAMBIGUATION_DIGITS: usize = 7;
pub const EVENT_SEPARATOR: &str = "-at-";

// Graded signal weights (averaged over their total)
pub const WEIGHT_JARO_NORMALIZED: f64 = 0.20;
pub const WEIGHT_JARO_RAW: f64 = 0.05;
pub const WEIGHT_COMMON_PREFIX: f64 = 0.15;

// Bonus signal weights
pub const BONUS_EXACT: f64 = 0.40;
pub const BONUS_CONTAINMENT: f64 = 0.10;
pub const BONUS_STARTS_WITH: f64 = 0.25;

// Logging
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "resolver.log";
pub const LOG_DIRECTIVE: &str = "venue_resolver=info";

// Environment
pub const ENV_PREFIX: &str = "VENUE_RESOLVER_";
pub const ENV_METRICS_PORT: &str = "VENUE_RESOLVER_METRICS_PORT";
pub const DEFAULT_CONFIG_PATH: &str = "resolver.toml";
