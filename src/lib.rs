pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod resolver;
pub mod storage;
pub mod types;

pub use config::ResolverConfig;
pub use error::{ResolverError, Result};
pub use resolver::{RedirectChain, VenueResolver};
pub use storage::{InMemoryVenueStore, VenueStore};
pub use types::{Candidate, MatchResult, VenueRecord};
