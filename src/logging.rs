use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ResolverConfig;

/// `RUST_LOG` plus the configured default directive. An unparseable
/// directive is reported and skipped rather than aborting startup.
pub fn env_filter(directive: &str) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match directive.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(e) => {
            eprintln!("Ignoring invalid log directive '{}': {}", directive, e);
            filter
        }
    }
}

/// Resolution decisions go to a daily-rolled JSON file under
/// `config.log_dir`; a human-readable copy goes to stderr, since stdout
/// carries the CLI's JSON results.
pub fn init_logging(config: &ResolverConfig) {
    if let Err(e) = fs::create_dir_all(&config.log_dir) {
        eprintln!("Could not create log directory {}: {}", config.log_dir, e);
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter(&config.log_directive))
        .with(fmt::layer().json().with_writer(non_blocking_writer))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    // Flushed on process exit
    std::mem::forget(guard);
}
