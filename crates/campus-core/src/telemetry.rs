//! Tracing initialisation for campus binaries.
//!
//! Filtering is read from `CAMPUS_LOG`, then `RUST_LOG`. Without either, the
//! campus crates log at the requested level and everything else (SurrealDB,
//! the websocket stack) only at `warn`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "CAMPUS_LOG";

const CAMPUS_TARGETS: &[&str] = &["campus_core", "campus_state", "campusd"];

/// Default directives: `level` for the campus crates, `warn` elsewhere.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        CAMPUS_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str().to_lowercase())),
    );
    directives.join(",")
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber. Only the first call in a process takes effect.
///
/// JSON output keeps the event target so workflow lines can be told apart
/// from storage lines; the human format drops it.
pub fn init_tracing(json: bool, level: Level) {
    let filter = env_filter(level);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
