use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Filter comes from `RUST_LOG` (default
/// `info`); `KENNEL_LOG_FORMAT=json` switches to JSON lines. Safe to call
/// more than once.
pub fn init_logging() {
    LOGGING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let json = std::env::var("KENNEL_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
        let registry = tracing_subscriber::registry().with(filter);
        if json {
            let _ = registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init();
        } else {
            let _ = registry.with(tracing_subscriber::fmt::layer()).try_init();
        }
    });
}
