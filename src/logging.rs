use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the global subscriber. `RUST_LOG` wins over the configured level;
/// calling this twice is a no-op.
pub fn init(settings: &LoggingSettings, verbose: bool) {
    let default_level = if verbose { "debug" } else { settings.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = if settings.format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
