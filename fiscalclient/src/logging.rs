//! Initialisation du logging à partir de la configuration

use fiscalconfig::Config;
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

fn string_to_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" | "WARNING" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

/// Level filter for `logger.min_level`, `INFO` when unset or unknown
pub fn min_level_filter(config: &Config) -> LevelFilter {
    config
        .get_log_min_level()
        .ok()
        .and_then(|l| string_to_level(&l))
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::INFO)
}

/// Installs the global tracing subscriber
///
/// Returns `false` when a subscriber was already installed, in which case
/// nothing changes.
pub fn init_logging(config: &Config) -> bool {
    let filter = min_level_filter(config);
    let enable_console = config.get_log_enable_console().unwrap_or(true);

    let console = enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
    });

    Registry::default()
        .with(filter)
        .with(console)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(string_to_level("debug"), Some(Level::DEBUG));
        assert_eq!(string_to_level(" Warning "), Some(Level::WARN));
        assert_eq!(string_to_level("verbose"), None);
    }

    #[test]
    fn test_filter_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(min_level_filter(&config), LevelFilter::INFO);

        config.set_log_min_level("ERROR").unwrap();
        assert_eq!(min_level_filter(&config), LevelFilter::ERROR);
    }
}
