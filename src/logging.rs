use crate::config::Settings;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. Safe to call more than once.
pub fn init(settings: &Settings) {
    let filter = EnvFilter::try_new(&settings.log_filter)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let settings = Settings {
            log_filter: "not a [valid filter".to_string(),
            ..Settings::default()
        };
        init(&settings);
        init(&Settings::default());
    }
}
