use carlot_core::config::LoggingConfig;

/// Installs the global subscriber. Logs always go to stderr so stdout stays
/// reserved for the conversation and command output. A second call is a
/// no-op.
pub fn init(config: &LoggingConfig) {
    use carlot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    let _ = match config.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}
