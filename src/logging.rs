use tracing_subscriber::EnvFilter;

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // Human-readable output while developing, JSON lines in release builds.
    if cfg!(debug_assertions) {
        let _ = builder.try_init();
    } else {
        let _ = builder.json().try_init();
    }
}
