use std::sync::Once;

/// Initialize the global tracing subscriber once (used by tests that run with `RUST_LOG`).
///
/// Logs go to stdout so they interleave with the test harness output.
pub fn init_tracing_from_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::from_default_env();

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stdout);
        let _ = subscriber.try_init();
    });
}
