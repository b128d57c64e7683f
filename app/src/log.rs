/// Installs the process-wide logger
///
/// Log level is Debug in development builds and Info in production builds.
/// `RUST_LOG` overrides both. Safe to call more than once; later calls are
/// no-ops.
pub fn init() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}
