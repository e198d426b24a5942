use env_logger::Env;

/// `RUST_LOG` wins; otherwise `info` for this crate and `warn` elsewhere.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn,pinchctl=info"))
        .format_timestamp_millis()
        .init();
}
