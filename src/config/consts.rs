/// Buffered chunk count a transform drops below before it signals drain
pub const DEFAULT_THRESHOLD_MIN: usize = 20;
/// Buffered chunk count at which a transform stops taking more
pub const DEFAULT_THRESHOLD_MAX: usize = 100;
/// Default `tracing` filter directive when neither config nor `RUST_LOG` sets one
pub const DEFAULT_LOG_FILTER: &str = "info";
/// Config file used by the demo binary when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "configs/runtime.yaml";
