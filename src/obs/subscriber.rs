// crates.io
use tracing_subscriber::EnvFilter;
// self
use crate::config::{LogFormat, LoggingConfig};

/// Installs the global `tracing` subscriber for the binaries.
///
/// Logs go to stderr so command output on stdout stays machine-readable. `RUST_LOG` wins over
/// the configured level. A second call is ignored.
pub fn init_logging(config: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&config.level))
		.unwrap_or_else(|_| EnvFilter::new("info"));
	let builder = tracing_subscriber::fmt()
		.with_target(false)
		.with_writer(std::io::stderr)
		.with_env_filter(filter);
	let _ = match config.format {
		LogFormat::Compact => builder.compact().try_init(),
		LogFormat::Pretty => builder.pretty().try_init(),
		LogFormat::Json => builder.json().try_init(),
	};
}
