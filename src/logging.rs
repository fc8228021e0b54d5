/// Environment variable holding the log filter used by the `inspect` binary.
pub const LOG_ENV: &str = "ONNX_INSPECT_LOG";

macro_rules! trace {
	($($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		tracing::trace!($($arg)+);
	}}
}
macro_rules! debug {
	($($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		tracing::debug!($($arg)+);
	}}
}
macro_rules! info {
	($($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		tracing::info!($($arg)+);
	}}
}
macro_rules! warning {
	($($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		tracing::warn!($($arg)+);
	}}
}
pub(crate) use debug;
pub(crate) use info;
pub(crate) use trace;
pub(crate) use warning;

/// Returns the log filter directive for the binary, read from [`LOG_ENV`]. Defaults to `warn`.
pub fn default_log_filter() -> String {
	match std::env::var(LOG_ENV) {
		Ok(s) if !s.trim().is_empty() => s,
		_ => String::from("warn")
	}
}

/// Installs a `tracing` subscriber writing to standard error, filtered by [`default_log_filter`].
///
/// Does nothing if a global subscriber is already set.
#[cfg(feature = "tracing")]
pub fn init() {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_new(default_log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.try_init();
}

#[cfg(not(feature = "tracing"))]
pub fn init() {}
