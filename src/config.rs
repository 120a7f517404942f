use std::env;

use tracing::warn;

/// Longest accepted input line, in bytes, terminator included.
pub const MAX_LINE: usize = 1024;
pub const DEFAULT_LOG_FILTER: &str = "warn";
pub const DEFAULT_HOSTNAME: &str = "localhost";

const MAX_LINE_KEY: &str = "PSH_MAX_LINE";
const LOG_KEY: &str = "PSH_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub max_line: usize,
	pub log_filter: String,
	pub hostname_fallback: String,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			max_line: MAX_LINE,
			log_filter: DEFAULT_LOG_FILTER.to_string(),
			hostname_fallback: DEFAULT_HOSTNAME.to_string(),
		}
	}
}

impl Config {
	pub fn from_env() -> Config {
		Config::from_lookup(|key| env::var(key).ok())
	}

	fn from_lookup<F>(get: F) -> Config where F: Fn(&str) -> Option<String> {
		let mut config = Config::default();
		if let Some(v) = get(MAX_LINE_KEY) {
			match v.trim().parse::<usize>() {
				Ok(n) if n > 0 => config.max_line = n,
				_ => warn!(value = %v, "ignoring invalid {}", MAX_LINE_KEY),
			}
		}
		if let Some(v) = get(LOG_KEY) {
			config.log_filter = v;
		}
		config
	}
}
