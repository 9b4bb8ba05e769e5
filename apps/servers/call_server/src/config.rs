use clap::Parser;
use std::ops::Range;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "call_server")]
#[command(about = "Call packet ingestion and transcription service", long_about = None)]
pub struct Config {
	/// SQLite connection string for the backing store
	#[arg(long, env = "DATABASE_URL", default_value = "sqlite://calls.db?mode=rwc")]
	pub database_url: String,

	/// Diagnostic verbosity (tracing env-filter syntax)
	#[arg(long, env = "LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	/// Address to serve HTTP and WebSocket traffic on
	#[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:8000")]
	pub listen_addr: String,

	/// Transcription retries after the first attempt before a call is marked FAILED
	#[arg(long, env = "MAX_AI_RETRIES", default_value = "5")]
	pub max_ai_retries: u32,

	/// Failure probability of the simulated transcription provider (0.0 - 1.0)
	#[arg(long, env = "AI_FAILURE_RATE", default_value = "0.25")]
	pub ai_failure_rate: f64,

	/// Lower bound of simulated transcription latency in milliseconds
	#[arg(long, env = "AI_LATENCY_MIN_MS", default_value = "1000")]
	pub ai_latency_min_ms: u64,

	/// Upper bound of simulated transcription latency in milliseconds
	#[arg(long, env = "AI_LATENCY_MAX_MS", default_value = "3000")]
	pub ai_latency_max_ms: u64,
}

impl Config {
	/// Validate configuration values
	pub fn validate(&self) -> Result<(), String> {
		if self.database_url.is_empty() {
			return Err("DATABASE_URL must be set".to_string());
		}

		if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
			return Err(format!("LISTEN_ADDR must be a host:port address (got {})", self.listen_addr));
		}

		if !(0.0..=1.0).contains(&self.ai_failure_rate) {
			return Err(format!("AI_FAILURE_RATE must be between 0.0 and 1.0 (got {})", self.ai_failure_rate));
		}

		if self.ai_latency_min_ms > self.ai_latency_max_ms {
			return Err(format!(
				"AI_LATENCY_MIN_MS must not exceed AI_LATENCY_MAX_MS (got {} > {})",
				self.ai_latency_min_ms, self.ai_latency_max_ms
			));
		}

		Ok(())
	}

	pub fn ai_latency(&self) -> Range<Duration> {
		Duration::from_millis(self.ai_latency_min_ms)..Duration::from_millis(self.ai_latency_max_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base_config() -> Config {
		Config {
			database_url: "sqlite://calls.db?mode=rwc".into(),
			log_level: "info".into(),
			listen_addr: "127.0.0.1:8000".into(),
			max_ai_retries: 5,
			ai_failure_rate: 0.25,
			ai_latency_min_ms: 1000,
			ai_latency_max_ms: 3000,
		}
	}

	#[test]
	fn test_defaults_validate() {
		assert!(base_config().validate().is_ok());
	}

	#[test]
	fn test_failure_rate_bounds() {
		let mut config = base_config();
		config.ai_failure_rate = 1.5;
		assert!(config.validate().is_err());
		config.ai_failure_rate = -0.1;
		assert!(config.validate().is_err());
		config.ai_failure_rate = 1.0;
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_latency_window_ordering() {
		let mut config = base_config();
		config.ai_latency_min_ms = 5000;
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_listen_addr_must_parse() {
		let mut config = base_config();
		config.listen_addr = "not-an-address".into();
		assert!(config.validate().is_err());
	}
}
