use rand::Rng;
use std::time::Duration;

/// Escalating delay between transcription attempts: `2^k` seconds plus up to
/// one second of uniform jitter, all multiplied by `scale`.
///
/// `scale` exists for tests; production keeps 1.0, giving ~2, ~4, ~8, ~16,
/// ~32 seconds for attempts 1..=5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
	pub scale: f64,
}

impl Default for BackoffPolicy {
	fn default() -> Self {
		Self { scale: 1.0 }
	}
}

impl BackoffPolicy {
	pub fn delay(&self, attempt: u32) -> Duration {
		let jitter: f64 = rand::thread_rng().gen();
		Duration::from_secs_f64((2f64.powi(attempt as i32) + jitter) * self.scale)
	}
}
