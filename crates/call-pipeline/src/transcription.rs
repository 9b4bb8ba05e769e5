use async_trait::async_trait;
use call_store::Packet;
use rand::Rng;
use std::ops::Range;
use std::time::Duration;
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum TranscriptionError {
	/// Every provider failure is retryable up to the configured budget.
	#[error("transcription failed: {0}")]
	Transient(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
	pub transcript: String,
	pub sentiment: String,
}

/// The external transcription provider, reduced to the one contract the
/// pipeline consumes.
///
/// The processor guarantees at most one in-flight invocation per call;
/// concurrent invocations for distinct calls are expected.
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
	async fn transcribe(&self, call_id: &str, packets: &[Packet]) -> Result<Transcription, TranscriptionError>;
}

const SENTIMENTS: [&str; 3] = ["positive", "neutral", "negative"];

/// Fault-injecting stand-in for the external provider: sleeps within the
/// configured latency window, then fails with probability `failure_rate`.
pub struct SimulatedTranscriptionClient {
	failure_rate: f64,
	latency: Range<Duration>,
}

impl SimulatedTranscriptionClient {
	pub fn new(failure_rate: f64) -> Self {
		Self::with_latency(failure_rate, Duration::from_secs(1)..Duration::from_secs(3))
	}

	pub fn with_latency(failure_rate: f64, latency: Range<Duration>) -> Self {
		Self { failure_rate, latency }
	}
}

#[async_trait]
impl TranscriptionClient for SimulatedTranscriptionClient {
	async fn transcribe(&self, call_id: &str, packets: &[Packet]) -> Result<Transcription, TranscriptionError> {
		// Draw everything before the first await; the rng is not Send.
		let (delay, fails, sentiment) = {
			let mut rng = rand::thread_rng();
			let delay = if self.latency.is_empty() { self.latency.start } else { rng.gen_range(self.latency.clone()) };
			(delay, rng.gen::<f64>() < self.failure_rate, SENTIMENTS[rng.gen_range(0..SENTIMENTS.len())])
		};

		debug!(call_id, packets = packets.len(), delay_ms = delay.as_millis() as u64, "simulated transcription started");
		tokio::time::sleep(delay).await;

		if fails {
			return Err(TranscriptionError::Transient(format!("transcription service unavailable for call {call_id}")));
		}

		let text = packets.iter().map(|p| p.data.as_str()).collect::<Vec<_>>().join(" ");
		Ok(Transcription {
			transcript: format!("Transcript for call {call_id}: {text}"),
			sentiment: sentiment.to_string(),
		})
	}
}
