use crate::backoff::BackoffPolicy;
use crate::error::PipelineError;
use crate::transcription::{Transcription, TranscriptionClient, TranscriptionError};
use call_events::{AiStatus, CallState, CallUpdateEvent, Notifier};
use call_store::{AiResultPatch, CallStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
	/// Retries after the first attempt; attempt `max_retries + 1` is final.
	pub max_retries: u32,
	pub backoff: BackoffPolicy,
}

impl Default for ProcessorConfig {
	fn default() -> Self {
		Self {
			max_retries: 5,
			backoff: BackoffPolicy::default(),
		}
	}
}

/// What a worker run did, observable for tests and operator logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
	/// Another worker or a prior transition already owns the call.
	AlreadyOwned,
	Completed,
	Failed,
}

/// Per-call asynchronous worker.
///
/// Many triggers for the same call may race; the claim step serializes them
/// on the call's row lock and all but one exit immediately. The winner holds
/// no lock while the transcription client or a backoff sleep is in flight.
pub struct Processor {
	store: CallStore,
	client: Arc<dyn TranscriptionClient>,
	notifier: Arc<Notifier>,
	config: ProcessorConfig,
}

impl Processor {
	pub fn new(store: CallStore, client: Arc<dyn TranscriptionClient>, notifier: Arc<Notifier>, config: ProcessorConfig) -> Self {
		Self { store, client, notifier, config }
	}

	/// Fire a detached worker for `call_id`. Never awaited by callers; a
	/// worker that aborts on a persistence error leaves the call in
	/// `PROCESSING_AI`, to be revived by the next trigger after restart.
	pub fn spawn(self: Arc<Self>, call_id: String) {
		tokio::spawn(async move {
			if let Err(e) = self.process(&call_id).await {
				error!(call_id = %call_id, error = %e, "call processing worker aborted");
			}
		});
	}

	pub async fn process(&self, call_id: &str) -> Result<ProcessOutcome, PipelineError> {
		if !self.claim(call_id).await? {
			return Ok(ProcessOutcome::AlreadyOwned);
		}

		let packets = self.store.list_packets(call_id).await?;
		debug!(call_id, packets = packets.len(), "transcription attempts starting");

		for attempt in 1..=self.config.max_retries + 1 {
			match self.client.transcribe(call_id, &packets).await {
				Ok(transcription) => {
					self.complete(call_id, attempt, transcription).await?;
					info!(call_id, attempt, "call transcription completed");
					return Ok(ProcessOutcome::Completed);
				}
				Err(TranscriptionError::Transient(message)) if attempt <= self.config.max_retries => {
					let delay = self.config.backoff.delay(attempt);
					warn!(call_id, attempt, delay_ms = delay.as_millis() as u64, error = %message, "transcription attempt failed, backing off");
					self.record_retry(call_id, attempt, &message).await?;
					tokio::time::sleep(delay).await;
				}
				Err(TranscriptionError::Transient(message)) => {
					self.fail(call_id, attempt, &message).await?;
					error!(call_id, attempt, error = %message, "transcription retries exhausted");
					return Ok(ProcessOutcome::Failed);
				}
			}
		}

		unreachable!()
	}

	/// Idempotence guard: under the row lock, claim the call by moving it to
	/// `PROCESSING_AI`. Returns false when another worker or a prior
	/// transition already owns the outcome.
	async fn claim(&self, call_id: &str) -> Result<bool, PipelineError> {
		let mut tx = self.store.begin().await?;
		let Some(call) = self.store.get_call_for_update(&mut tx, call_id).await? else {
			tx.rollback().await.map_err(call_store::StoreError::from)?;
			debug!(call_id, "worker triggered for unknown call");
			return Ok(false);
		};

		match call.state {
			CallState::ProcessingAi | CallState::Completed | CallState::Archived => {
				tx.rollback().await.map_err(call_store::StoreError::from)?;
				debug!(call_id, state = %call.state, "call already owned, worker exiting");
				Ok(false)
			}
			state => {
				let next = state.transition(CallState::ProcessingAi)?;
				self.store.update_call(&mut tx, call_id, Some(next), None).await?;
				self
					.store
					.upsert_ai_result(
						&mut tx,
						call_id,
						AiResultPatch {
							status: Some(AiStatus::Processing),
							..Default::default()
						},
					)
					.await?;
				tx.commit().await.map_err(call_store::StoreError::from)?;
				self.publish(call_id, next).await;
				Ok(true)
			}
		}
	}

	async fn complete(&self, call_id: &str, attempt: u32, transcription: Transcription) -> Result<(), PipelineError> {
		let mut tx = self.store.begin().await?;
		let Some(call) = self.store.get_call_for_update(&mut tx, call_id).await? else {
			return Err(PipelineError::MissingCall(call_id.to_string()));
		};
		let next = call.state.transition(CallState::Completed)?;
		self.store.update_call(&mut tx, call_id, Some(next), None).await?;
		self
			.store
			.upsert_ai_result(
				&mut tx,
				call_id,
				AiResultPatch {
					status: Some(AiStatus::Completed),
					transcript: Some(transcription.transcript),
					sentiment: Some(transcription.sentiment),
					retry_count: Some(i64::from(attempt)),
					completed_at: Some(Utc::now()),
					// Drop the message left by any earlier failed cycle.
					error_message: Some(None),
					..Default::default()
				},
			)
			.await?;
		tx.commit().await.map_err(call_store::StoreError::from)?;
		self.publish(call_id, next).await;
		Ok(())
	}

	/// Retry bookkeeping between attempts; the call stays in `PROCESSING_AI`
	/// so no event is published.
	async fn record_retry(&self, call_id: &str, attempt: u32, message: &str) -> Result<(), PipelineError> {
		let mut tx = self.store.begin().await?;
		self
			.store
			.upsert_ai_result(
				&mut tx,
				call_id,
				AiResultPatch {
					retry_count: Some(i64::from(attempt)),
					last_retry_at: Some(Utc::now()),
					error_message: Some(Some(message.to_string())),
					..Default::default()
				},
			)
			.await?;
		tx.commit().await.map_err(call_store::StoreError::from)?;
		Ok(())
	}

	async fn fail(&self, call_id: &str, attempt: u32, message: &str) -> Result<(), PipelineError> {
		let mut tx = self.store.begin().await?;
		let Some(call) = self.store.get_call_for_update(&mut tx, call_id).await? else {
			return Err(PipelineError::MissingCall(call_id.to_string()));
		};
		let next = call.state.transition(CallState::Failed)?;
		self.store.update_call(&mut tx, call_id, Some(next), None).await?;
		self
			.store
			.upsert_ai_result(
				&mut tx,
				call_id,
				AiResultPatch {
					status: Some(AiStatus::Failed),
					retry_count: Some(i64::from(attempt)),
					last_retry_at: Some(Utc::now()),
					error_message: Some(Some(message.to_string())),
					..Default::default()
				},
			)
			.await?;
		tx.commit().await.map_err(call_store::StoreError::from)?;
		self.publish(call_id, next).await;
		Ok(())
	}

	/// Best-effort event publication after a committed transition. Delivery
	/// failures are the notifier's to log, never the worker's to propagate.
	async fn publish(&self, call_id: &str, state: CallState) {
		let ai_result = match self.store.get_ai_result(call_id).await {
			Ok(result) => result.map(|r| r.summary()),
			Err(e) => {
				warn!(call_id, error = %e, "event snapshot read failed, publishing without ai_result");
				None
			}
		};
		let delivered = self.notifier.publish(&CallUpdateEvent::new(call_id, state, ai_result));
		debug!(call_id, state = %state, delivered, "call update published");
	}
}
