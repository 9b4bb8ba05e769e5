use crate::error::IngestError;
use crate::processor::Processor;
use call_events::CallState;
use call_store::{CallStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PacketSubmission {
	pub call_id: String,
	pub sequence: i64,
	pub data: String,
	/// Caller-supplied wall clock, seconds.
	pub timestamp: f64,
}

/// Acknowledgment of a durably accepted packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestAck {
	pub call_id: String,
	pub sequence: i64,
	/// True when the packet was already persisted and this submission was
	/// silently absorbed.
	pub duplicate: bool,
}

/// Per-packet entry point: persists the packet under the call's row lock and
/// fires the processor without awaiting it, so acknowledgment latency stays
/// decoupled from transcription work.
pub struct IngestionCoordinator {
	store: CallStore,
	processor: Arc<Processor>,
}

impl IngestionCoordinator {
	pub fn new(store: CallStore, processor: Arc<Processor>) -> Self {
		Self { store, processor }
	}

	pub async fn submit(&self, submission: PacketSubmission) -> Result<IngestAck, IngestError> {
		let PacketSubmission {
			call_id,
			sequence,
			data,
			timestamp,
		} = submission;

		if sequence < 0 {
			return Err(IngestError::NegativeSequence(sequence));
		}

		loop {
			let mut tx = self.store.begin().await?;
			let Some(call) = self.store.get_call_for_update(&mut tx, &call_id).await? else {
				// No row to lock yet. Create it outside the lock and restart;
				// exactly one of the racing first-packet submissions wins the
				// insert and every loser re-enters through the locked read.
				tx.commit().await.map_err(StoreError::from)?;
				match self.store.create_call(&call_id, CallState::InProgress).await {
					Ok(_) => debug!(call_id = %call_id, "call created"),
					Err(e) if e.is_call_already_exists() => debug!(call_id = %call_id, "lost first-packet race, retrying"),
					Err(e) => return Err(IngestError::Ingestion(e)),
				}
				continue;
			};

			match self.store.insert_packet(&mut tx, &call_id, sequence, &data, timestamp).await {
				Err(e) if e.is_duplicate_packet() => {
					tx.commit().await.map_err(StoreError::from)?;
					info!(call_id = %call_id, sequence, "duplicate packet absorbed");
					return Ok(IngestAck {
						call_id,
						sequence,
						duplicate: true,
					});
				}
				Err(e) => return Err(IngestError::Ingestion(e)),
				Ok(_) => {
					let expected = call.last_sequence + 1;
					if sequence > expected {
						warn!(call_id = %call_id, sequence, expected, "sequence gap");
					} else if sequence < expected {
						warn!(call_id = %call_id, sequence, expected, "sequence reorder");
					}
					self.store.update_call(&mut tx, &call_id, None, Some(call.last_sequence.max(sequence))).await?;
					tx.commit().await.map_err(StoreError::from)?;

					// Durable past this point; the worker races only itself.
					self.processor.clone().spawn(call_id.clone());
					return Ok(IngestAck {
						call_id,
						sequence,
						duplicate: false,
					});
				}
			}
		}
	}
}
