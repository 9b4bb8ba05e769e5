use crate::processor::Processor;
use call_events::{AiStatus, CallState};
use call_store::{AiResultPatch, CallStore, StoreError};
use std::sync::Arc;
use tracing::warn;

/// Startup sweep for calls orphaned in `PROCESSING_AI` by a crash.
///
/// In a single-process deployment a `PROCESSING_AI` row at boot has no live
/// worker, so it is demoted through the legal failure edge and handed back
/// to the processor, which re-enters via `FAILED -> PROCESSING_AI`. Returns
/// the number of calls requeued.
pub async fn recover_interrupted_calls(store: &CallStore, processor: &Arc<Processor>) -> Result<usize, StoreError> {
	let stuck = store.list_calls_in_state(CallState::ProcessingAi).await?;
	let mut recovered = 0;

	for call in stuck {
		let mut tx = store.begin().await?;
		let Some(current) = store.get_call_for_update(&mut tx, &call.call_id).await? else {
			continue;
		};
		if current.state != CallState::ProcessingAi {
			tx.rollback().await?;
			continue;
		}

		warn!(call_id = %call.call_id, "recovering call interrupted mid-processing");
		store.update_call(&mut tx, &call.call_id, Some(CallState::Failed), None).await?;
		store
			.upsert_ai_result(
				&mut tx,
				&call.call_id,
				AiResultPatch {
					status: Some(AiStatus::Failed),
					error_message: Some(Some("processing interrupted by restart".to_string())),
					..Default::default()
				},
			)
			.await?;
		tx.commit().await?;

		processor.clone().spawn(call.call_id);
		recovered += 1;
	}

	Ok(recovered)
}
