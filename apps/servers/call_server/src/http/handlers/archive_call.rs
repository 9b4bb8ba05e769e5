use crate::http::serve::ApiContext;
use crate::http::{Error, Result};
use axum::extract::{Path, State};
use axum::Json;
use call_events::{CallState, CallUpdateEvent};
use call_store::StoreError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ArchiveResponse {
	pub status: &'static str,
	pub call_id: String,
	pub state: CallState,
}

/// Freeze a settled call. Only the COMPLETED and FAILED edges lead into
/// ARCHIVED; anything else is a state conflict.
pub async fn archive_call(State(context): State<ApiContext>, Path(call_id): Path<String>) -> Result<Json<ArchiveResponse>> {
	let mut tx = context.store.begin().await?;
	let call = context.store.get_call_for_update(&mut tx, &call_id).await?.ok_or(Error::NotFound)?;
	let next = call.state.transition(CallState::Archived).map_err(Error::Conflict)?;
	context.store.update_call(&mut tx, &call_id, Some(next), None).await?;
	tx.commit().await.map_err(StoreError::from)?;

	// The transition is committed; the event snapshot read is best effort,
	// like the worker's publish path.
	let ai_result = match context.store.get_ai_result(&call_id).await {
		Ok(result) => result.map(|r| r.summary()),
		Err(e) => {
			tracing::warn!(call_id = %call_id, error = %e, "event snapshot read failed, publishing without ai_result");
			None
		}
	};
	context.notifier.publish(&CallUpdateEvent::new(call_id.clone(), next, ai_result));

	Ok(Json(ArchiveResponse {
		status: "archived",
		call_id,
		state: next,
	}))
}
