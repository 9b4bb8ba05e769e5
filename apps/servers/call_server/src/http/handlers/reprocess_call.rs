use crate::http::serve::ApiContext;
use crate::http::{Error, Result};
use axum::extract::{Path, State};
use axum::Json;
use call_events::CallState;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ReprocessResponse {
	pub status: &'static str,
	pub call_id: String,
	pub state: CallState,
}

/// Operator nudge: fire a worker for the call. The worker's own ownership
/// check makes this safe at any time; a call that is already owned or
/// settled is left untouched.
pub async fn reprocess_call(State(context): State<ApiContext>, Path(call_id): Path<String>) -> Result<Json<ReprocessResponse>> {
	let call = context.store.get_call(&call_id).await?.ok_or(Error::NotFound)?;
	context.processor.clone().spawn(call_id.clone());

	Ok(Json(ReprocessResponse {
		status: "scheduled",
		call_id,
		state: call.state,
	}))
}
