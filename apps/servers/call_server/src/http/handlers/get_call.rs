use crate::http::serve::ApiContext;
use crate::http::{Error, Result};
use axum::extract::{Path, State};
use axum::Json;
use call_events::CallState;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CallStatusResponse {
	pub call_id: String,
	pub state: CallState,
	pub last_sequence: i64,
	pub packet_count: i64,
	pub has_ai_result: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

pub async fn get_call(State(context): State<ApiContext>, Path(call_id): Path<String>) -> Result<Json<CallStatusResponse>> {
	let snapshot = context.store.get_call_snapshot(&call_id).await?.ok_or(Error::NotFound)?;

	Ok(Json(CallStatusResponse {
		call_id: snapshot.call.call_id.clone(),
		state: snapshot.call.state,
		last_sequence: snapshot.call.last_sequence,
		packet_count: snapshot.packet_count,
		has_ai_result: snapshot.has_ai_result(),
		created_at: snapshot.call.created_at,
		updated_at: snapshot.call.updated_at,
	}))
}
