use crate::http::serve::ApiContext;
use crate::http::Result;
use axum::extract::{Path, State};
use axum::Json;
use call_pipeline::PacketSubmission;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SubmitPacketRequest {
	pub sequence: i64,
	pub data: String,
	/// Caller-supplied wall clock, seconds.
	pub timestamp: f64,
}

#[derive(Debug, Serialize)]
pub struct SubmitPacketResponse {
	pub status: &'static str,
	pub call_id: String,
	pub sequence: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

pub async fn submit_packet(State(context): State<ApiContext>, Path(call_id): Path<String>, Json(request): Json<SubmitPacketRequest>) -> Result<Json<SubmitPacketResponse>> {
	let ack = context
		.coordinator
		.submit(PacketSubmission {
			call_id,
			sequence: request.sequence,
			data: request.data,
			timestamp: request.timestamp,
		})
		.await?;

	Ok(Json(SubmitPacketResponse {
		status: "accepted",
		call_id: ack.call_id,
		sequence: ack.sequence,
		message: ack.duplicate.then(|| "duplicate packet ignored".to_string()),
	}))
}
