use crate::state::{AiStatus, CallState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a call's AI result carried inside a state-change event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResultSummary {
	pub status: AiStatus,
	pub transcript: Option<String>,
	pub sentiment: Option<String>,
	pub retry_count: i64,
	pub error_message: Option<String>,
}

/// Published after every committed call state transition.
///
/// `timestamp` is the publish time, not the commit time; per-call events are
/// published in commit order by the single worker that owns the transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallUpdateEvent {
	pub call_id: String,
	pub state: CallState,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ai_result: Option<AiResultSummary>,
	pub timestamp: DateTime<Utc>,
}

impl CallUpdateEvent {
	pub fn new(call_id: impl Into<String>, state: CallState, ai_result: Option<AiResultSummary>) -> Self {
		Self {
			call_id: call_id.into(),
			state,
			ai_result,
			timestamp: Utc::now(),
		}
	}
}
