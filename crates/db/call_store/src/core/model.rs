use call_events::{AiResultSummary, AiStatus, CallState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Call {
	pub call_id: String,
	#[sqlx(try_from = "String")]
	pub state: CallState,
	/// Highest sequence number observed for this call, -1 before the first
	/// packet commits. Monotonic non-decreasing.
	pub last_sequence: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Packet {
	pub id: i64,
	pub call_id: String,
	pub sequence: i64,
	pub data: String,
	/// Caller-supplied wall clock, seconds.
	pub timestamp: f64,
	pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AiResult {
	pub call_id: String,
	pub transcript: Option<String>,
	pub sentiment: Option<String>,
	#[sqlx(try_from = "String")]
	pub status: AiStatus,
	pub retry_count: i64,
	pub last_retry_at: Option<DateTime<Utc>>,
	pub completed_at: Option<DateTime<Utc>>,
	pub error_message: Option<String>,
}

impl AiResult {
	pub fn summary(&self) -> AiResultSummary {
		AiResultSummary {
			status: self.status,
			transcript: self.transcript.clone(),
			sentiment: self.sentiment.clone(),
			retry_count: self.retry_count,
			error_message: self.error_message.clone(),
		}
	}
}

/// Partial update for the AI result row; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct AiResultPatch {
	pub transcript: Option<String>,
	pub sentiment: Option<String>,
	pub status: Option<AiStatus>,
	pub retry_count: Option<i64>,
	pub last_retry_at: Option<DateTime<Utc>>,
	pub completed_at: Option<DateTime<Utc>>,
	/// Outer `None` leaves the column untouched; `Some(None)` clears it to
	/// NULL, so a success after a failed cycle does not keep the stale
	/// failure message.
	pub error_message: Option<Option<String>>,
}

/// Read-only aggregate for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct CallSnapshot {
	pub call: Call,
	pub packet_count: i64,
	pub ai_result: Option<AiResult>,
}

impl CallSnapshot {
	pub fn has_ai_result(&self) -> bool {
		self.ai_result.is_some()
	}
}
