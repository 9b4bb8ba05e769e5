use crate::core::error::{ResultExt, StoreError};
use crate::core::model::{AiResult, AiResultPatch, Call, CallSnapshot, Packet};
use crate::core::queries;
use crate::core::schema;
use call_events::{AiStatus, CallState};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;

/// Transactional persistence for calls, packets, and AI results.
///
/// Stateless beyond the pool it owns; callers open transactions with
/// [`CallStore::begin`] and commit them. Cross-call synchronization is the
/// database writer lock taken by [`CallStore::get_call_for_update`], never an
/// in-process mutex.
#[derive(Clone)]
pub struct CallStore {
	pool: SqlitePool,
}

impl CallStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Open a pool against `url` with the journal and timeout settings the
	/// coordinator and processor rely on: WAL keeps status reads unblocked
	/// during writes, and the busy timeout bounds writer-lock waits.
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let options = SqliteConnectOptions::from_str(url)?
			.create_if_missing(true)
			.journal_mode(SqliteJournalMode::Wal)
			.busy_timeout(Duration::from_secs(5))
			.foreign_keys(true);
		let pool = SqlitePoolOptions::new().max_connections(16).connect_with(options).await?;
		Ok(Self::new(pool))
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub async fn init_schema(&self) -> Result<(), StoreError> {
		schema::init_schema(&self.pool).await?;
		Ok(())
	}

	pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
		Ok(self.pool.begin().await?)
	}

	/// Read the call row under the writer lock, or signal absence.
	///
	/// Must be the first statement of the enclosing transaction: the no-op
	/// touch write forces lock acquisition up front, so concurrent
	/// ingestions for the call serialize here and each observes the
	/// previous committer's row. The lock is released at commit/rollback.
	pub async fn get_call_for_update(&self, tx: &mut Transaction<'_, Sqlite>, call_id: &str) -> Result<Option<Call>, StoreError> {
		if !queries::touch_call(tx, call_id).await? {
			return Ok(None);
		}
		Ok(queries::fetch_call_tx(tx, call_id).await?)
	}

	/// Insert a new call row, classifying the first-packet race.
	pub async fn create_call(&self, call_id: &str, initial_state: CallState) -> Result<Call, StoreError> {
		queries::insert_call(&self.pool, call_id, initial_state.as_str(), Utc::now())
			.await
			.on_unique_violation(|| StoreError::CallAlreadyExists(call_id.to_string()))
	}

	/// Insert a packet, classifying the `(call_id, sequence)` uniqueness
	/// violation so the coordinator can absorb duplicates.
	pub async fn insert_packet(&self, tx: &mut Transaction<'_, Sqlite>, call_id: &str, sequence: i64, data: &str, timestamp: f64) -> Result<Packet, StoreError> {
		queries::insert_packet(tx, call_id, sequence, data, timestamp, Utc::now())
			.await
			.on_unique_violation(|| StoreError::DuplicatePacket {
				call_id: call_id.to_string(),
				sequence,
			})
	}

	/// Atomic partial update of the call row; always refreshes `updated_at`.
	pub async fn update_call(&self, tx: &mut Transaction<'_, Sqlite>, call_id: &str, new_state: Option<CallState>, last_sequence: Option<i64>) -> Result<(), StoreError> {
		if let Some(state) = new_state {
			sqlx::query("UPDATE calls SET state = ? WHERE call_id = ?").bind(state.as_str()).bind(call_id).execute(&mut **tx).await?;
		}
		if let Some(sequence) = last_sequence {
			sqlx::query("UPDATE calls SET last_sequence = ? WHERE call_id = ?")
				.bind(sequence)
				.bind(call_id)
				.execute(&mut **tx)
				.await?;
		}
		sqlx::query("UPDATE calls SET updated_at = ? WHERE call_id = ?").bind(Utc::now()).bind(call_id).execute(&mut **tx).await?;
		Ok(())
	}

	/// Create-or-update the AI result row with explicit per-field branches.
	pub async fn upsert_ai_result(&self, tx: &mut Transaction<'_, Sqlite>, call_id: &str, patch: AiResultPatch) -> Result<(), StoreError> {
		let initial_status = patch.status.unwrap_or(AiStatus::Processing);
		sqlx::query("INSERT OR IGNORE INTO ai_results (call_id, status, retry_count) VALUES (?, ?, 0)")
			.bind(call_id)
			.bind(initial_status.as_str())
			.execute(&mut **tx)
			.await?;

		if let Some(status) = patch.status {
			sqlx::query("UPDATE ai_results SET status = ? WHERE call_id = ?").bind(status.as_str()).bind(call_id).execute(&mut **tx).await?;
		}
		if let Some(transcript) = patch.transcript.as_ref() {
			sqlx::query("UPDATE ai_results SET transcript = ? WHERE call_id = ?").bind(transcript).bind(call_id).execute(&mut **tx).await?;
		}
		if let Some(sentiment) = patch.sentiment.as_ref() {
			sqlx::query("UPDATE ai_results SET sentiment = ? WHERE call_id = ?").bind(sentiment).bind(call_id).execute(&mut **tx).await?;
		}
		if let Some(retry_count) = patch.retry_count {
			sqlx::query("UPDATE ai_results SET retry_count = ? WHERE call_id = ?").bind(retry_count).bind(call_id).execute(&mut **tx).await?;
		}
		if let Some(last_retry_at) = patch.last_retry_at {
			sqlx::query("UPDATE ai_results SET last_retry_at = ? WHERE call_id = ?").bind(last_retry_at).bind(call_id).execute(&mut **tx).await?;
		}
		if let Some(completed_at) = patch.completed_at {
			sqlx::query("UPDATE ai_results SET completed_at = ? WHERE call_id = ?").bind(completed_at).bind(call_id).execute(&mut **tx).await?;
		}
		if let Some(error_message) = patch.error_message.as_ref() {
			sqlx::query("UPDATE ai_results SET error_message = ? WHERE call_id = ?")
				.bind(error_message.as_deref())
				.bind(call_id)
				.execute(&mut **tx)
				.await?;
		}
		Ok(())
	}

	pub async fn get_call(&self, call_id: &str) -> Result<Option<Call>, StoreError> {
		Ok(queries::fetch_call(&self.pool, call_id).await?)
	}

	pub async fn get_ai_result(&self, call_id: &str) -> Result<Option<AiResult>, StoreError> {
		Ok(queries::fetch_ai_result(&self.pool, call_id).await?)
	}

	/// Read-only aggregate for status queries.
	pub async fn get_call_snapshot(&self, call_id: &str) -> Result<Option<CallSnapshot>, StoreError> {
		let Some(call) = queries::fetch_call(&self.pool, call_id).await? else {
			return Ok(None);
		};
		let packet_count = queries::packet_count(&self.pool, call_id).await?;
		let ai_result = queries::fetch_ai_result(&self.pool, call_id).await?;
		Ok(Some(CallSnapshot { call, packet_count, ai_result }))
	}

	/// All packets for a call, ordered by sequence. This is the aggregated
	/// view handed to the transcription client.
	pub async fn list_packets(&self, call_id: &str) -> Result<Vec<Packet>, StoreError> {
		Ok(queries::fetch_packets(&self.pool, call_id).await?)
	}

	pub async fn list_calls_in_state(&self, state: CallState) -> Result<Vec<Call>, StoreError> {
		Ok(queries::calls_in_state(&self.pool, state.as_str()).await?)
	}
}
