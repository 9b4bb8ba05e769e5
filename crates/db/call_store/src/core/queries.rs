use crate::core::model::{AiResult, Call, Packet};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

/// No-op write on the call row. The first statement of an ingestion or
/// worker transaction, so the writer lock is taken before any read the
/// transaction depends on. Returns false when the row does not exist.
pub async fn touch_call(tx: &mut Transaction<'_, Sqlite>, call_id: &str) -> Result<bool, sqlx::Error> {
	let result = sqlx::query("UPDATE calls SET updated_at = updated_at WHERE call_id = ?").bind(call_id).execute(&mut **tx).await?;
	Ok(result.rows_affected() > 0)
}

pub async fn fetch_call_tx(tx: &mut Transaction<'_, Sqlite>, call_id: &str) -> Result<Option<Call>, sqlx::Error> {
	sqlx::query_as::<_, Call>("SELECT call_id, state, last_sequence, created_at, updated_at FROM calls WHERE call_id = ?")
		.bind(call_id)
		.fetch_optional(&mut **tx)
		.await
}

pub async fn fetch_call(pool: &SqlitePool, call_id: &str) -> Result<Option<Call>, sqlx::Error> {
	sqlx::query_as::<_, Call>("SELECT call_id, state, last_sequence, created_at, updated_at FROM calls WHERE call_id = ?")
		.bind(call_id)
		.fetch_optional(pool)
		.await
}

pub async fn insert_call(pool: &SqlitePool, call_id: &str, state: &str, now: DateTime<Utc>) -> Result<Call, sqlx::Error> {
	sqlx::query_as::<_, Call>(
		r#"
        INSERT INTO calls (call_id, state, last_sequence, created_at, updated_at)
        VALUES (?, ?, -1, ?, ?)
        RETURNING call_id, state, last_sequence, created_at, updated_at
        "#,
	)
	.bind(call_id)
	.bind(state)
	.bind(now)
	.bind(now)
	.fetch_one(pool)
	.await
}

pub async fn insert_packet(tx: &mut Transaction<'_, Sqlite>, call_id: &str, sequence: i64, data: &str, timestamp: f64, received_at: DateTime<Utc>) -> Result<Packet, sqlx::Error> {
	sqlx::query_as::<_, Packet>(
		r#"
        INSERT INTO packets (call_id, sequence, data, timestamp, received_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, call_id, sequence, data, timestamp, received_at
        "#,
	)
	.bind(call_id)
	.bind(sequence)
	.bind(data)
	.bind(timestamp)
	.bind(received_at)
	.fetch_one(&mut **tx)
	.await
}

pub async fn packet_count(pool: &SqlitePool, call_id: &str) -> Result<i64, sqlx::Error> {
	sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM packets WHERE call_id = ?").bind(call_id).fetch_one(pool).await
}

pub async fn fetch_packets(pool: &SqlitePool, call_id: &str) -> Result<Vec<Packet>, sqlx::Error> {
	sqlx::query_as::<_, Packet>("SELECT id, call_id, sequence, data, timestamp, received_at FROM packets WHERE call_id = ? ORDER BY sequence ASC")
		.bind(call_id)
		.fetch_all(pool)
		.await
}

pub async fn fetch_ai_result(pool: &SqlitePool, call_id: &str) -> Result<Option<AiResult>, sqlx::Error> {
	sqlx::query_as::<_, AiResult>(
		"SELECT call_id, transcript, sentiment, status, retry_count, last_retry_at, completed_at, error_message FROM ai_results WHERE call_id = ?",
	)
	.bind(call_id)
	.fetch_optional(pool)
	.await
}

pub async fn calls_in_state(pool: &SqlitePool, state: &str) -> Result<Vec<Call>, sqlx::Error> {
	sqlx::query_as::<_, Call>("SELECT call_id, state, last_sequence, created_at, updated_at FROM calls WHERE state = ? ORDER BY call_id ASC")
		.bind(state)
		.fetch_all(pool)
		.await
}
