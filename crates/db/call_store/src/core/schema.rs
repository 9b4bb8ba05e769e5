use sqlx::SqlitePool;

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
	sqlx::query(
		r#"
        CREATE TABLE IF NOT EXISTS calls (
            call_id TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            last_sequence INTEGER NOT NULL DEFAULT -1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
        CREATE TABLE IF NOT EXISTS packets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT NOT NULL REFERENCES calls(call_id),
            sequence INTEGER NOT NULL,
            data TEXT NOT NULL,
            timestamp REAL NOT NULL,
            received_at TEXT NOT NULL,
            UNIQUE(call_id, sequence)
        )
        "#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
        CREATE TABLE IF NOT EXISTS ai_results (
            call_id TEXT PRIMARY KEY REFERENCES calls(call_id),
            transcript TEXT,
            sentiment TEXT,
            status TEXT NOT NULL,
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_retry_at TEXT,
            completed_at TEXT,
            error_message TEXT
        )
        "#,
	)
	.execute(pool)
	.await?;

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_packets_call_id ON packets(call_id)").execute(pool).await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_calls_state ON calls(state)").execute(pool).await?;

	Ok(())
}
