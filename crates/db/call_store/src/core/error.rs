use sqlx::error::ErrorKind;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
	#[error("call {0} already exists")]
	CallAlreadyExists(String),

	#[error("duplicate packet (call {call_id}, sequence {sequence})")]
	DuplicatePacket { call_id: String, sequence: i64 },

	#[error("an error occurred with the database")]
	Sqlx(#[from] sqlx::Error),
}

impl StoreError {
	pub fn is_call_already_exists(&self) -> bool {
		matches!(self, StoreError::CallAlreadyExists(_))
	}

	pub fn is_duplicate_packet(&self) -> bool {
		matches!(self, StoreError::DuplicatePacket { .. })
	}
}

pub(crate) trait ResultExt<T> {
	/// Map a uniqueness violation into a classified store error, passing
	/// everything else through unchanged.
	fn on_unique_violation(self, map_err: impl FnOnce() -> StoreError) -> Result<T, StoreError>;
}

impl<T> ResultExt<T> for Result<T, sqlx::Error> {
	fn on_unique_violation(self, map_err: impl FnOnce() -> StoreError) -> Result<T, StoreError> {
		self.map_err(|e| match &e {
			sqlx::Error::Database(dbe) if matches!(dbe.kind(), ErrorKind::UniqueViolation) => map_err(),
			_ => StoreError::Sqlx(e),
		})
	}
}
