use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use call_events::StateError;
use call_pipeline::IngestError;
use call_store::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("call not found")]
	NotFound,

	#[error("{0}")]
	UnprocessableEntity(String),

	#[error("call state conflict: {0}")]
	Conflict(StateError),

	#[error("packet ingestion failed")]
	Ingest(#[source] IngestError),

	#[error("an error occurred with the database")]
	Store(#[from] StoreError),
}

impl From<IngestError> for Error {
	fn from(e: IngestError) -> Self {
		match e {
			IngestError::NegativeSequence(sequence) => Self::UnprocessableEntity(format!("sequence must be non-negative (got {sequence})")),
			other => Self::Ingest(other),
		}
	}
}

impl Error {
	const fn status_code(&self) -> StatusCode {
		match self {
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
			Self::Conflict(_) => StatusCode::CONFLICT,
			Self::Ingest(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Ingest(ref e) => {
				tracing::error!(error = ?e, "ingestion error");
			}

			Self::Store(ref e) => {
				tracing::error!(error = ?e, "store error");
			}

			// Other errors get mapped normally.
			_ => (),
		}

		(self.status_code(), self.to_string()).into_response()
	}
}
