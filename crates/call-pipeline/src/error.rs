use call_events::StateError;
use call_store::StoreError;

/// Failures that abort a processing worker. The worker logs and exits; call
/// state is left as the last committed transition.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	State(#[from] StateError),

	#[error("call {0} missing during processing")]
	MissingCall(String),
}

/// Failures surfaced to the packet submitter.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
	#[error("sequence must be non-negative (got {0})")]
	NegativeSequence(i64),

	#[error("packet ingestion failed")]
	Ingestion(#[from] StoreError),
}
