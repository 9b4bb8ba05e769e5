pub mod backoff;
pub mod error;
pub mod ingest;
pub mod processor;
pub mod recovery;
pub mod transcription;

pub use backoff::BackoffPolicy;
pub use error::{IngestError, PipelineError};
pub use ingest::{IngestAck, IngestionCoordinator, PacketSubmission};
pub use processor::{ProcessOutcome, Processor, ProcessorConfig};
pub use recovery::recover_interrupted_calls;
pub use transcription::{SimulatedTranscriptionClient, Transcription, TranscriptionClient, TranscriptionError};
