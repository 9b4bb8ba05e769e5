pub mod archive_call;
pub mod get_call;
pub mod reprocess_call;
pub mod submit_packet;

pub use archive_call::archive_call;
pub use get_call::get_call;
pub use reprocess_call::reprocess_call;
pub use submit_packet::submit_packet;
