pub mod core;

pub use core::error::StoreError;
pub use core::model::{AiResult, AiResultPatch, Call, CallSnapshot, Packet};
pub use core::repository::CallStore;
