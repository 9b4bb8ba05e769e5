pub mod error;
pub mod model;
pub mod queries;
pub mod repository;
pub mod schema;

// Re-export commonly used types
pub use error::StoreError;
pub use model::*;
pub use repository::CallStore;
