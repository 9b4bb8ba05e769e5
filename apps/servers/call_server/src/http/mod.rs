mod error;
mod handlers;
mod routes;
mod serve;
pub mod ws;

pub use error::Error;
pub use serve::{api_router, serve, ApiContext};

pub type Result<T, E = Error> = std::result::Result<T, E>;
