use crate::http::handlers::{archive_call, get_call, reprocess_call, submit_packet};
use crate::http::serve::ApiContext;
use axum::routing::{get, post};
use axum::Router;

pub fn routes() -> Router<ApiContext> {
	Router::new()
		.route("/calls/:call_id/packets", post(submit_packet))
		.route("/calls/:call_id", get(get_call))
		.route("/calls/:call_id/reprocess", post(reprocess_call))
		.route("/calls/:call_id/archive", post(archive_call))
}
