use crate::config::Config;
use crate::http::{routes, ws};
use axum::Router;
use call_events::Notifier;
use call_pipeline::{IngestionCoordinator, Processor};
use call_store::CallStore;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct ApiContext {
	pub config: Arc<Config>,
	pub store: CallStore,
	pub coordinator: Arc<IngestionCoordinator>,
	pub processor: Arc<Processor>,
	pub notifier: Arc<Notifier>,
}

pub fn api_router(context: ApiContext) -> Router {
	Router::new()
		.merge(routes::calls::routes())
		.merge(ws::routes())
		// Enables logging. Use `RUST_LOG=tower_http=debug`
		.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
		.with_state(context)
}

pub async fn serve(context: ApiContext, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
	let listen_addr = context.config.listen_addr.clone();
	let app = api_router(context);

	let listener = TcpListener::bind(&listen_addr).await?;
	tracing::info!("listening on {}", listener.local_addr()?);
	axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
	Ok(())
}
