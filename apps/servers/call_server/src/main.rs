use anyhow::{Context, Result};
use call_events::Notifier;
use call_pipeline::{recover_interrupted_calls, BackoffPolicy, IngestionCoordinator, Processor, ProcessorConfig, SimulatedTranscriptionClient};
use call_server::config::Config;
use call_server::http::{self, ApiContext};
use call_store::CallStore;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
	// Load environment variables
	dotenvy::dotenv().ok();

	// Parse CLI arguments
	let config = Config::parse();
	config.validate().map_err(|e| anyhow::anyhow!(e))?;

	tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&config.log_level)).init();

	info!(
		database_url = %config.database_url,
		listen_addr = %config.listen_addr,
		max_ai_retries = config.max_ai_retries,
		ai_failure_rate = config.ai_failure_rate,
		"starting call server"
	);

	// Initialize SQLite connection pool and schema
	let store = CallStore::connect(&config.database_url).await.context("could not connect to database_url")?;
	store.init_schema().await.context("schema initialization failed")?;

	let notifier = Arc::new(Notifier::new());
	let client = Arc::new(SimulatedTranscriptionClient::with_latency(config.ai_failure_rate, config.ai_latency()));
	let processor = Arc::new(Processor::new(
		store.clone(),
		client,
		notifier.clone(),
		ProcessorConfig {
			max_retries: config.max_ai_retries,
			backoff: BackoffPolicy::default(),
		},
	));
	let coordinator = Arc::new(IngestionCoordinator::new(store.clone(), processor.clone()));

	// Requeue calls the previous process left mid-transcription.
	let recovered = recover_interrupted_calls(&store, &processor).await?;
	if recovered > 0 {
		info!(recovered, "requeued calls interrupted by the previous shutdown");
	}

	let context = ApiContext {
		config: Arc::new(config),
		store,
		coordinator,
		processor,
		notifier,
	};

	http::serve(context, wait_for_shutdown_signal()).await
}

async fn wait_for_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install SIGTERM handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	info!("shutdown signal received (SIGTERM/SIGINT)");
}
