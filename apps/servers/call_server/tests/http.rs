use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use call_events::{CallState, Notifier};
use call_pipeline::{BackoffPolicy, IngestionCoordinator, Processor, ProcessorConfig, SimulatedTranscriptionClient};
use call_server::http::{api_router, ApiContext};
use call_server::Config;
use call_store::CallStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_context(ai_failure_rate: f64) -> (Router, ApiContext, TempDir) {
	let dir = tempfile::tempdir().unwrap();
	let url = format!("sqlite://{}?mode=rwc", dir.path().join("calls.db").display());
	let store = CallStore::connect(&url).await.unwrap();
	store.init_schema().await.unwrap();

	let config = Config {
		database_url: url,
		log_level: "info".into(),
		listen_addr: "127.0.0.1:0".into(),
		max_ai_retries: 2,
		ai_failure_rate,
		ai_latency_min_ms: 1,
		ai_latency_max_ms: 5,
	};

	let notifier = Arc::new(Notifier::new());
	let client = Arc::new(SimulatedTranscriptionClient::with_latency(config.ai_failure_rate, config.ai_latency()));
	let processor = Arc::new(Processor::new(
		store.clone(),
		client,
		notifier.clone(),
		ProcessorConfig {
			max_retries: config.max_ai_retries,
			backoff: BackoffPolicy { scale: 0.001 },
		},
	));
	let coordinator = Arc::new(IngestionCoordinator::new(store.clone(), processor.clone()));

	let context = ApiContext {
		config: Arc::new(config),
		store,
		coordinator,
		processor,
		notifier,
	};
	(api_router(context.clone()), context, dir)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
	Request::builder()
		.method(Method::POST)
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(body.to_string()))
		.unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
	Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
	let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

async fn wait_for_state(context: &ApiContext, call_id: &str, target: CallState) {
	let deadline = Instant::now() + Duration::from_secs(10);
	loop {
		if let Some(call) = context.store.get_call(call_id).await.unwrap() {
			if call.state == target {
				return;
			}
		}
		assert!(Instant::now() < deadline, "timed out waiting for {call_id} to reach {target}");
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
}

#[tokio::test]
async fn test_submit_and_status_round_trip() {
	let (router, context, _dir) = test_context(0.0).await;

	for sequence in 0..3 {
		let response = router
			.clone()
			.oneshot(post_json("/calls/c1/packets", json!({"sequence": sequence, "data": "chunk", "timestamp": 12.5})))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = body_json(response).await;
		assert_eq!(body["status"], "accepted");
		assert_eq!(body["call_id"], "c1");
		assert_eq!(body["sequence"], sequence);
		assert!(body.get("message").is_none());
	}

	wait_for_state(&context, "c1", CallState::Completed).await;

	let response = router.clone().oneshot(get_req("/calls/c1")).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_json(response).await;
	assert_eq!(body["call_id"], "c1");
	assert_eq!(body["state"], "COMPLETED");
	assert_eq!(body["last_sequence"], 2);
	assert_eq!(body["packet_count"], 3);
	assert_eq!(body["has_ai_result"], true);
	assert!(body["created_at"].is_string());
	assert!(body["updated_at"].is_string());
}

#[tokio::test]
async fn test_duplicate_submission_carries_a_note() {
	let (router, _context, _dir) = test_context(0.0).await;

	let first = router
		.clone()
		.oneshot(post_json("/calls/c2/packets", json!({"sequence": 0, "data": "x", "timestamp": 1.0})))
		.await
		.unwrap();
	assert_eq!(first.status(), StatusCode::OK);

	let second = router
		.clone()
		.oneshot(post_json("/calls/c2/packets", json!({"sequence": 0, "data": "y", "timestamp": 2.0})))
		.await
		.unwrap();
	assert_eq!(second.status(), StatusCode::OK);
	let body = body_json(second).await;
	assert_eq!(body["status"], "accepted");
	assert_eq!(body["message"], "duplicate packet ignored");
}

#[tokio::test]
async fn test_negative_sequence_rejected_without_side_effect() {
	let (router, context, _dir) = test_context(0.0).await;

	let response = router
		.clone()
		.oneshot(post_json("/calls/c3/packets", json!({"sequence": -1, "data": "x", "timestamp": 1.0})))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

	assert!(context.store.get_call("c3").await.unwrap().is_none(), "rejected submission must not create the call");
}

#[tokio::test]
async fn test_malformed_body_rejected_without_side_effect() {
	let (router, context, _dir) = test_context(0.0).await;

	let response = router
		.clone()
		.oneshot(post_json("/calls/c4/packets", json!({"data": "missing sequence and timestamp"})))
		.await
		.unwrap();
	assert!(response.status().is_client_error(), "got {}", response.status());
	assert!(context.store.get_call("c4").await.unwrap().is_none());
}

#[tokio::test]
async fn test_status_unknown_call_is_not_found() {
	let (router, _context, _dir) = test_context(0.0).await;
	let response = router.clone().oneshot(get_req("/calls/nobody")).await.unwrap();
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reprocess_unknown_call_is_not_found() {
	let (router, _context, _dir) = test_context(0.0).await;
	let response = router.clone().oneshot(post_json("/calls/nobody/reprocess", json!({}))).await.unwrap();
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reprocess_revives_failed_call() {
	let (router, context, _dir) = test_context(0.0).await;

	// Park a call in FAILED directly; the operator endpoint must bring it
	// back through the worker.
	context.store.create_call("c5", CallState::InProgress).await.unwrap();
	let mut tx = context.store.begin().await.unwrap();
	context.store.insert_packet(&mut tx, "c5", 0, "chunk", 0.0).await.unwrap();
	context.store.update_call(&mut tx, "c5", Some(CallState::Failed), Some(0)).await.unwrap();
	tx.commit().await.unwrap();

	let response = router.clone().oneshot(post_json("/calls/c5/reprocess", json!({}))).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_json(response).await;
	assert_eq!(body["status"], "scheduled");

	wait_for_state(&context, "c5", CallState::Completed).await;
}

#[tokio::test]
async fn test_archive_completed_call() {
	let (router, context, _dir) = test_context(0.0).await;

	router
		.clone()
		.oneshot(post_json("/calls/c6/packets", json!({"sequence": 0, "data": "chunk", "timestamp": 1.0})))
		.await
		.unwrap();
	wait_for_state(&context, "c6", CallState::Completed).await;

	let response = router.clone().oneshot(post_json("/calls/c6/archive", json!({}))).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_json(response).await;
	assert_eq!(body["state"], "ARCHIVED");

	// ARCHIVED is frozen; a second archive is a state conflict.
	let again = router.clone().oneshot(post_json("/calls/c6/archive", json!({}))).await.unwrap();
	assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_archive_active_call_is_a_conflict() {
	let (router, context, _dir) = test_context(0.0).await;
	context.store.create_call("c7", CallState::InProgress).await.unwrap();

	let response = router.clone().oneshot(post_json("/calls/c7/archive", json!({}))).await.unwrap();
	assert_eq!(response.status(), StatusCode::CONFLICT);
	assert_eq!(context.store.get_call("c7").await.unwrap().unwrap().state, CallState::InProgress);
}

#[tokio::test]
async fn test_ws_subscription_receives_call_updates() {
	use futures::{SinkExt, StreamExt};
	use tokio::time::timeout;

	let (_router, context, _dir) = test_context(0.0).await;
	let app = api_router(context.clone());
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});

	let (mut socket, _response) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.unwrap();
	socket
		.send(tokio_tungstenite::tungstenite::Message::text(json!({"action": "subscribe", "call_id": "w1"}).to_string()))
		.await
		.unwrap();

	// Give the server a beat to register the subscription before events fire.
	tokio::time::sleep(Duration::from_millis(100)).await;

	context
		.coordinator
		.submit(call_pipeline::PacketSubmission {
			call_id: "w1".into(),
			sequence: 0,
			data: "chunk".into(),
			timestamp: 0.0,
		})
		.await
		.unwrap();

	let mut states = Vec::new();
	while states.len() < 2 {
		let frame = timeout(Duration::from_secs(10), socket.next()).await.unwrap().unwrap().unwrap();
		if let Ok(text) = frame.to_text() {
			let value: Value = serde_json::from_str(text).unwrap();
			assert_eq!(value["type"], "call_update");
			assert_eq!(value["call_id"], "w1");
			states.push(value["state"].as_str().unwrap().to_string());
		}
	}
	assert_eq!(states, vec!["PROCESSING_AI", "COMPLETED"]);
}

mod ws_wire_format {
	use call_server::http::ws::{ClientMessage, ServerMessage};
	use call_events::{CallState, CallUpdateEvent};
	use serde_json::{json, Value};

	#[test]
	fn test_subscribe_message_shapes() {
		let scoped: ClientMessage = serde_json::from_value(json!({"action": "subscribe", "call_id": "c1"})).unwrap();
		assert!(matches!(scoped, ClientMessage::Subscribe { call_id: Some(ref id) } if id == "c1"));

		let global: ClientMessage = serde_json::from_value(json!({"action": "subscribe"})).unwrap();
		assert!(matches!(global, ClientMessage::Subscribe { call_id: None }));

		let unsubscribe: ClientMessage = serde_json::from_value(json!({"action": "unsubscribe"})).unwrap();
		assert!(matches!(unsubscribe, ClientMessage::Unsubscribe));

		assert!(serde_json::from_value::<ClientMessage>(json!({"action": "bogus"})).is_err());
	}

	#[test]
	fn test_call_update_wire_shape() {
		let message = ServerMessage::from(CallUpdateEvent::new("c1", CallState::ProcessingAi, None));
		let value: Value = serde_json::to_value(&message).unwrap();
		assert_eq!(value["type"], "call_update");
		assert_eq!(value["call_id"], "c1");
		assert_eq!(value["state"], "PROCESSING_AI");
		assert!(value["timestamp"].is_string());
		assert!(value.get("ai_result").is_none());
	}
}
