use crate::http::serve::ApiContext;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use call_events::notifier::DEFAULT_SUBSCRIBER_BUFFER;
use call_events::{AiResultSummary, CallState, CallUpdateEvent};
use chrono::{DateTime, Utc};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
	/// Register interest in one call, or in all calls when `call_id` is
	/// omitted.
	Subscribe { call_id: Option<String> },
	/// Tear down the subscription; the server stops pushing updates.
	Unsubscribe,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
	CallUpdate {
		call_id: String,
		state: CallState,
		timestamp: DateTime<Utc>,
		#[serde(skip_serializing_if = "Option::is_none")]
		ai_result: Option<AiResultSummary>,
	},
}

impl From<CallUpdateEvent> for ServerMessage {
	fn from(event: CallUpdateEvent) -> Self {
		Self::CallUpdate {
			call_id: event.call_id,
			state: event.state,
			timestamp: event.timestamp,
			ai_result: event.ai_result,
		}
	}
}

pub fn routes() -> Router<ApiContext> {
	Router::new().route("/ws", get(websocket_handler))
}

async fn websocket_handler(ws: WebSocketUpgrade, State(context): State<ApiContext>) -> impl IntoResponse {
	ws.on_upgrade(move |socket| handle_socket(socket, context))
}

// Orchestrates the subscription channel lifecycle: one forward task pushing
// notifier events out, one loop consuming subscribe/unsubscribe commands.
async fn handle_socket(socket: WebSocket, context: ApiContext) {
	let (mut sender, mut receiver) = socket.split();
	let (subscriber_id, mut events) = context.notifier.register(DEFAULT_SUBSCRIBER_BUFFER);
	debug!(subscriber = %subscriber_id, "websocket connected");

	let forward_task = tokio::spawn(async move {
		while let Some(event) = events.recv().await {
			let message = ServerMessage::from(event);
			let Ok(text) = serde_json::to_string(&message) else {
				continue;
			};
			if sender.send(Message::Text(text)).await.is_err() {
				break;
			}
		}
	});

	while let Some(Ok(message)) = receiver.next().await {
		match message {
			Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
				Ok(ClientMessage::Subscribe { call_id }) => {
					context.notifier.subscribe(subscriber_id, call_id.as_deref());
					debug!(subscriber = %subscriber_id, call_id = call_id.as_deref().unwrap_or("*"), "subscription added");
				}
				Ok(ClientMessage::Unsubscribe) => {
					context.notifier.unsubscribe(subscriber_id);
					debug!(subscriber = %subscriber_id, "subscription removed");
				}
				Err(e) => {
					warn!(subscriber = %subscriber_id, error = %e, "unparseable subscription message ignored");
				}
			},
			Message::Close(_) => break,
			// Pings are answered by the websocket layer.
			_ => {}
		}
	}

	context.notifier.unsubscribe(subscriber_id);
	forward_task.abort();
	debug!(subscriber = %subscriber_id, "websocket disconnected");
}
