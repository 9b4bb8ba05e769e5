use crate::event::CallUpdateEvent;
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

pub type SubscriberId = Uuid;

/// Default outbound buffer per subscriber. Slow consumers that fall this far
/// behind are dropped rather than back-pressuring publishers.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

#[derive(Debug)]
struct Subscriber {
	tx: mpsc::Sender<CallUpdateEvent>,
	all_calls: bool,
	call_ids: HashSet<String>,
}

impl Subscriber {
	fn wants(&self, call_id: &str) -> bool {
		self.all_calls || self.call_ids.contains(call_id)
	}
}

/// Process-local fan-out of call state-change events.
///
/// Delivery is best effort: no persistence, no replay. A subscriber whose
/// buffer is full or whose receiver is gone is evicted on the next publish.
#[derive(Debug, Default)]
pub struct Notifier {
	subscribers: DashMap<SubscriberId, Subscriber>,
}

impl Notifier {
	pub fn new() -> Self {
		Self { subscribers: DashMap::new() }
	}

	/// Register a new subscriber handle with a bounded outbound buffer.
	///
	/// The handle starts with no interests; follow up with [`Notifier::subscribe`].
	pub fn register(&self, buffer: usize) -> (SubscriberId, mpsc::Receiver<CallUpdateEvent>) {
		let (tx, rx) = mpsc::channel(buffer.max(1));
		let id = Uuid::new_v4();
		self.subscribers.insert(
			id,
			Subscriber {
				tx,
				all_calls: false,
				call_ids: HashSet::new(),
			},
		);
		debug!(subscriber = %id, "subscriber registered");
		(id, rx)
	}

	/// Add an interest for a subscriber: a specific call, or all calls when
	/// `call_id` is `None`. Returns false if the handle is unknown.
	pub fn subscribe(&self, id: SubscriberId, call_id: Option<&str>) -> bool {
		match self.subscribers.get_mut(&id) {
			Some(mut sub) => {
				match call_id {
					Some(call_id) => {
						sub.call_ids.insert(call_id.to_string());
					}
					None => sub.all_calls = true,
				}
				true
			}
			None => false,
		}
	}

	/// Remove a subscriber handle and all of its interests.
	pub fn unsubscribe(&self, id: SubscriberId) -> bool {
		let removed = self.subscribers.remove(&id).is_some();
		if removed {
			debug!(subscriber = %id, "subscriber removed");
		}
		removed
	}

	/// Deliver an event to every matching subscriber. Returns the number of
	/// subscribers the event was handed to.
	pub fn publish(&self, event: &CallUpdateEvent) -> usize {
		let mut delivered = 0;
		self.subscribers.retain(|id, sub| {
			if !sub.wants(&event.call_id) {
				return true;
			}
			match sub.tx.try_send(event.clone()) {
				Ok(()) => {
					delivered += 1;
					true
				}
				Err(mpsc::error::TrySendError::Full(_)) => {
					warn!(subscriber = %id, call_id = %event.call_id, "subscriber buffer full, dropping subscriber");
					false
				}
				Err(mpsc::error::TrySendError::Closed(_)) => {
					debug!(subscriber = %id, "subscriber receiver gone, dropping subscriber");
					false
				}
			}
		});
		delivered
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.len()
	}
}
