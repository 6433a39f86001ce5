//! Channel-based WebSocket connection manager.
//!
//! Subscribers register an unbounded sender under one or more channels;
//! broadcasting walks the channel and prunes connections whose receiver is
//! gone. Delivery is best-effort: a channel with no subscribers is not an
//! error.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tracing::debug;

use domain::events::EventBus;

struct Subscriber {
    id: u64,
    tx: UnboundedSender<String>,
}

/// Channel-keyed registry of live WebSocket connections.
#[derive(Default)]
pub struct ConnectionManager {
    channels: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one connection under every channel in `channels`. Returns
    /// the subscription id and the message stream for the socket task.
    pub async fn subscribe(&self, channels: &[String]) -> (u64, UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut map = self.channels.write().await;
        for channel in channels {
            map.entry(channel.clone())
                .or_default()
                .push(Subscriber { id, tx: tx.clone() });
        }
        (id, rx)
    }

    /// Remove a connection from every channel it subscribed to.
    pub async fn unsubscribe_all(&self, id: u64) {
        let mut map = self.channels.write().await;
        map.retain(|_, subscribers| {
            subscribers.retain(|s| s.id != id);
            !subscribers.is_empty()
        });
    }

    /// Number of distinct live connections.
    pub async fn active_connections(&self) -> usize {
        let map = self.channels.read().await;
        let mut seen = std::collections::HashSet::new();
        for subscribers in map.values() {
            for s in subscribers {
                seen.insert(s.id);
            }
        }
        seen.len()
    }
}

#[async_trait]
impl EventBus for ConnectionManager {
    async fn broadcast(&self, channel: &str, message: Value) {
        let payload = message.to_string();

        let dead: Vec<u64> = {
            let map = self.channels.read().await;
            let Some(subscribers) = map.get(channel) else {
                return;
            };
            subscribers
                .iter()
                .filter(|s| s.tx.send(payload.clone()).is_err())
                .map(|s| s.id)
                .collect()
        };

        for id in dead {
            debug!(channel = %channel, subscriber = id, "Removing dead connection");
            self.unsubscribe_all(id).await;
        }
    }
}
