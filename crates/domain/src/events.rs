//! Event publication abstraction.
//!
//! The core publishes lifecycle events by channel name (`ride:{id}`,
//! `driver:{id}`, `dashboard`); delivery is best-effort and no core
//! invariant depends on it. Every ride/driver event is mirrored to the
//! dashboard channel.

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

/// Channel receiving a copy of every published event.
pub const DASHBOARD_CHANNEL: &str = "dashboard";

/// Lifecycle event types published by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    RideRequested,
    RideOffered,
    RideMatched,
    RideStarted,
    RideCompleted,
    RideCancelled,
    RideNoDrivers,
    DriverLocationUpdate,
    DriverStatusChanged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RideRequested => "ride:requested",
            EventKind::RideOffered => "ride:offered",
            EventKind::RideMatched => "ride:matched",
            EventKind::RideStarted => "ride:started",
            EventKind::RideCompleted => "ride:completed",
            EventKind::RideCancelled => "ride:cancelled",
            EventKind::RideNoDrivers => "ride:no_drivers",
            EventKind::DriverLocationUpdate => "driver:location_update",
            EventKind::DriverStatusChanged => "driver:status_changed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel name for a single ride's events.
pub fn ride_channel(ride_id: Uuid) -> String {
    format!("ride:{ride_id}")
}

/// Channel name for a single driver's events.
pub fn driver_channel(driver_id: Uuid) -> String {
    format!("driver:{driver_id}")
}

/// Sink the core publishes events into.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Deliver a JSON message to every subscriber of `channel`.
    /// Implementations must tolerate missing subscribers.
    async fn broadcast(&self, channel: &str, message: Value);
}

fn envelope(kind: EventKind, id_field: &str, id: Uuid, data: Value) -> Value {
    let mut msg = json!({ "type": kind.as_str(), id_field: id.to_string() });
    if let (Some(target), Some(extra)) = (msg.as_object_mut(), data.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    msg
}

/// Publish a ride lifecycle event, mirrored to the dashboard channel.
pub async fn notify_ride_event(bus: &dyn EventBus, ride_id: Uuid, kind: EventKind, data: Value) {
    let msg = envelope(kind, "ride_id", ride_id, data);
    bus.broadcast(&ride_channel(ride_id), msg.clone()).await;
    bus.broadcast(DASHBOARD_CHANNEL, msg).await;
}

/// Publish a driver lifecycle event, mirrored to the dashboard channel.
pub async fn notify_driver_event(bus: &dyn EventBus, driver_id: Uuid, kind: EventKind, data: Value) {
    let msg = envelope(kind, "driver_id", driver_id, data);
    bus.broadcast(&driver_channel(driver_id), msg.clone()).await;
    bus.broadcast(DASHBOARD_CHANNEL, msg).await;
}

/// Event bus that drops everything. Used in tests and as a fallback sink.
#[derive(Debug, Default, Clone)]
pub struct NoopEventBus;

#[async_trait]
impl EventBus for NoopEventBus {
    async fn broadcast(&self, _channel: &str, _message: Value) {}
}
