//! Domain layer for the ride dispatch backend.
//!
//! This crate contains:
//! - Domain models and lifecycle state machines (ride, offer, trip)
//! - The dispatch error taxonomy
//! - The event-bus abstraction the core publishes through

pub mod error;
pub mod events;
pub mod models;
