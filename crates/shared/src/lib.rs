//! Shared utilities for the ride dispatch backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Great-circle geometry helpers
//! - Fare table and deterministic fare breakdown
//! - Common request validators

pub mod fare;
pub mod geo;
pub mod validation;
