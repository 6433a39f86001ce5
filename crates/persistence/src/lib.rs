//! Persistence layer for the ride dispatch backend.
//!
//! This crate contains:
//! - Database and Redis connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - Redis-backed caches and coordination structures

pub mod cache;
pub mod db;
pub mod entities;
pub mod kv;
pub mod metrics;
pub mod repositories;
