//! Storage layer for logshield
//!
//! This module provides the persistence layer using SQLite with:
//! - Schema migrations
//! - Bounded per-category event sets
//! - The durable pending-retry set
//! - Namespaced settings slots

pub mod repo;
pub mod schema;

pub use repo::{Store, PENDING_CAP};
