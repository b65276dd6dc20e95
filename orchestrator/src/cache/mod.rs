//! In-memory caches

pub mod service;
pub mod ttl;
