//! Rollout Library
//!
//! Deployment orchestration against a release-management platform: lifecycle
//! validation, channel and package resolution, task submission and polling,
//! and channel garbage collection.

pub mod app;
pub mod cache;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;
pub mod workers;
