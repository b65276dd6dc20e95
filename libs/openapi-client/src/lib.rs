//! Wire models for the release platform REST API
//!
//! Request and response envelopes exchanged with the remote service. Domain
//! types live in the `rollout` crate; these only describe the JSON payloads.

pub mod models;

pub use models::*;
