//! Deployment orchestration engine

pub mod cancel;
pub mod cleanup;
pub mod lifecycle;
pub mod orchestrator;
pub mod reporter;
pub mod resolver;
pub mod version;
