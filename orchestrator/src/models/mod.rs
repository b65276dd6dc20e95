//! Domain models mirrored from the release platform

pub mod channel;
pub mod deployment;
pub mod environment;
pub mod lifecycle;
pub mod project;
pub mod release;
pub mod task;
