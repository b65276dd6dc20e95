//! Release platform REST client

pub mod channels;
pub mod client;
pub mod environments;
pub mod lifecycles;
pub mod packages;
pub mod projects;
pub mod releases;
pub mod service;
pub mod tasks;
