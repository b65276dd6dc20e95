//! Persistent storage

pub mod layout;
pub mod profile;
pub mod settings;
