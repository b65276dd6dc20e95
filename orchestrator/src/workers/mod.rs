//! Background workers

pub mod task_poller;
