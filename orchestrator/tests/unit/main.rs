//! Unit tests for the rollout orchestrator

mod support;

mod test_cache;
mod test_cleanup;
mod test_http;
mod test_lifecycle;
