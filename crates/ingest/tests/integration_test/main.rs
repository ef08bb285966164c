//! Integration tests for adx-ingest.
//!
//! Every collaborator is mocked, so no cluster or credentials are needed.
//! Timing tests run on a paused tokio clock.

mod mocks;
mod orchestrator;
mod provision;
