//! E2E test suite entry point.

mod bandit_workflow;
#[path = "../common/mod.rs"]
mod common;
mod negotiation_workflow;
mod training_workflow;
