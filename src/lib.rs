//! offerlab - salary negotiation simulation harness.
//!
//! Three loosely coupled pieces share one [`app::AppContext`]:
//! - [`negotiation`]: runs several negotiation strategies concurrently and
//!   ranks the simulated offers.
//! - [`prediction`]: estimates offer probability, rule-based until enough
//!   labeled outcomes exist to fit a tree ensemble.
//! - [`tactics`]: a UCB bandit that learns which negotiation tactic pays off.
//!
//! None of this is a validated statistical model. HR replies are simulated
//! and the classifier learns from whatever outcomes the user records.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod negotiation;
pub mod prediction;
pub mod tactics;
pub mod test_utils;
pub mod utils;

pub use error::{OfferError, Result};
