//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod bandit;
pub mod config;
pub mod negotiate;
pub mod predict;
pub mod strategies;
pub mod train;

use crate::app::AppContext;
use crate::error::Result;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one negotiation round against an HR message
    Negotiate(negotiate::NegotiateArgs),

    /// List the strategy catalog
    Strategies(strategies::StrategiesArgs),

    /// Estimate the probability of an offer
    Predict(predict::PredictArgs),

    /// Manage training samples and the model
    Train(train::TrainArgs),

    /// Tactic bandit and phrase library
    Bandit(bandit::BanditArgs),

    /// Show the effective configuration
    Config(config::ConfigArgs),
}

/// Dispatch a command to its handler
pub fn run(ctx: &mut AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Negotiate(args) => negotiate::run(ctx, args),
        Commands::Strategies(args) => strategies::run(ctx, args),
        Commands::Predict(args) => predict::run(ctx, args),
        Commands::Train(args) => train::run(ctx, args),
        Commands::Bandit(args) => bandit::run(ctx, args),
        Commands::Config(args) => config::run(ctx, args),
    }
}
