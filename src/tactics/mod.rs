//! UCB bandit over negotiation tactics, with a phrase library per tactic.

pub mod advisor;
pub mod bandit;
pub mod phrases;
pub mod rewards;

pub use advisor::{RecordReport, Suggestion, TacticAdvisor, TacticAnalytics, TacticResult};
pub use bandit::{ArmStats, MultiArmedBandit, Tactic};
pub use phrases::{Phase, PhaseFlags, Phrase, PhraseLibrary};
pub use rewards::{NegotiationOutcome, RewardModel};
