//! Parallel multi-strategy negotiation.

pub mod agent;
pub mod aggregator;
pub mod context;
pub mod engine;
pub mod executor;
pub mod extractor;
pub mod responder;
pub mod strategy;

pub use agent::{AgentTurn, CommandAgent, NegotiationAgent, NullAgent, TemplateAgent, build_agent};
pub use aggregator::{OutcomeAggregator, QuantumResult};
pub use context::{NegotiationContext, StrategyContext};
pub use engine::{HistoryEntry, NegotiationEngine, StrategyStats};
pub use executor::{
    ExecutorSettings, NegotiationResult, ParallelExecutor, ProgressFn, RoundTargets, Speaker,
    Utterance, confidence_score,
};
pub use extractor::{OfferExtractor, RegexOfferExtractor};
pub use responder::{HrResponder, HrTurn, ScriptedHrResponder};
pub use strategy::{Personality, RiskLevel, Strategy, StrategyCatalog, Style};
