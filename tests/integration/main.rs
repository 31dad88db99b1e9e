//! Library-level scenarios that drive the engine, predictor and advisor
//! directly.

mod negotiation_scenarios;
mod prediction_scenarios;
