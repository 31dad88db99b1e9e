mod negotiation_tests;
mod scoring_tests;
