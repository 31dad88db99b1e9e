use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::{OfferError, Result};
use crate::prediction::{PredictionFeatures, PredictionResult};
use crate::utils::{format_amount, format_percent, read_json_optional};

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub features: FeatureArgs,

    /// Skip the similar-case lookup
    #[arg(long)]
    pub no_similar: bool,
}

/// Interview snapshot given on the command line. Flags override values read
/// from `--from`; anything left unset uses the neutral defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct FeatureArgs {
    /// JSON file with a features object
    #[arg(long, value_name = "PATH")]
    pub from: Option<PathBuf>,
    #[arg(long)]
    pub company_size: Option<String>,
    #[arg(long)]
    pub industry: Option<String>,
    #[arg(long)]
    pub role_level: Option<String>,
    #[arg(long)]
    pub interview_round: Option<u32>,
    /// Preparation hours
    #[arg(long)]
    pub time_spent: Option<f64>,
    #[arg(long)]
    pub questions_asked: Option<u32>,
    #[arg(long)]
    pub technical_score: Option<f64>,
    #[arg(long)]
    pub communication_score: Option<f64>,
    #[arg(long)]
    pub cultural_fit: Option<f64>,
    #[arg(long)]
    pub salary_expectation: Option<f64>,
    #[arg(long)]
    pub market_rate: Option<f64>,
    /// Years of experience
    #[arg(long)]
    pub experience: Option<u32>,
    #[arg(long)]
    pub similar_offers: Option<u32>,
}

impl FeatureArgs {
    pub fn resolve(&self) -> Result<PredictionFeatures> {
        let mut features = match &self.from {
            Some(path) => read_json_optional::<PredictionFeatures>(path)?.ok_or_else(|| {
                OfferError::NotFound(format!("{} does not exist", path.display()))
            })?,
            None => PredictionFeatures::default(),
        };

        macro_rules! set {
            ($($field:ident <- $arg:expr),* $(,)?) => {
                $(if let Some(value) = $arg.clone() {
                    features.$field = value;
                })*
            };
        }
        set!(
            company_size <- self.company_size,
            industry <- self.industry,
            role_level <- self.role_level,
            interview_round <- self.interview_round,
            time_spent <- self.time_spent,
            questions_asked <- self.questions_asked,
            technical_score <- self.technical_score,
            communication_score <- self.communication_score,
            cultural_fit <- self.cultural_fit,
            salary_expectation <- self.salary_expectation,
            market_rate <- self.market_rate,
            candidate_experience <- self.experience,
            similar_offers_count <- self.similar_offers,
        );

        for (name, score) in [
            ("technical_score", features.technical_score),
            ("communication_score", features.communication_score),
            ("cultural_fit", features.cultural_fit),
        ] {
            if !(0.0..=1.0).contains(&score) {
                return Err(OfferError::ValidationFailed(format!(
                    "{name} must be between 0 and 1, got {score}"
                )));
            }
        }
        Ok(features)
    }
}

pub fn run(ctx: &mut AppContext, args: &PredictArgs) -> Result<()> {
    let features = args.features.resolve()?;
    let result = ctx.predictor.predict(&features, !args.no_similar);

    if ctx.robot_mode {
        let payload = serde_json::json!({
            "prediction": result,
            "state": ctx.predictor.state(),
            "training_samples": ctx.predictor.sample_count(),
        });
        return emit_robot(&robot_ok(payload));
    }

    emit_human(prediction_layout(&result));
    Ok(())
}

fn prediction_layout(result: &PredictionResult) -> HumanLayout {
    let (low, high) = result.confidence_interval;
    let mut layout = HumanLayout::new();
    layout
        .title("Offer Prediction")
        .kv("Probability", &format_percent(result.probability))
        .kv(
            "Interval",
            &format!("{} - {}", format_percent(low), format_percent(high)),
        )
        .kv("Source", &format!("{:?}", result.source).to_lowercase())
        .blank()
        .section("Key factors");
    for factor in &result.key_factors {
        layout.bullet(factor);
    }
    layout.blank().section("Recommendations");
    for advice in &result.recommendations {
        layout.bullet(advice);
    }
    if !result.similar_cases.is_empty() {
        layout.blank().section("Similar cases");
        for case in &result.similar_cases {
            let offer = case
                .actual_offer
                .map_or_else(String::new, |o| format!(" at ${}", format_amount(o)));
            layout.bullet(&format!(
                "{}{offer} (similarity {}/4) {}",
                if case.outcome { "offer" } else { "no offer" },
                case.similarity_score,
                case.notes
            ));
        }
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::UnitTestFixture;

    #[test]
    fn flags_override_file() {
        let fixture = UnitTestFixture::new();
        let path = fixture.create_file(
            "features.json",
            r#"{"role_level": "junior", "technical_score": 0.4, "industry": "tech"}"#,
        );
        let args = FeatureArgs {
            from: Some(path),
            role_level: Some("senior".to_string()),
            experience: Some(6),
            ..FeatureArgs::default()
        };

        let features = args.resolve().unwrap();
        assert_eq!(features.role_level, "senior");
        assert_eq!(features.industry, "tech");
        assert_eq!(features.candidate_experience, 6);
        assert!((features.technical_score - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_scores_outside_unit_range() {
        let args = FeatureArgs {
            cultural_fit: Some(1.5),
            ..FeatureArgs::default()
        };
        assert!(matches!(args.resolve(), Err(OfferError::ValidationFailed(_))));
    }
}
