use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;
use crate::prediction::Durability;
use crate::utils::format_percent;

use super::predict::FeatureArgs;

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(subcommand)]
    pub command: TrainCommand,
}

#[derive(Subcommand, Debug)]
pub enum TrainCommand {
    /// Record an interview outcome
    Add(AddArgs),

    /// Fit the model now
    Fit,

    /// Append samples from a JSON export
    Import(PathArgs),

    /// Write all samples to a JSON file
    Export(PathArgs),

    /// Delete samples and model
    Reset,

    /// Prediction and training statistics
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Outcome {
    Offer,
    Rejected,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub features: FeatureArgs,

    /// Whether the interview ended with an offer
    #[arg(long, value_enum)]
    pub outcome: Outcome,

    /// Offered salary, if any
    #[arg(long)]
    pub actual_offer: Option<f64>,

    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    pub path: PathBuf,
}

pub fn run(ctx: &mut AppContext, args: &TrainArgs) -> Result<()> {
    match &args.command {
        TrainCommand::Add(args) => add(ctx, args),
        TrainCommand::Fit => fit(ctx),
        TrainCommand::Import(args) => import(ctx, args),
        TrainCommand::Export(args) => export(ctx, args),
        TrainCommand::Reset => reset(ctx),
        TrainCommand::Stats => stats(ctx),
    }
}

fn add(ctx: &mut AppContext, args: &AddArgs) -> Result<()> {
    let features = args.features.resolve()?;
    let durability = ctx.predictor.add_training_sample(
        features,
        args.outcome == Outcome::Offer,
        args.actual_offer,
        args.notes.clone(),
    );

    if ctx.robot_mode {
        let payload = serde_json::json!({
            "samples": ctx.predictor.sample_count(),
            "state": ctx.predictor.state(),
            "durability": durability,
        });
        return emit_robot(&robot_ok(payload).with_warnings(durability_warnings(&durability)));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Sample Added")
        .kv("Samples", &ctx.predictor.sample_count().to_string())
        .kv("Model", &ctx.predictor.state().to_string())
        .kv("Saved", &describe(&durability));
    emit_human(layout);
    Ok(())
}

fn fit(ctx: &mut AppContext) -> Result<()> {
    let report = ctx.predictor.train()?;

    if ctx.robot_mode {
        let warnings = durability_warnings(&report.model_durability);
        return emit_robot(&robot_ok(&report).with_warnings(warnings));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Model Trained")
        .kv("Samples", &report.samples.to_string())
        .kv("Train / test", &format!("{} / {}", report.train_size, report.test_size))
        .kv("Accuracy", &format_percent(report.accuracy))
        .kv("Saved", &describe(&report.model_durability));
    emit_human(layout);
    Ok(())
}

fn import(ctx: &mut AppContext, args: &PathArgs) -> Result<()> {
    let report = ctx.predictor.import_training_data(&args.path)?;

    if ctx.robot_mode {
        let warnings = durability_warnings(&report.durability);
        return emit_robot(&robot_ok(&report).with_warnings(warnings));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Samples Imported")
        .kv("Imported", &report.imported.to_string())
        .kv("Total", &report.total.to_string())
        .kv("Model", &report.state.to_string())
        .kv("Saved", &describe(&report.durability));
    emit_human(layout);
    Ok(())
}

fn export(ctx: &mut AppContext, args: &PathArgs) -> Result<()> {
    let count = ctx.predictor.export_training_data(&args.path)?;

    if ctx.robot_mode {
        let payload = serde_json::json!({
            "exported": count,
            "path": args.path.display().to_string(),
        });
        return emit_robot(&robot_ok(payload));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Samples Exported")
        .kv("Exported", &count.to_string())
        .kv("Path", &args.path.display().to_string());
    emit_human(layout);
    Ok(())
}

fn reset(ctx: &mut AppContext) -> Result<()> {
    ctx.predictor.reset()?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({ "reset": true })));
    }

    let mut layout = HumanLayout::new();
    layout.title("Predictor Reset").kv("Reset", "true");
    emit_human(layout);
    Ok(())
}

fn stats(ctx: &mut AppContext) -> Result<()> {
    let stats = ctx.predictor.stats();

    if ctx.robot_mode {
        return emit_robot(&robot_ok(&stats));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Predictor Stats")
        .kv("Model", &stats.state.to_string())
        .kv("Training samples", &stats.training_samples.to_string())
        .kv(
            "Accuracy",
            &stats
                .model_accuracy
                .map_or_else(|| "n/a".to_string(), format_percent),
        )
        .kv("Predictions", &stats.total_predictions.to_string());
    emit_human(layout);
    Ok(())
}

fn describe(durability: &Durability) -> String {
    match durability {
        Durability::Persisted => "yes".to_string(),
        Durability::InMemoryOnly { reason } => format!("no ({reason})"),
    }
}

fn durability_warnings(durability: &Durability) -> Vec<String> {
    match durability {
        Durability::Persisted => Vec::new(),
        Durability::InMemoryOnly { reason } => vec![format!("not persisted: {reason}")],
    }
}
