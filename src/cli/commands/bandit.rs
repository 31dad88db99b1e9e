use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;
use crate::tactics::{NegotiationOutcome, PhaseFlags, Tactic};
use crate::utils::{format_amount, format_percent, truncate_string};

/// Characters of phrase text shown per row in the phrase listing.
const PHRASE_WIDTH: usize = 72;

#[derive(Args, Debug)]
pub struct BanditArgs {
    #[command(subcommand)]
    pub command: BanditCommand,
}

#[derive(Subcommand, Debug)]
pub enum BanditCommand {
    /// Pick a tactic and a phrase for the next message
    Select(SelectArgs),

    /// Record how a tactic worked out
    Record(RecordArgs),

    /// Show bandit arms and result analytics
    Stats,

    /// Reset bandit state and phrase statistics
    Reset,

    /// Best phrases for a tactic
    Phrases(PhrasesArgs),
}

#[derive(Args, Debug, Default)]
pub struct SelectArgs {
    #[arg(long)]
    pub opening: bool,
    #[arg(long)]
    pub exploring: bool,
    #[arg(long)]
    pub bargaining: bool,
    #[arg(long)]
    pub closing: bool,

    /// Situation keyword, e.g. counter_offer or leverage
    #[arg(long)]
    pub context: Option<String>,

    /// Salary to put into phrases that name one; defaults to the target
    #[arg(long)]
    pub salary: Option<f64>,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[arg(long)]
    pub tactic: Tactic,

    /// Phrase id or exact text that was used
    #[arg(long)]
    pub phrase: Option<String>,

    /// The negotiation succeeded
    #[arg(long)]
    pub success: bool,

    /// Salary reached
    #[arg(long)]
    pub salary: Option<f64>,

    #[arg(long, default_value = "")]
    pub feedback: String,
}

#[derive(Args, Debug)]
pub struct PhrasesArgs {
    #[arg(long)]
    pub tactic: Tactic,

    #[arg(long, default_value_t = 5)]
    pub limit: usize,
}

pub fn run(ctx: &mut AppContext, args: &BanditArgs) -> Result<()> {
    match &args.command {
        BanditCommand::Select(args) => select(ctx, args),
        BanditCommand::Record(args) => record(ctx, args),
        BanditCommand::Stats => stats(ctx),
        BanditCommand::Reset => reset(ctx),
        BanditCommand::Phrases(args) => phrases(ctx, args),
    }
}

fn select(ctx: &mut AppContext, args: &SelectArgs) -> Result<()> {
    let flags = PhaseFlags {
        opening: args.opening,
        exploring: args.exploring,
        bargaining: args.bargaining,
        closing: args.closing,
    };
    let salary = args.salary.or(Some(ctx.config.negotiation.target_salary));
    let suggestion = ctx.advisor.suggest(flags, args.context.as_deref(), salary);

    if ctx.robot_mode {
        return emit_robot(&robot_ok(&suggestion));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Tactic")
        .kv("Tactic", suggestion.tactic.as_str())
        .kv("Phase", suggestion.phase.as_str())
        .kv("Phrase", suggestion.phrase_id.as_deref().unwrap_or("-"))
        .blank()
        .push_line(suggestion.text);
    emit_human(layout);
    Ok(())
}

fn record(ctx: &mut AppContext, args: &RecordArgs) -> Result<()> {
    let outcome = NegotiationOutcome {
        success: args.success,
        salary: args.salary,
    };
    let report = ctx.advisor.record_result(
        args.tactic,
        args.phrase.as_deref(),
        outcome,
        args.feedback.clone(),
    );

    if ctx.robot_mode {
        return emit_robot(&robot_ok(&report));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Result Recorded")
        .kv("Tactic", args.tactic.as_str())
        .kv("Reward", &format!("{:.3}", report.reward))
        .kv("Phrase", report.phrase_id.as_deref().unwrap_or("-"))
        .kv(
            "Saved",
            if report.durability.is_persisted() {
                "yes"
            } else {
                "no"
            },
        );
    emit_human(layout);
    Ok(())
}

fn stats(ctx: &mut AppContext) -> Result<()> {
    let analytics = ctx.advisor.analytics();

    if ctx.robot_mode {
        let payload = serde_json::json!({
            "exploration_factor": ctx.advisor.bandit().exploration_factor,
            "total_pulls": ctx.advisor.bandit().total_pulls(),
            "analytics": analytics,
        });
        return emit_robot(&robot_ok(payload));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Bandit Stats")
        .kv(
            "Exploration",
            &format!("{:.3}", ctx.advisor.bandit().exploration_factor),
        )
        .kv("Results", &analytics.total.to_string())
        .kv("Success rate", &format_percent(analytics.success_rate))
        .kv(
            "Average salary",
            &analytics
                .avg_salary
                .map_or_else(|| "n/a".to_string(), |s| format!("${}", format_amount(s))),
        )
        .blank()
        .section("Arms");
    for arm in &analytics.bandit {
        layout.kv(
            arm.tactic.as_str(),
            &format!("{} pulls, avg reward {:.3}", arm.pulls, arm.avg_reward),
        );
    }
    if !analytics.per_tactic.is_empty() {
        layout.blank().section("Results by tactic");
        for (tactic, breakdown) in &analytics.per_tactic {
            layout.kv(
                tactic.as_str(),
                &format!(
                    "{} results, {} success",
                    breakdown.count,
                    format_percent(breakdown.success_rate)
                ),
            );
        }
    }
    emit_human(layout);
    Ok(())
}

fn reset(ctx: &mut AppContext) -> Result<()> {
    ctx.advisor.reset()?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({ "reset": true })));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Bandit Reset")
        .kv("Path", &ctx.root.display().to_string())
        .kv("Reset", "true");
    emit_human(layout);
    Ok(())
}

fn phrases(ctx: &mut AppContext, args: &PhrasesArgs) -> Result<()> {
    let phrases = ctx.advisor.best_phrases(args.tactic, args.limit);

    if ctx.robot_mode {
        return emit_robot(&robot_ok(&phrases));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Phrases: {}", args.tactic));
    for phrase in phrases {
        layout.kv(
            phrase.id,
            &format!(
                "[{}] {} ({} uses, {} success)",
                phrase.phase,
                truncate_string(phrase.text, PHRASE_WIDTH),
                phrase.usage_count,
                format_percent(phrase.success_rate)
            ),
        );
    }
    emit_human(layout);
    Ok(())
}
