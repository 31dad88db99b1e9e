use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, progress_bar, robot_ok};
use crate::error::{OfferError, Result};
use crate::negotiation::{NegotiationContext, ProgressFn, QuantumResult};
use crate::utils::{format_amount, format_duration, format_percent};

#[derive(Args, Debug)]
pub struct NegotiateArgs {
    /// The HR message to answer
    pub message: String,

    /// Context entry as key=value (current_offer, target, market_rate,
    /// company, benefits); repeatable
    #[arg(long = "context", short = 'c', value_name = "KEY=VALUE")]
    pub context: Vec<String>,

    /// Write a JSON report of the last round to this path
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Run this many rounds and show per-strategy totals
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub repeat: u32,

    /// Include every transcript in the output
    #[arg(long)]
    pub transcript: bool,
}

pub fn run(ctx: &mut AppContext, args: &NegotiateArgs) -> Result<()> {
    let context = NegotiationContext::from_pairs(&args.context)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| OfferError::Agent(format!("failed to start async runtime: {err}")))?;

    let pb = progress_bar(ctx.robot_mode);
    let on_progress = |fraction: f64, status: &str| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        pb.set_position((fraction * 100.0).round() as u64);
        pb.set_message(status.to_string());
    };
    let progress: ProgressFn<'_> = &on_progress;

    let cancel = CancellationToken::new();
    let engine = &mut ctx.engine;
    let rounds: Vec<QuantumResult> = runtime.block_on(async {
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted; cancelling negotiation");
                watcher.cancel();
            }
        });

        let mut rounds = Vec::new();
        for _ in 0..args.repeat {
            pb.reset();
            let result = engine
                .negotiate_with_cancel(&args.message, &context, Some(progress), &cancel)
                .await;
            rounds.push(result);
            if cancel.is_cancelled() {
                break;
            }
        }
        rounds
    });
    pb.finish_and_clear();

    let Some(last) = rounds.last() else {
        return Err(OfferError::Cancelled("no negotiation round completed".to_string()));
    };
    if let Some(path) = &args.export {
        ctx.engine.export_results(last, path)?;
    }

    let stats = ctx.engine.strategy_stats();
    if ctx.robot_mode {
        let payload = serde_json::json!({
            "agent": ctx.engine.agent_name(),
            "rounds": rounds.len(),
            "cancelled": cancel.is_cancelled(),
            "best_strategy": last.best_result().strategy.name,
            "final_offer": last.best_offer(),
            "expected_gain": last.expected_gain(),
            "confidence": last.confidence(),
            "recommendation": last.recommendation(),
            "fallback": last.is_fallback(),
            "total_time_secs": last.total_time().as_secs_f64(),
            "results": last.all_results(),
            "strategy_stats": stats,
            "exported_to": args.export.as_ref().map(|p| p.display().to_string()),
        });
        return emit_robot(&robot_ok(payload));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Negotiation")
        .kv("Agent", ctx.engine.agent_name())
        .kv("Best strategy", &last.best_result().strategy.name)
        .kv("Final offer", &format!("${}", format_amount(last.best_offer())))
        .kv("Expected gain", &format!("${}", format_amount(last.expected_gain())))
        .kv("Confidence", &format_percent(last.confidence()))
        .kv("Total time", &format_duration(last.total_time().as_secs_f64()));
    if cancel.is_cancelled() {
        layout.kv("Cancelled", "true");
    }
    layout
        .blank()
        .section("Recommendation")
        .push_line(last.recommendation())
        .blank()
        .section("Strategies");
    for result in last.all_results() {
        layout.bullet(&format!(
            "{} ({}): ${}, confidence {}",
            result.strategy.name,
            result.strategy.style,
            format_amount(result.final_offer),
            format_percent(result.confidence_score)
        ));
        if args.transcript {
            for line in &result.response_chain {
                layout.push_line(format!("    {}: {}", line.speaker, line.text));
            }
        }
    }

    if rounds.len() > 1 {
        layout.blank().section("Totals");
        for (name, stat) in &stats {
            layout.kv(
                name,
                &format!(
                    "{} wins / {} runs, avg ${}",
                    stat.wins,
                    stat.runs,
                    format_amount(stat.avg_offer)
                ),
            );
        }
    }
    if let Some(path) = &args.export {
        layout.blank().kv("Exported to", &path.display().to_string());
    }

    emit_human(layout);
    Ok(())
}
