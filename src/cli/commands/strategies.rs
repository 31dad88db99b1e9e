use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;
use crate::utils::format_amount;

#[derive(Args, Debug, Default)]
pub struct StrategiesArgs {
    /// Only strategies of this style (soft, neutral, hard)
    #[arg(long)]
    pub style: Option<String>,
}

pub fn run(ctx: &mut AppContext, args: &StrategiesArgs) -> Result<()> {
    let target = ctx.config.negotiation.target_salary;
    let strategies: Vec<_> = ctx
        .engine
        .catalog()
        .strategies()
        .iter()
        .filter(|s| {
            args.style
                .as_deref()
                .is_none_or(|style| s.style.as_str().eq_ignore_ascii_case(style))
        })
        .collect();

    if ctx.robot_mode {
        let entries: Vec<_> = strategies
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "style": s.style,
                    "personality": s.personality,
                    "risk": s.risk,
                    "target_multiplier": s.target_multiplier,
                    "ask": target * s.target_multiplier,
                })
            })
            .collect();
        let payload = serde_json::json!({
            "target_salary": target,
            "max_parallel": ctx.config.negotiation.max_parallel,
            "strategies": entries,
        });
        return emit_robot(&robot_ok(payload));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Strategies")
        .kv("Target salary", &format!("${}", format_amount(target)))
        .kv(
            "Per round",
            &ctx.config.negotiation.max_parallel.to_string(),
        )
        .blank();
    if strategies.is_empty() {
        layout.push_line("No strategies match.");
    }
    for s in strategies {
        layout.kv(
            &s.name,
            &format!(
                "{} / {} / {} risk, asks ${} (x{:.2})",
                s.style,
                s.personality,
                s.risk,
                format_amount(target * s.target_multiplier),
                s.target_multiplier
            ),
        );
    }
    emit_human(layout);
    Ok(())
}
