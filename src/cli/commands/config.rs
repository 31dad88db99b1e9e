use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::{OfferError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommand {
    /// Print the merged configuration (default)
    Show,

    /// Print where configuration and data live
    Path,
}

pub fn run(ctx: &mut AppContext, args: &ConfigArgs) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
    }
}

fn show(ctx: &AppContext) -> Result<()> {
    if ctx.robot_mode {
        return emit_robot(&robot_ok(&ctx.config));
    }
    let rendered = toml::to_string_pretty(&ctx.config)
        .map_err(|err| OfferError::Serialization(format!("render config: {err}")))?;
    println!("{rendered}");
    Ok(())
}

fn path(ctx: &AppContext) -> Result<()> {
    if ctx.robot_mode {
        let payload = serde_json::json!({
            "config_path": ctx.config_path.display().to_string(),
            "config_exists": ctx.config_path.exists(),
            "data_root": ctx.root.display().to_string(),
        });
        return emit_robot(&robot_ok(payload));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Paths")
        .kv("Config", &ctx.config_path.display().to_string())
        .kv("Config exists", &ctx.config_path.exists().to_string())
        .kv("Data root", &ctx.root.display().to_string());
    emit_human(layout);
    Ok(())
}
