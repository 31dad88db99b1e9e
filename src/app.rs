use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::{OfferError, Result};
use crate::negotiation::NegotiationEngine;
use crate::prediction::SuccessPredictor;
use crate::tactics::TacticAdvisor;
use crate::utils::ensure_dir;

pub struct AppContext {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
    pub engine: NegotiationEngine,
    pub predictor: SuccessPredictor,
    pub advisor: TacticAdvisor,
    pub robot_mode: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let root = Self::find_root()?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| default_config_path(&root));
        let config = Config::load(cli.config.as_deref(), &root)?;
        Self::with_config(root, config_path, config, cli.robot, cli.verbose)
    }

    pub fn with_config(
        root: PathBuf,
        config_path: PathBuf,
        config: Config,
        robot_mode: bool,
        verbosity: u8,
    ) -> Result<Self> {
        ensure_dir(&root)?;
        debug!(root = %root.display(), "using data root");

        let engine = NegotiationEngine::from_config(&config.negotiation)?;
        let predictor = SuccessPredictor::open(&root, config.prediction.clone());
        let advisor = TacticAdvisor::open(
            &root,
            &config.bandit,
            config.negotiation.target_salary,
            config.negotiation.seed,
        );

        Ok(Self {
            root,
            config_path,
            config,
            engine,
            predictor,
            advisor,
            robot_mode,
            verbosity,
        })
    }

    fn find_root() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("OFFERLAB_ROOT") {
            return Ok(PathBuf::from(root));
        }
        let cwd = std::env::current_dir()?;
        if let Some(found) = find_upwards(&cwd, ".offerlab") {
            return Ok(found);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| OfferError::MissingConfig("data directory not found".to_string()))?;
        Ok(data_dir.join("offerlab"))
    }
}

fn default_config_path(root: &Path) -> PathBuf {
    if root.ends_with(".offerlab") {
        root.join("config.toml")
    } else {
        dirs::config_dir()
            .unwrap_or_else(|| root.to_path_buf())
            .join("offerlab/config.toml")
    }
}

fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_dir())
}
