use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OfferError, Result};
use crate::negotiation::strategy::Strategy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub negotiation: NegotiationConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub bandit: BanditConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("OFFERLAB_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(OfferError::MissingConfig(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("offerlab/config.toml"))
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        let path = root.join("config.toml");
        Self::load_patch(&path)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| OfferError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| OfferError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.negotiation {
            self.negotiation.merge(patch);
        }
        if let Some(patch) = patch.prediction {
            self.prediction.merge(patch);
        }
        if let Some(patch) = patch.bandit {
            self.bandit.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_f64("OFFERLAB_BASE_SALARY")? {
            self.negotiation.base_salary = value;
        }
        if let Some(value) = env_f64("OFFERLAB_TARGET_SALARY")? {
            self.negotiation.target_salary = value;
        }
        if let Some(value) = env_usize("OFFERLAB_MAX_PARALLEL")? {
            self.negotiation.max_parallel = value;
        }
        if let Some(value) = env_string("OFFERLAB_TASK_TIMEOUT") {
            self.negotiation.task_timeout = humantime_duration("OFFERLAB_TASK_TIMEOUT", &value)?;
        }
        if let Some(value) = env_usize("OFFERLAB_ROUNDS")? {
            self.negotiation.rounds = value;
        }
        if let Some(value) = env_string("OFFERLAB_AGENT") {
            self.negotiation.agent = parse_agent_kind(&value)?;
        }
        if let Some(value) = env_string("OFFERLAB_AGENT_COMMAND") {
            self.negotiation.agent_command = Some(value);
        }
        if let Some(value) = env_u64("OFFERLAB_SEED")? {
            self.negotiation.seed = Some(value);
        }

        if let Some(value) = env_usize("OFFERLAB_MIN_TRAINING_SAMPLES")? {
            self.prediction.min_training_samples = value;
        }
        if let Some(value) = env_usize("OFFERLAB_N_ESTIMATORS")? {
            self.prediction.n_estimators = value;
        }

        if let Some(value) = env_f64("OFFERLAB_EXPLORATION_FACTOR")? {
            self.bandit.exploration_factor = value;
        }
        if let Some(value) = env_f64("OFFERLAB_REFERENCE_SALARY")? {
            self.bandit.reference_salary = Some(value);
        }

        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let n = &self.negotiation;
        if !(n.base_salary.is_finite() && n.base_salary >= 0.0) {
            return Err(OfferError::Config(format!(
                "negotiation.base_salary must be a non-negative number, got {}",
                n.base_salary
            )));
        }
        if !(n.target_salary.is_finite() && n.target_salary > 0.0) {
            return Err(OfferError::Config(format!(
                "negotiation.target_salary must be positive, got {}",
                n.target_salary
            )));
        }
        if n.max_parallel == 0 {
            return Err(OfferError::Config(
                "negotiation.max_parallel must be at least 1".to_string(),
            ));
        }
        if !(2..=3).contains(&n.rounds) {
            return Err(OfferError::Config(format!(
                "negotiation.rounds must be 2 or 3, got {}",
                n.rounds
            )));
        }
        if n.task_timeout.is_zero() {
            return Err(OfferError::Config(
                "negotiation.task_timeout must be non-zero".to_string(),
            ));
        }
        if n.agent == AgentKind::Command && n.agent_command.is_none() {
            return Err(OfferError::Config(
                "negotiation.agent = \"command\" requires negotiation.agent_command".to_string(),
            ));
        }
        if self.prediction.min_training_samples < 2 {
            return Err(OfferError::Config(
                "prediction.min_training_samples must be at least 2".to_string(),
            ));
        }
        if self.prediction.n_estimators == 0 || self.prediction.max_depth == 0 {
            return Err(OfferError::Config(
                "prediction.n_estimators and prediction.max_depth must be positive".to_string(),
            ));
        }
        if self.bandit.exploration_factor < 0.0 {
            return Err(OfferError::Config(
                "bandit.exploration_factor must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which negotiating agent speaks for the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Built-in deterministic templates.
    #[default]
    Template,
    /// External program; receives a JSON request on stdin, replies on stdout.
    Command,
    /// No agent available; every strategy degrades to the base salary.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationConfig {
    #[serde(default = "default_base_salary")]
    pub base_salary: f64,
    #[serde(default = "default_target_salary")]
    pub target_salary: f64,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "default_task_timeout", with = "humantime_serde")]
    pub task_timeout: Duration,
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    #[serde(default = "default_materiality_threshold")]
    pub materiality_threshold: f64,
    #[serde(default)]
    pub agent: AgentKind,
    #[serde(default)]
    pub agent_command: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Replaces the built-in catalog when non-empty.
    #[serde(default)]
    pub strategies: Vec<Strategy>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            base_salary: default_base_salary(),
            target_salary: default_target_salary(),
            max_parallel: default_max_parallel(),
            task_timeout: default_task_timeout(),
            rounds: default_rounds(),
            materiality_threshold: default_materiality_threshold(),
            agent: AgentKind::default(),
            agent_command: None,
            seed: None,
            strategies: Vec::new(),
        }
    }
}

impl NegotiationConfig {
    fn merge(&mut self, patch: NegotiationPatch) {
        if let Some(value) = patch.base_salary {
            self.base_salary = value;
        }
        if let Some(value) = patch.target_salary {
            self.target_salary = value;
        }
        if let Some(value) = patch.max_parallel {
            self.max_parallel = value;
        }
        if let Some(value) = patch.task_timeout {
            self.task_timeout = value;
        }
        if let Some(value) = patch.rounds {
            self.rounds = value;
        }
        if let Some(value) = patch.materiality_threshold {
            self.materiality_threshold = value;
        }
        if let Some(value) = patch.agent {
            self.agent = value;
        }
        if let Some(value) = patch.agent_command {
            self.agent_command = Some(value);
        }
        if let Some(value) = patch.seed {
            self.seed = Some(value);
        }
        if let Some(values) = patch.strategies {
            self.strategies = values;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_min_training_samples")]
    pub min_training_samples: usize,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_similar_case_window")]
    pub similar_case_window: usize,
    #[serde(default = "default_similar_case_limit")]
    pub similar_case_limit: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            min_training_samples: default_min_training_samples(),
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            similar_case_window: default_similar_case_window(),
            similar_case_limit: default_similar_case_limit(),
        }
    }
}

impl PredictionConfig {
    fn merge(&mut self, patch: PredictionPatch) {
        if let Some(value) = patch.min_training_samples {
            self.min_training_samples = value;
        }
        if let Some(value) = patch.n_estimators {
            self.n_estimators = value;
        }
        if let Some(value) = patch.max_depth {
            self.max_depth = value;
        }
        if let Some(value) = patch.similar_case_window {
            self.similar_case_window = value;
        }
        if let Some(value) = patch.similar_case_limit {
            self.similar_case_limit = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditConfig {
    #[serde(default = "default_exploration_factor")]
    pub exploration_factor: f64,
    /// Salary that earns the full bonus; falls back to the negotiation target.
    #[serde(default)]
    pub reference_salary: Option<f64>,
    #[serde(default = "default_max_salary_bonus")]
    pub max_salary_bonus: f64,
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            exploration_factor: default_exploration_factor(),
            reference_salary: None,
            max_salary_bonus: default_max_salary_bonus(),
        }
    }
}

impl BanditConfig {
    fn merge(&mut self, patch: BanditPatch) {
        if let Some(value) = patch.exploration_factor {
            self.exploration_factor = value;
        }
        if let Some(value) = patch.reference_salary {
            self.reference_salary = Some(value);
        }
        if let Some(value) = patch.max_salary_bonus {
            self.max_salary_bonus = value;
        }
    }
}

const fn default_base_salary() -> f64 {
    200_000.0
}

const fn default_target_salary() -> f64 {
    250_000.0
}

const fn default_max_parallel() -> usize {
    3
}

const fn default_task_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_rounds() -> usize {
    2
}

const fn default_materiality_threshold() -> f64 {
    10_000.0
}

const fn default_min_training_samples() -> usize {
    10
}

const fn default_n_estimators() -> usize {
    100
}

const fn default_max_depth() -> usize {
    10
}

const fn default_similar_case_window() -> usize {
    50
}

const fn default_similar_case_limit() -> usize {
    3
}

const fn default_exploration_factor() -> f64 {
    1.0
}

const fn default_max_salary_bonus() -> f64 {
    0.5
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub negotiation: Option<NegotiationPatch>,
    pub prediction: Option<PredictionPatch>,
    pub bandit: Option<BanditPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NegotiationPatch {
    pub base_salary: Option<f64>,
    pub target_salary: Option<f64>,
    pub max_parallel: Option<usize>,
    #[serde(default, with = "humantime_serde")]
    pub task_timeout: Option<Duration>,
    pub rounds: Option<usize>,
    pub materiality_threshold: Option<f64>,
    pub agent: Option<AgentKind>,
    pub agent_command: Option<String>,
    pub seed: Option<u64>,
    pub strategies: Option<Vec<Strategy>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PredictionPatch {
    pub min_training_samples: Option<usize>,
    pub n_estimators: Option<usize>,
    pub max_depth: Option<usize>,
    pub similar_case_window: Option<usize>,
    pub similar_case_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BanditPatch {
    pub exploration_factor: Option<f64>,
    pub reference_salary: Option<f64>,
    pub max_salary_bonus: Option<f64>,
}

fn parse_agent_kind(value: &str) -> Result<AgentKind> {
    match value.to_lowercase().as_str() {
        "template" => Ok(AgentKind::Template),
        "command" => Ok(AgentKind::Command),
        "none" | "off" => Ok(AgentKind::None),
        _ => Err(OfferError::Config(format!(
            "invalid agent {value} (expected template|command|none)"
        ))),
    }
}

fn humantime_duration(key: &str, value: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(value)
        .map_err(|err| OfferError::Config(format!("invalid {key} value {value}: {err}")))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<usize>().map(Some).map_err(|err| {
            OfferError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u64>().map(Some).map_err(|err| {
            OfferError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<f64>().map(Some).map_err(|err| {
            OfferError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}
