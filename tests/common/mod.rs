//! Common test utilities shared across integration and e2e tests.
//!
//! Every test gets its own data root and an explicit config file, so the
//! user's global configuration never leaks in.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const DEFAULT_CONFIG: &str = r#"
[negotiation]
base_salary = 200000
target_salary = 250000
max_parallel = 3
task_timeout = "5s"
rounds = 2
seed = 7

[prediction]
min_training_samples = 10
n_estimators = 20
max_depth = 6
"#;

pub struct TestRoot {
    dir: TempDir,
    config: PathBuf,
}

impl TestRoot {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CONFIG)
    }

    pub fn with_config(config: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp root");
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, config).expect("write config");
        Self {
            dir,
            config: config_path,
        }
    }

    pub fn log_step(&self, step: &str) {
        println!("[STEP] {step}");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("offerlab").expect("offerlab binary");
        cmd.env("OFFERLAB_ROOT", self.dir.path())
            .env("OFFERLAB_CONFIG", &self.config)
            .env("RUST_LOG", "warn");
        cmd
    }

    /// Run with `--robot`, assert success and return the `data` payload.
    pub fn robot(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--robot")
            .args(args)
            .output()
            .expect("run offerlab");
        assert!(
            output.status.success(),
            "offerlab {args:?} failed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let json: Value = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
            panic!(
                "stdout is not JSON ({err}): {}",
                String::from_utf8_lossy(&output.stdout)
            )
        });
        assert_eq!(json["status"], "ok", "unexpected status: {json}");
        json["data"].clone()
    }
}

/// Args for `train add` describing a strong or weak candidate.
pub fn sample_args(strong: bool, jitter: u32) -> Vec<String> {
    let (role, tech, comm, fit, outcome) = if strong {
        ("senior", 0.85, 0.85, 0.9, "offer")
    } else {
        ("junior", 0.35, 0.4, 0.3, "rejected")
    };
    let tech = f64::from(jitter % 5).mul_add(0.01, tech);
    vec![
        "train".into(),
        "add".into(),
        "--role-level".into(),
        role.into(),
        "--technical-score".into(),
        format!("{tech:.2}"),
        "--communication-score".into(),
        comm.to_string(),
        "--cultural-fit".into(),
        fit.to_string(),
        "--experience".into(),
        (if strong { 7 + jitter % 3 } else { 1 }).to_string(),
        "--outcome".into(),
        outcome.into(),
        "--notes".into(),
        format!("sample {jitter}"),
    ]
}
