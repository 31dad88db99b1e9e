//! Labelled interview outcomes and their on-disk store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::utils::{read_json_optional, remove_if_exists, write_json_atomic};

use super::features::PredictionFeatures;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: PredictionFeatures,
    /// `true` if an offer was made.
    pub outcome: bool,
    #[serde(default)]
    pub actual_offer: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Accepts RFC 3339 strings or Unix seconds, as older exports used.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Seconds(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
        Raw::Seconds(secs) => {
            #[allow(clippy::cast_possible_truncation)]
            let millis = (secs * 1000.0).round() as i64;
            Utc.timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp {secs} out of range")))
        }
    }
}

/// Whether a write reached disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Durability {
    Persisted,
    /// The change is live for this session only.
    InMemoryOnly { reason: String },
}

impl Durability {
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

/// Append-only list of samples backed by a JSON file.
///
/// If the file exists but cannot be read, the store starts empty and refuses
/// to overwrite it for the rest of the session.
#[derive(Debug, Default)]
pub struct TrainingStore {
    path: Option<PathBuf>,
    samples: Vec<TrainingSample>,
    write_blocked: Option<String>,
}

impl TrainingStore {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match read_json_optional::<Vec<TrainingSample>>(&path) {
            Ok(samples) => {
                let samples = samples.unwrap_or_default();
                debug!(path = %path.display(), samples = samples.len(), "loaded training samples");
                Self {
                    path: Some(path),
                    samples,
                    write_blocked: None,
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "training samples unreadable; starting empty");
                Self {
                    path: Some(path),
                    samples: Vec::new(),
                    write_blocked: Some(format!("samples file unreadable: {err}")),
                }
            }
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn push(&mut self, sample: TrainingSample) -> Durability {
        self.samples.push(sample);
        self.save()
    }

    pub fn extend(&mut self, samples: impl IntoIterator<Item = TrainingSample>) -> Durability {
        self.samples.extend(samples);
        self.save()
    }

    /// Write every sample to disk. Failures are logged and reported, never
    /// raised.
    pub fn save(&self) -> Durability {
        let Some(path) = &self.path else {
            return Durability::InMemoryOnly {
                reason: "no data directory".to_string(),
            };
        };
        if let Some(reason) = &self.write_blocked {
            return Durability::InMemoryOnly {
                reason: reason.clone(),
            };
        }
        match write_json_atomic(path, &self.samples) {
            Ok(()) => Durability::Persisted,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to persist training samples");
                Durability::InMemoryOnly {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Drop every sample and delete the file.
    pub fn clear(&mut self) -> Result<()> {
        self.samples.clear();
        self.write_blocked = None;
        if let Some(path) = &self.path {
            remove_if_exists(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{UnitTestFixture, labelled_samples};

    #[test]
    fn push_persists_and_reloads() {
        let fixture = UnitTestFixture::new();
        let path = fixture.path().join("samples.json");

        let mut store = TrainingStore::open(&path);
        assert!(store.is_empty());
        for sample in labelled_samples(3) {
            assert!(store.push(sample).is_persisted());
        }

        let reopened = TrainingStore::open(&path);
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.samples()[1].notes, "sample 1");
    }

    #[test]
    fn corrupt_file_is_never_overwritten() {
        let fixture = UnitTestFixture::new();
        let path = fixture.create_file("samples.json", "{ not json");

        let mut store = TrainingStore::open(&path);
        let durability = store.push(labelled_samples(1).remove(0));

        assert!(!durability.is_persisted());
        assert_eq!(store.len(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn in_memory_store_reports_durability() {
        let mut store = TrainingStore::in_memory();
        let durability = store.push(labelled_samples(1).remove(0));
        assert!(matches!(durability, Durability::InMemoryOnly { .. }));
    }

    #[test]
    fn legacy_unix_timestamps_parse() {
        let raw = r#"[{"features": {"role_level": "lead"}, "outcome": true, "timestamp": 1700000000.5}]"#;
        let samples: Vec<TrainingSample> = serde_json::from_str(raw).unwrap();
        assert_eq!(samples[0].timestamp.timestamp(), 1_700_000_000);
        assert!(samples[0].actual_offer.is_none());
    }

    #[test]
    fn clear_removes_file() {
        let fixture = UnitTestFixture::new();
        let path = fixture.path().join("samples.json");
        let mut store = TrainingStore::open(&path);
        let _ = store.push(labelled_samples(1).remove(0));
        assert!(path.exists());

        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
    }
}
