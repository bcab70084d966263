//! Council configuration.

use crate::core::{Error, Result};
use crate::receipt::HashMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Criterion names that would collide with the persisted vote fields.
const RESERVED_CRITERIA: [&str; 2] = ["valence", "veto"];

fn default_threshold() -> f64 {
    0.95
}

fn default_criteria() -> Vec<String> {
    vec!["joy".to_string(), "mercy".to_string(), "sustain".to_string()]
}

fn default_receipt_file() -> PathBuf {
    PathBuf::from("council_receipts.json")
}

fn default_verify_on_load() -> bool {
    true
}

/// Configuration for a council.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouncilConfig {
    /// Approval threshold on aggregate valence, inclusive
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Criteria every participant scores, in prompt order
    #[serde(default = "default_criteria")]
    pub criteria: Vec<String>,
    /// Receipt hashing mode
    #[serde(default)]
    pub hash_mode: HashMode,
    /// Receipt log location
    #[serde(default = "default_receipt_file")]
    pub receipt_file: PathBuf,
    /// Upper bound on score collection for one deliberation
    #[serde(default)]
    pub collection_timeout_secs: Option<u64>,
    /// Verify the receipt chain when opening the log
    #[serde(default = "default_verify_on_load")]
    pub verify_on_load: bool,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            criteria: default_criteria(),
            hash_mode: HashMode::default(),
            receipt_file: default_receipt_file(),
            collection_timeout_secs: None,
            verify_on_load: default_verify_on_load(),
        }
    }
}

impl CouncilConfig {
    /// Default config with a different threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Replace the criterion set.
    pub fn with_criteria(mut self, criteria: &[&str]) -> Self {
        self.criteria = criteria.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Set the hashing mode.
    pub fn with_hash_mode(mut self, mode: HashMode) -> Self {
        self.hash_mode = mode;
        self
    }

    /// Set the receipt file.
    pub fn with_receipt_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.receipt_file = path.into();
        self
    }

    /// Set the score collection timeout.
    pub fn with_collection_timeout(mut self, timeout: Duration) -> Self {
        self.collection_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Score collection timeout, if any.
    pub fn collection_timeout(&self) -> Option<Duration> {
        self.collection_timeout_secs.map(Duration::from_secs)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check threshold and criterion set.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::Configuration(format!(
                "threshold {} is outside [0, 1]",
                self.threshold
            )));
        }

        if self.criteria.is_empty() {
            return Err(Error::Configuration("criterion set is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if criterion.trim().is_empty() {
                return Err(Error::Configuration("criterion name is blank".to_string()));
            }
            if RESERVED_CRITERIA.contains(&criterion.as_str()) {
                return Err(Error::Configuration(format!(
                    "criterion name '{}' is reserved",
                    criterion
                )));
            }
            if !seen.insert(criterion.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate criterion '{}'",
                    criterion
                )));
            }
        }

        Ok(())
    }
}

/// Check a roster: non-empty, no blank or duplicate names.
pub fn validate_roster(roster: &[String]) -> Result<()> {
    if roster.is_empty() {
        return Err(Error::Configuration("roster is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for member in roster {
        if member.trim().is_empty() {
            return Err(Error::Configuration("participant name is blank".to_string()));
        }
        if !seen.insert(member.as_str()) {
            return Err(Error::Configuration(format!(
                "duplicate participant '{}'",
                member
            )));
        }
    }

    Ok(())
}
