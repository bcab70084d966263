//! Receipt structure.
//!
//! A receipt is the immutable record of one completed deliberation.

use crate::core::{Hash256, Result, Timestamp};
use crate::receipt::hash::{canonical_bytes, sha3_256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the hash field, excluded from the canonical encoding.
pub const RECEIPT_HASH_FIELD: &str = "receipt_hash";

/// A proposal put before the council.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Free-text description
    pub description: String,
    /// Predicted impact, if the proposer stated one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_impact: Option<String>,
}

impl Proposal {
    /// Create a new proposal.
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            predicted_impact: None,
        }
    }

    /// Attach a predicted impact.
    pub fn with_predicted_impact(mut self, impact: &str) -> Self {
        self.predicted_impact = Some(impact.to_string());
        self
    }
}

/// One participant's validated submission.
///
/// Persisted flat: every criterion score sits next to `valence` and `veto`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    /// Criterion scores, each in [0, 1]
    #[serde(flatten)]
    pub scores: BTreeMap<String, f64>,
    /// Mean of the scores
    pub valence: f64,
    /// Veto flag
    pub veto: bool,
}

impl Vote {
    /// Build a vote, deriving valence from the scores.
    ///
    /// Scores are expected to be validated already.
    pub fn from_scores(scores: BTreeMap<String, f64>, veto: bool) -> Self {
        let valence = mean(scores.values().copied());
        Self {
            scores,
            valence,
            veto,
        }
    }
}

/// Arithmetic mean with a compensated (Neumaier) sum; 0.0 when empty.
///
/// Keeps the mean of equal inputs within a couple of ULPs of the input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0f64;
    let mut compensation = 0.0f64;
    let mut count = 0usize;

    for value in values {
        let t = sum + value;
        if sum.abs() >= value.abs() {
            compensation += (sum - t) + value;
        } else {
            compensation += (value - t) + sum;
        }
        sum = t;
        count += 1;
    }

    if count == 0 {
        0.0
    } else {
        (sum + compensation) / count as f64
    }
}

/// An immutable decision receipt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Creation timestamp
    pub timestamp: Timestamp,
    /// Fork/context label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_context: Option<String>,
    /// The proposal deliberated on
    pub proposal: Proposal,
    /// Votes keyed by participant
    pub votes: BTreeMap<String, Vote>,
    /// Aggregate valence, rounded to 4 decimal digits
    pub avg_valence: f64,
    /// Whether any participant vetoed
    #[serde(default)]
    pub has_veto: bool,
    /// Final decision
    pub approved: bool,
    /// Hash of the preceding receipt (chained receipts only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<Hash256>,
    /// Content hash of this receipt
    pub receipt_hash: Hash256,
}

impl Receipt {
    /// Compute the content hash (SHA3-256).
    /// Hash covers every field except the hash itself.
    pub fn compute_hash(&self) -> Result<Hash256> {
        let bytes = canonical_bytes(self, &[RECEIPT_HASH_FIELD])?;
        Ok(sha3_256(&bytes))
    }

    /// Compute and store the content hash.
    pub fn seal(mut self) -> Result<Self> {
        self.receipt_hash = self.compute_hash()?;
        Ok(self)
    }

    /// Check the stored hash against the content.
    pub fn hash_matches(&self) -> Result<bool> {
        Ok(self.compute_hash()? == self.receipt_hash)
    }

    /// Whether this receipt links to a predecessor.
    pub fn is_chained(&self) -> bool {
        self.previous_hash.is_some()
    }

    /// Serialize receipt to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize receipt from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
