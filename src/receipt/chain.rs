//! Receipt chain verification.
//!
//! A chained receipt carries the hash of its predecessor; the first chained
//! receipt of a log points at the zero hash. Receipts without a
//! `previous_hash` are stand-alone and only their own content hash is
//! checked, but once a log has started chaining every later receipt must
//! chain as well.

use crate::core::{Hash256, Result};
use crate::receipt::record::Receipt;
use serde::{Deserialize, Serialize};

/// How new receipts are hashed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashMode {
    /// Each hash covers the previous receipt's hash
    #[default]
    Chained,
    /// Each receipt is hashed on its own
    Unchained,
}

impl HashMode {
    /// The `previous_hash` to stamp on a receipt appended after `last`.
    pub fn link_after(&self, last: Option<&Receipt>) -> Option<Hash256> {
        match self {
            HashMode::Unchained => None,
            HashMode::Chained => Some(
                last.map(|r| r.receipt_hash.clone())
                    .unwrap_or_else(Hash256::zero),
            ),
        }
    }
}

/// Why a single receipt failed verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkFault {
    /// Content no longer matches the stored hash
    HashMismatch,
    /// `previous_hash` does not point at the preceding receipt
    BrokenLink,
    /// An un-chained receipt follows a chained one
    ChainDowngrade,
    /// Timestamp earlier than the preceding receipt's
    TimestampRegression,
}

/// Result of verifying one receipt against its predecessor.
#[derive(Clone, Debug)]
pub struct ReceiptVerification {
    /// Whether the receipt is valid
    pub valid: bool,
    /// What went wrong, if anything
    pub fault: Option<LinkFault>,
}

impl ReceiptVerification {
    fn ok() -> Self {
        Self {
            valid: true,
            fault: None,
        }
    }

    fn fail(fault: LinkFault) -> Self {
        Self {
            valid: false,
            fault: Some(fault),
        }
    }

    /// Whether the receipt content was altered after sealing.
    pub fn tamper_detected(&self) -> bool {
        self.fault == Some(LinkFault::HashMismatch)
    }
}

/// Result of chain verification.
#[derive(Clone, Debug)]
pub struct ChainVerification {
    /// Whether the chain is valid
    pub valid: bool,
    /// Number of receipts verified before stopping
    pub receipts_verified: usize,
    /// Number of verified receipts carrying a chain link
    pub chained_receipts: usize,
    /// Whether tampering was detected
    pub tamper_detected: bool,
    /// Index of first invalid receipt (if any)
    pub first_invalid_index: Option<usize>,
    /// Fault at the first invalid receipt
    pub fault: Option<LinkFault>,
}

/// Verify one receipt given its predecessor.
pub fn verify_receipt(receipt: &Receipt, parent: Option<&Receipt>) -> Result<ReceiptVerification> {
    if !receipt.hash_matches()? {
        return Ok(ReceiptVerification::fail(LinkFault::HashMismatch));
    }

    if let Some(parent) = parent {
        if receipt.timestamp < parent.timestamp {
            return Ok(ReceiptVerification::fail(LinkFault::TimestampRegression));
        }
    }

    match (&receipt.previous_hash, parent) {
        (Some(prev), Some(parent)) if *prev != parent.receipt_hash => {
            Ok(ReceiptVerification::fail(LinkFault::BrokenLink))
        }
        (Some(prev), None) if *prev != Hash256::zero() => {
            Ok(ReceiptVerification::fail(LinkFault::BrokenLink))
        }
        (None, Some(parent)) if parent.is_chained() => {
            Ok(ReceiptVerification::fail(LinkFault::ChainDowngrade))
        }
        _ => Ok(ReceiptVerification::ok()),
    }
}

/// Verify an entire receipt sequence.
pub fn verify_chain(receipts: &[Receipt]) -> Result<ChainVerification> {
    let mut verification = ChainVerification {
        valid: true,
        receipts_verified: 0,
        chained_receipts: 0,
        tamper_detected: false,
        first_invalid_index: None,
        fault: None,
    };

    for (i, receipt) in receipts.iter().enumerate() {
        let parent = if i > 0 { Some(&receipts[i - 1]) } else { None };

        let receipt_verification = verify_receipt(receipt, parent)?;
        if !receipt_verification.valid {
            verification.valid = false;
            verification.tamper_detected = receipt_verification.tamper_detected();
            verification.first_invalid_index = Some(i);
            verification.fault = receipt_verification.fault;
            break;
        }

        verification.receipts_verified += 1;
        if receipt.is_chained() {
            verification.chained_receipts += 1;
        }
    }

    Ok(verification)
}
