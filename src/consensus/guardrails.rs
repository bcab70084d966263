//! Pre-check gate run before any scores are collected.
//!
//! A proposal that fails here never reaches the participants and leaves no
//! receipt behind.

use crate::receipt::Proposal;
use serde::{Deserialize, Serialize};

/// Outcome of screening a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screening {
    /// Proposal may proceed to scoring
    Passed,
    /// The pre-check flagged a risk
    RiskDetected(String),
    /// An override authority halted the proposal
    Overridden(String),
}

impl Screening {
    /// Whether deliberation may continue.
    pub fn passed(&self) -> bool {
        matches!(self, Screening::Passed)
    }
}

/// Risk screen over a proposal.
pub trait PreCheck {
    /// Screen a proposal.
    fn screen(&mut self, proposal: &Proposal) -> Screening;
}

/// Any `FnMut(&Proposal) -> bool` returning "risk present" is a pre-check.
impl<F> PreCheck for F
where
    F: FnMut(&Proposal) -> bool,
{
    fn screen(&mut self, proposal: &Proposal) -> Screening {
        if self(proposal) {
            Screening::RiskDetected("pre-check signalled risk".to_string())
        } else {
            Screening::Passed
        }
    }
}

/// Pre-check that lets everything through.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPreCheck;

impl PreCheck for NoPreCheck {
    fn screen(&mut self, _proposal: &Proposal) -> Screening {
        Screening::Passed
    }
}

/// External authority able to halt any proposal, consulted before the pre-check.
pub trait OverrideAuthority {
    /// Return true to halt.
    fn halt(&self, proposal: &Proposal) -> bool;
}

impl<F> OverrideAuthority for F
where
    F: Fn(&Proposal) -> bool,
{
    fn halt(&self, proposal: &Proposal) -> bool {
        self(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_pre_check() {
        let mut risky = |p: &Proposal| p.description.contains("harm");
        assert_eq!(risky.screen(&Proposal::new("plant trees")), Screening::Passed);
        assert!(!risky.screen(&Proposal::new("harm the river")).passed());
    }

    #[test]
    fn test_no_pre_check_passes() {
        assert!(NoPreCheck.screen(&Proposal::new("")).passed());
    }

    #[test]
    fn test_closure_override() {
        let authority = |_: &Proposal| true;
        assert!(authority.halt(&Proposal::new("anything")));
    }
}
