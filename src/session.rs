//! Interactive council session.
//!
//! Reads proposals from the prompter until `quit` or end of input and runs
//! each through the council, printing the outcome banner.

use crate::consensus::{Council, Deliberation, ScoreSource, SharedPrompter};
use crate::core::{Error, Result};
use crate::receipt::{Proposal, ReceiptStore};
use std::io::{BufRead, Write};
use tracing::warn;

const RULE: &str = "============================================================";

/// Counts for a finished session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Proposals entered
    pub proposals: usize,
    /// Proposals approved
    pub approved: usize,
    /// Proposals stopped at the pre-check
    pub gated: usize,
    /// Proposals discarded because a ballot was invalid or late
    pub discarded: usize,
}

/// Run proposals through `council` until the operator quits.
///
/// Invalid or late ballots discard the current proposal and the loop goes
/// on; storage failures end the session with the error.
pub fn run_session<S, R, W>(
    council: &mut Council<S>,
    prompter: &SharedPrompter<R, W>,
    scores: &mut dyn ScoreSource,
    fork_context: Option<&str>,
) -> Result<SessionSummary>
where
    S: ReceiptStore,
    R: BufRead,
    W: Write,
{
    let mut summary = SessionSummary::default();
    prompter
        .borrow_mut()
        .say("Valence council session started")?;

    loop {
        let description = prompter
            .borrow_mut()
            .ask("\nEnter proposal description (or 'quit' to end): ")?;
        let description = match description {
            Some(d) if !d.eq_ignore_ascii_case("quit") => d,
            _ => break,
        };

        let impact = prompter.borrow_mut().ask("Predicted impact (optional): ")?;
        let mut proposal = Proposal::new(&description);
        match impact {
            Some(i) if !i.is_empty() => proposal = proposal.with_predicted_impact(&i),
            Some(_) => {}
            None => break,
        }

        summary.proposals += 1;
        let outcome = council.deliberate(proposal, scores, fork_context);
        match outcome {
            Ok(deliberation) => {
                if deliberation.was_gated() {
                    summary.gated += 1;
                } else if deliberation.approved {
                    summary.approved += 1;
                }
                announce(council, prompter, &deliberation)?;
            }
            Err(e @ Error::InvalidScore { .. }) | Err(e @ Error::CollectionTimedOut { .. }) => {
                warn!(error = %e, "proposal discarded");
                summary.discarded += 1;
                prompter
                    .borrow_mut()
                    .say(&format!("Ballot rejected ({}). Proposal discarded, resubmit to retry.", e))?;
            }
            Err(Error::Cancelled) => break,
            Err(e) => return Err(e),
        }
    }

    prompter.borrow_mut().say(&format!(
        "\nSession complete. {} receipts on the chain.",
        council.receipts().len()
    ))?;
    Ok(summary)
}

fn announce<S, R, W>(
    council: &Council<S>,
    prompter: &SharedPrompter<R, W>,
    deliberation: &Deliberation,
) -> Result<()>
where
    S: ReceiptStore,
    R: BufRead,
    W: Write,
{
    let mut p = prompter.borrow_mut();

    let receipt = match &deliberation.receipt {
        Some(receipt) => receipt,
        None => {
            p.say(&format!("Proposal halted before deliberation: {:?}", deliberation.screening))?;
            return Ok(());
        }
    };

    p.say(&format!("\n{}", RULE))?;
    p.say(&format!(
        "CONSENSUS OUTCOME: {}",
        if deliberation.approved {
            "APPROVED"
        } else {
            "REFINE FURTHER"
        }
    ))?;
    p.say(&format!(
        "Average valence: {:.4} | Threshold: {} | Vetoes: {}",
        receipt.avg_valence,
        council.threshold(),
        receipt.has_veto
    ))?;
    p.say(&format!("Receipt hash: {}", receipt.receipt_hash))?;
    p.say(&format!("Stacked receipts: {} total", council.receipts().len()))?;
    p.say(RULE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{CouncilConfig, PromptPreCheck, PromptScoreSource, Prompter};
    use crate::receipt::MemoryStore;
    use std::io::Cursor;

    fn session(input: &str) -> (SessionSummary, Council<MemoryStore>, String) {
        let prompter = Prompter::shared(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let mut council = Council::new(
            vec!["Sherif".to_string(), "Grok".to_string()],
            CouncilConfig::default().with_threshold(0.9),
            MemoryStore::new(),
        )
        .unwrap()
        .with_pre_check(PromptPreCheck::new(prompter.clone()));
        let mut scores = PromptScoreSource::new(prompter.clone()).with_default_score(1.0);

        let summary = run_session(&mut council, &prompter, &mut scores, Some("Unified")).unwrap();
        let output = String::from_utf8(prompter.borrow().output().clone()).unwrap();
        (summary, council, output)
    }

    #[test]
    fn test_session_approves_and_quits() {
        let input = "Build a vertical farm\n+15% food security\nn\n\n\n\nn\n0.9\n0.9\n0.9\nn\nquit\n";
        let (summary, council, output) = session(input);

        assert_eq!(summary.proposals, 1);
        assert_eq!(summary.approved, 1);
        assert_eq!(council.receipts().len(), 1);

        let receipt = &council.receipts()[0];
        assert_eq!(receipt.avg_valence, 0.95);
        assert_eq!(receipt.fork_context.as_deref(), Some("Unified"));
        assert_eq!(
            receipt.proposal.predicted_impact.as_deref(),
            Some("+15% food security")
        );
        assert!(output.contains("CONSENSUS OUTCOME: APPROVED"));
        assert!(output.contains("Session complete. 1 receipts"));
    }

    #[test]
    fn test_session_gate_and_discard() {
        let input = concat!(
            "Dam the river\n\ny\n",
            "Plant trees\n\nn\n0.9\n2\n1\nn\n",
            "Plant trees\n\nn\n1\n1\n1\ny\n1\n1\n1\nn\n",
        );
        let (summary, council, output) = session(input);

        assert_eq!(summary.proposals, 3);
        assert_eq!(summary.gated, 1);
        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.approved, 0);
        assert_eq!(council.receipts().len(), 1);
        assert!(council.receipts()[0].has_veto);
        assert!(output.contains("REFINE FURTHER"));
        assert!(output.contains("Ballot rejected"));
    }
}
