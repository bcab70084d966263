//! Line-oriented prompts for interactive deliberation.
//!
//! One `Prompter` owns the input and output streams; the score source, the
//! pre-check, and the session loop share it so they never compete for
//! buffered input.

use crate::consensus::guardrails::{PreCheck, Screening};
use crate::consensus::voting::{Ballot, ScoreSource};
use crate::core::{Error, Result};
use crate::receipt::Proposal;
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use tracing::warn;

/// Prompter shared between the session, pre-check, and score source.
pub type SharedPrompter<R, W> = Rc<RefCell<Prompter<R, W>>>;

/// Question-and-answer over a reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Create a new prompter.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Wrap for sharing.
    pub fn shared(input: R, output: W) -> SharedPrompter<R, W> {
        Rc::new(RefCell::new(Self::new(input, output)))
    }

    /// Print a line.
    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    /// Ask a question; `None` at end of input.
    pub fn ask(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask a y/N question. Anything but `y`/`yes` is no.
    pub fn confirm(&mut self, question: &str) -> Result<Option<bool>> {
        Ok(self.ask(question)?.map(|answer| is_yes(&answer)))
    }

    /// Output stream written so far.
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Consume the prompter, returning the output stream.
    pub fn into_output(self) -> W {
        self.output
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "y" | "yes")
}

/// Score source asking each participant on the terminal.
pub struct PromptScoreSource<R, W> {
    prompter: SharedPrompter<R, W>,
    default_score: Option<f64>,
}

impl<R: BufRead, W: Write> PromptScoreSource<R, W> {
    /// Create a source on a shared prompter.
    pub fn new(prompter: SharedPrompter<R, W>) -> Self {
        Self {
            prompter,
            default_score: None,
        }
    }

    /// Score to use when an answer is left blank.
    pub fn with_default_score(mut self, score: f64) -> Self {
        self.default_score = Some(score);
        self
    }
}

impl<R: BufRead, W: Write> ScoreSource for PromptScoreSource<R, W> {
    fn collect(
        &mut self,
        participant: &str,
        _proposal: &Proposal,
        criteria: &[String],
    ) -> Result<Ballot> {
        let mut prompter = self.prompter.borrow_mut();
        prompter.say(&format!("\n{}'s deliberation - rate 0.0-1.0:", participant))?;

        let mut ballot = Ballot::new();
        for criterion in criteria {
            let answer = prompter
                .ask(&format!("  {} {}: ", participant, criterion))?
                .ok_or(Error::Cancelled)?;

            let score = if answer.is_empty() {
                self.default_score
                    .ok_or_else(|| Error::invalid_score(participant, criterion, "no answer"))?
            } else {
                answer.parse::<f64>().map_err(|_| {
                    Error::invalid_score(participant, criterion, format!("'{}' is not a number", answer))
                })?
            };
            ballot.scores.insert(criterion.clone(), score);
        }

        ballot.veto = prompter
            .confirm(&format!("  {} veto? (y/N): ", participant))?
            .ok_or(Error::Cancelled)?;

        let valence = ballot.scores.values().sum::<f64>() / ballot.scores.len().max(1) as f64;
        prompter.say(&format!(
            "  -> {} valence: {:.3} | veto: {}",
            participant, valence, ballot.veto
        ))?;

        Ok(ballot)
    }
}

/// Pre-check asking the operator whether the proposal risks harm.
pub struct PromptPreCheck<R, W> {
    prompter: SharedPrompter<R, W>,
}

impl<R: BufRead, W: Write> PromptPreCheck<R, W> {
    /// Create a pre-check on a shared prompter.
    pub fn new(prompter: SharedPrompter<R, W>) -> Self {
        Self { prompter }
    }
}

impl<R: BufRead, W: Write> PreCheck for PromptPreCheck<R, W> {
    fn screen(&mut self, _proposal: &Proposal) -> Screening {
        let mut prompter = self.prompter.borrow_mut();
        announce(&mut *prompter, "\nPre-check (ethical safety scan):");

        // Unanswerable prompt counts as risk.
        match prompter.confirm("  Does this proposal risk harm to any sentient? (y/N): ") {
            Ok(Some(false)) => {
                announce(&mut *prompter, "  Pre-check passed.");
                Screening::Passed
            }
            Ok(Some(true)) => {
                announce(&mut *prompter, "  Pre-check failed: refine the proposal.");
                Screening::RiskDetected("operator flagged risk of harm".to_string())
            }
            Ok(None) => Screening::RiskDetected("no pre-check answer".to_string()),
            Err(e) => Screening::RiskDetected(format!("pre-check prompt failed: {}", e)),
        }
    }
}

/// Status line from the pre-check; a failed write does not decide the screening.
fn announce<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>, text: &str) {
    if let Err(e) = prompter.say(text) {
        warn!(error = %e, "pre-check output not written");
    }
}
