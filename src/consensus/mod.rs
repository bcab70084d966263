//! Consensus Module
//!
//! Multi-criteria valence consensus:
//! - Per-participant ballots scored in [0, 1], with veto
//! - Pre-check gate and override authority
//! - Council orchestrating deliberation and receipt commit

pub mod config;
pub mod engine;
pub mod guardrails;
pub mod prompt;
pub mod voting;

pub use config::CouncilConfig;
pub use engine::{CancellationFlag, Council, CouncilMetrics, Deliberation};
pub use guardrails::{NoPreCheck, OverrideAuthority, PreCheck, Screening};
pub use prompt::{PromptPreCheck, PromptScoreSource, Prompter, SharedPrompter};
pub use voting::{Ballot, ScoreSource, ScriptedScoreSource, Tally};
