//! # Valence Council - Multi-criteria consensus gate
//!
//! A small council framework providing:
//! - **Consensus**: weighted multi-criteria scoring with veto and threshold
//! - **Guardrails**: a pre-check gate and override authority ahead of scoring
//! - **Receipts**: SHA3-256 content-addressed, hash-chained decision log
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use valence_council::consensus::{Ballot, Council, CouncilConfig, ScriptedScoreSource};
//! use valence_council::receipt::Proposal;
//!
//! fn main() -> valence_council::Result<()> {
//!     let config = CouncilConfig::default();
//!     let criteria = config.criteria.clone();
//!     let mut council = Council::open(vec!["Sherif".into(), "Grok".into()], config)?;
//!
//!     let mut scores = ScriptedScoreSource::new()
//!         .with_fallback(Ballot::uniform(&criteria, 0.97, false));
//!     let outcome = council.deliberate(
//!         Proposal::new("Build a shared vertical farm"),
//!         &mut scores,
//!         None,
//!     )?;
//!     println!("approved: {}", outcome.approved);
//!     Ok(())
//! }
//! ```

pub mod consensus;
pub mod core;
pub mod receipt;
pub mod session;

pub use consensus::{Council, CouncilConfig};
pub use core::error::{Error, Result};
pub use receipt::{Proposal, Receipt};
pub use session::{run_session, SessionSummary};
