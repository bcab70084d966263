//! Interactive valence council.
//!
//! Usage:
//!   valence-council [SESSION_FILE] [--receipt-file PATH] [--threshold T] [--fork LABEL]
//!
//! The optional session file holds the council configuration plus the
//! member roster, a default score for blank answers and a fork context.
//! Command-line flags override the file.
//!
//! Environment variables:
//!   VALENCE_RECEIPT_FILE - receipt log location
//!   VALENCE_THRESHOLD - approval threshold in [0, 1]
//!   RUST_LOG - log filter (default: info)

use clap::Parser;
use serde::Deserialize;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use valence_council::consensus::{Council, CouncilConfig, PromptPreCheck, PromptScoreSource, Prompter};
use valence_council::{run_session, Error, Result};

#[derive(Parser, Debug)]
#[command(name = "valence-council")]
#[command(about = "Multi-criteria consensus council with a hash-chained receipt log")]
#[command(version)]
struct Cli {
    /// Session file (JSON): members, council settings, default score, fork context
    session: Option<PathBuf>,

    /// Receipt log location (overrides the session file)
    #[arg(long, env = "VALENCE_RECEIPT_FILE")]
    receipt_file: Option<PathBuf>,

    /// Approval threshold in [0, 1] (overrides the session file)
    #[arg(long, env = "VALENCE_THRESHOLD")]
    threshold: Option<f64>,

    /// Fork context recorded on every receipt (overrides the session file)
    #[arg(long)]
    fork: Option<String>,
}

fn default_members() -> Vec<String> {
    ["Sherif", "Grok", "AlphaMember", "OmegaMember", "HarmonyMember"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_score() -> Option<f64> {
    Some(1.0)
}

#[derive(Debug, Deserialize)]
struct SessionFile {
    #[serde(default = "default_members")]
    members: Vec<String>,
    #[serde(flatten)]
    council: CouncilConfig,
    #[serde(default = "default_score")]
    default_score: Option<f64>,
    #[serde(default)]
    fork_context: Option<String>,
}

impl Default for SessionFile {
    fn default() -> Self {
        Self {
            members: default_members(),
            council: CouncilConfig::default(),
            default_score: default_score(),
            fork_context: None,
        }
    }
}

impl SessionFile {
    fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Configuration(format!("parse {}: {}", path.display(), e)))
    }

    /// Session file (or defaults) with command-line overrides applied.
    fn resolve(cli: &Cli) -> Result<Self> {
        let mut session = match &cli.session {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(path) = &cli.receipt_file {
            session.council.receipt_file = path.clone();
        }
        if let Some(threshold) = cli.threshold {
            session.council.threshold = threshold;
        }
        if let Some(fork) = &cli.fork {
            session.fork_context = Some(fork.clone());
        }
        session.council.validate()?;
        Ok(session)
    }
}

fn run(cli: Cli) -> Result<()> {
    let session = SessionFile::resolve(&cli)?;
    info!(
        members = session.members.len(),
        threshold = session.council.threshold,
        receipt_file = %session.council.receipt_file.display(),
        "starting council session"
    );

    let prompter = Prompter::shared(BufReader::new(io::stdin()), io::stdout());
    let mut council = Council::open(session.members, session.council)?
        .with_pre_check(PromptPreCheck::new(prompter.clone()));

    let mut scores = PromptScoreSource::new(prompter.clone());
    if let Some(score) = session.default_score {
        scores = scores.with_default_score(score);
    }

    let summary = run_session(
        &mut council,
        &prompter,
        &mut scores,
        session.fork_context.as_deref(),
    )?;
    info!(
        proposals = summary.proposals,
        approved = summary.approved,
        gated = summary.gated,
        discarded = summary.discarded,
        "session finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "council session failed");
            ExitCode::FAILURE
        }
    }
}
