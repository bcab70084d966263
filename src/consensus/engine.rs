//! Council orchestrating the deliberation protocol.
//!
//! Pre-check, score collection, tally, decision, receipt commit. Every step
//! before the commit is free of side effects on the receipt store, so a
//! failed deliberation leaves the log exactly as it was.

use crate::consensus::config::{validate_roster, CouncilConfig};
use crate::consensus::guardrails::{NoPreCheck, OverrideAuthority, PreCheck, Screening};
use crate::consensus::voting::{tally, validate_ballot, ScoreSource, Tally};
use crate::core::{now, Error, Hash256, Result, Timestamp};
use crate::receipt::{
    verify_chain, ChainVerification, JsonFileStore, Proposal, Receipt, ReceiptStore, Vote,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of one call to [`Council::deliberate`].
#[derive(Clone, Debug)]
pub struct Deliberation {
    /// Final decision
    pub approved: bool,
    /// Pre-check outcome
    pub screening: Screening,
    /// Committed receipt; `None` when the pre-check stopped the proposal
    pub receipt: Option<Receipt>,
}

impl Deliberation {
    fn gated(screening: Screening) -> Self {
        Self {
            approved: false,
            screening,
            receipt: None,
        }
    }

    /// Whether the proposal was stopped before scoring.
    pub fn was_gated(&self) -> bool {
        !self.screening.passed()
    }
}

/// Council metrics.
#[derive(Clone, Debug, Default)]
pub struct CouncilMetrics {
    /// Deliberations that produced a receipt
    pub total_deliberations: u64,
    /// Approved proposals
    pub approved: u64,
    /// Fully deliberated but not approved
    pub refined: u64,
    /// Receipts carrying at least one veto
    pub vetoed: u64,
    /// Proposals stopped by the pre-check or override
    pub gated: u64,
    /// Running mean of recorded aggregate valence
    pub average_valence: f64,
}

/// Flag a caller can set to abandon score collection.
///
/// Checked before each participant is asked. The council never clears it;
/// call [`CancellationFlag::reset`] before the next deliberation.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Consensus council bound to a roster and a receipt store.
pub struct Council<S: ReceiptStore> {
    roster: Vec<String>,
    config: CouncilConfig,
    store: S,
    pre_check: Box<dyn PreCheck>,
    override_authority: Option<Box<dyn OverrideAuthority>>,
    cancellation: CancellationFlag,
    metrics: CouncilMetrics,
}

impl Council<JsonFileStore> {
    /// Open a council on the receipt file named in `config`.
    pub fn open(roster: Vec<String>, config: CouncilConfig) -> Result<Self> {
        config.validate()?;
        let store = if config.verify_on_load {
            JsonFileStore::open_verified(&config.receipt_file)?
        } else {
            JsonFileStore::open(&config.receipt_file)?
        };
        Self::new(roster, config, store)
    }
}

impl<S: ReceiptStore> Council<S> {
    /// Create a new council.
    pub fn new(roster: Vec<String>, config: CouncilConfig, store: S) -> Result<Self> {
        validate_roster(&roster)?;
        config.validate()?;

        info!(
            members = roster.len(),
            threshold = config.threshold,
            hash_mode = ?config.hash_mode,
            receipts = store.len(),
            "council convened"
        );

        Ok(Self {
            roster,
            config,
            store,
            pre_check: Box::new(NoPreCheck),
            override_authority: None,
            cancellation: CancellationFlag::default(),
            metrics: CouncilMetrics::default(),
        })
    }

    /// Replace the pre-check.
    pub fn with_pre_check(mut self, pre_check: impl PreCheck + 'static) -> Self {
        self.pre_check = Box::new(pre_check);
        self
    }

    /// Install an override authority.
    pub fn with_override(mut self, authority: impl OverrideAuthority + 'static) -> Self {
        self.override_authority = Some(Box::new(authority));
        self
    }

    /// Deliberate on a proposal.
    ///
    /// Returns a gated [`Deliberation`] without a receipt when the pre-check
    /// or override stops the proposal. Otherwise every participant is asked
    /// in roster order, the decision is sealed into a receipt, and the
    /// receipt is appended to the store before returning.
    pub fn deliberate(
        &mut self,
        proposal: Proposal,
        scores: &mut dyn ScoreSource,
        fork_context: Option<&str>,
    ) -> Result<Deliberation> {
        info!(
            proposal = %proposal.description,
            fork = fork_context.unwrap_or("unified"),
            "deliberation started"
        );

        // 1. Gate
        let screening = self.screen(&proposal);
        if !screening.passed() {
            info!(screening = ?screening, "proposal stopped at pre-check, no receipt");
            self.metrics.gated += 1;
            return Ok(Deliberation::gated(screening));
        }

        // 2. Collect and validate every ballot
        let votes = self.collect_votes(&proposal, scores)?;

        // 3-4. Aggregate and decide
        let result: Tally = tally(votes.values());
        let approved = result.approves(self.config.threshold);
        debug!(
            aggregate = result.aggregate_valence,
            has_veto = result.has_veto,
            approved,
            "votes tallied"
        );

        // 5. Seal and commit
        let receipt = Receipt {
            timestamp: self.next_timestamp(),
            fork_context: fork_context.map(str::to_string),
            proposal,
            votes,
            avg_valence: result.recorded_valence(),
            has_veto: result.has_veto,
            approved,
            previous_hash: self.config.hash_mode.link_after(self.store.last()),
            receipt_hash: Hash256::zero(),
        }
        .seal()?;

        if let Err(e) = self.store.append(receipt.clone()) {
            warn!(error = %e, "decision computed but not committed");
            return Err(e);
        }

        self.update_metrics(&receipt);
        info!(
            approved,
            avg_valence = receipt.avg_valence,
            has_veto = receipt.has_veto,
            receipt_hash = %receipt.receipt_hash,
            receipts = self.store.len(),
            "receipt committed"
        );

        Ok(Deliberation {
            approved,
            screening,
            receipt: Some(receipt),
        })
    }

    fn screen(&mut self, proposal: &Proposal) -> Screening {
        if let Some(authority) = &self.override_authority {
            if authority.halt(proposal) {
                return Screening::Overridden("override authority halted the proposal".into());
            }
        }
        self.pre_check.screen(proposal)
    }

    fn collect_votes(
        &self,
        proposal: &Proposal,
        scores: &mut dyn ScoreSource,
    ) -> Result<BTreeMap<String, Vote>> {
        let started = Instant::now();
        let timeout = self.config.collection_timeout();
        let mut votes = BTreeMap::new();

        for participant in &self.roster {
            if self.cancellation.is_cancelled() {
                warn!(participant = %participant, "score collection cancelled");
                return Err(Error::Cancelled);
            }

            let ballot = scores.collect(participant, proposal, &self.config.criteria)?;

            if let Some(limit) = timeout {
                let elapsed = started.elapsed();
                if elapsed > limit {
                    warn!(participant = %participant, "score collection timed out");
                    return Err(Error::CollectionTimedOut {
                        elapsed_ms: elapsed.as_millis(),
                        limit_ms: limit.as_millis(),
                    });
                }
            }

            let vote = validate_ballot(participant, &self.config.criteria, ballot)?;
            debug!(participant = %participant, valence = vote.valence, veto = vote.veto, "vote recorded");
            votes.insert(participant.clone(), vote);
        }

        Ok(votes)
    }

    /// Wall-clock time, never earlier than the last receipt's.
    fn next_timestamp(&self) -> Timestamp {
        let current = now();
        match self.store.last() {
            Some(last) if last.timestamp > current => last.timestamp,
            _ => current,
        }
    }

    fn update_metrics(&mut self, receipt: &Receipt) {
        let m = &mut self.metrics;
        m.total_deliberations += 1;
        if receipt.approved {
            m.approved += 1;
        } else {
            m.refined += 1;
        }
        if receipt.has_veto {
            m.vetoed += 1;
        }
        m.average_valence = (m.average_valence * (m.total_deliberations - 1) as f64
            + receipt.avg_valence)
            / m.total_deliberations as f64;
    }

    /// Committed receipts, oldest first.
    pub fn receipts(&self) -> &[Receipt] {
        self.store.receipts()
    }

    /// Verify every receipt hash and chain link.
    pub fn verify_chain(&self) -> Result<ChainVerification> {
        verify_chain(self.store.receipts())
    }

    /// Handle for cancelling score collection from elsewhere.
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Get council metrics.
    pub fn metrics(&self) -> &CouncilMetrics {
        &self.metrics
    }

    /// Participants in roster order.
    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Approval threshold.
    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Scored criteria.
    pub fn criteria(&self) -> &[String] {
        &self.config.criteria
    }

    /// Council configuration.
    pub fn config(&self) -> &CouncilConfig {
        &self.config
    }

    /// Underlying receipt store, read-only.
    pub fn store(&self) -> &S {
        &self.store
    }
}
