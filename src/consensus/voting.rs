//! Multi-criteria valence voting.
//!
//! Each participant scores every criterion in [0, 1] and may veto. A vote's
//! valence is the mean of its scores; the council's aggregate valence is
//! the mean of the vote valences.

use crate::core::{Error, Result};
use crate::receipt::record::mean;
use crate::receipt::{Proposal, Vote};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Decimal digits kept in the recorded aggregate valence.
pub const VALENCE_PRECISION: i32 = 4;

/// How far below the threshold a mean may land, in units of
/// `f64::EPSILON * threshold`, and still count as reaching it.
///
/// Covers the rounding left by the compensated mean of decimal scores, so
/// three 0.95 votes reach 0.95. Anything a real score can express below the
/// threshold is rejected.
pub const THRESHOLD_ULPS: f64 = 4.0;

/// Raw submission from a score source, not yet validated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ballot {
    /// Criterion scores
    pub scores: BTreeMap<String, f64>,
    /// Veto flag
    pub veto: bool,
}

impl Ballot {
    /// Create an empty ballot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion score.
    pub fn with_score(mut self, criterion: &str, score: f64) -> Self {
        self.scores.insert(criterion.to_string(), score);
        self
    }

    /// Set the veto flag.
    pub fn with_veto(mut self, veto: bool) -> Self {
        self.veto = veto;
        self
    }

    /// Ballot giving the same score on every criterion.
    pub fn uniform(criteria: &[String], score: f64, veto: bool) -> Self {
        Self {
            scores: criteria.iter().map(|c| (c.clone(), score)).collect(),
            veto,
        }
    }
}

/// Supplies one ballot per participant per proposal.
pub trait ScoreSource {
    /// Collect `participant`'s ballot on `proposal` over `criteria`.
    fn collect(
        &mut self,
        participant: &str,
        proposal: &Proposal,
        criteria: &[String],
    ) -> Result<Ballot>;
}

/// Turn a ballot into a vote, rejecting missing, extra, or out-of-range scores.
pub fn validate_ballot(participant: &str, criteria: &[String], ballot: Ballot) -> Result<Vote> {
    for criterion in criteria {
        let score = ballot
            .scores
            .get(criterion)
            .ok_or_else(|| Error::invalid_score(participant, criterion, "score missing"))?;

        if !score.is_finite() || !(0.0..=1.0).contains(score) {
            return Err(Error::invalid_score(
                participant,
                criterion,
                format!("{} is outside [0, 1]", score),
            ));
        }
    }

    if let Some(extra) = ballot.scores.keys().find(|k| !criteria.contains(*k)) {
        return Err(Error::invalid_score(
            participant,
            extra,
            "criterion is not scored by this council",
        ));
    }

    Ok(Vote::from_scores(ballot.scores, ballot.veto))
}

/// Aggregate of a full set of votes.
#[derive(Clone, Debug)]
pub struct Tally {
    /// Unrounded mean of vote valences
    pub aggregate_valence: f64,
    /// Whether any vote carried a veto
    pub has_veto: bool,
    /// Number of votes counted
    pub vote_count: usize,
}

impl Tally {
    /// Aggregate valence as recorded on receipts.
    pub fn recorded_valence(&self) -> f64 {
        round_valence(self.aggregate_valence)
    }

    /// Apply the decision rule.
    pub fn approves(&self, threshold: f64) -> bool {
        !self.has_veto && meets_threshold(self.aggregate_valence, threshold)
    }
}

/// Tally a set of votes.
pub fn tally<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Tally {
    let mut valences = Vec::new();
    let mut has_veto = false;

    for vote in votes {
        valences.push(vote.valence);
        has_veto |= vote.veto;
    }

    let count = valences.len();
    let aggregate_valence = mean(valences).clamp(0.0, 1.0);

    Tally {
        aggregate_valence,
        has_veto,
        vote_count: count,
    }
}

/// Round a valence to the recorded precision.
pub fn round_valence(valence: f64) -> f64 {
    let scale = 10f64.powi(VALENCE_PRECISION);
    (valence * scale).round() / scale
}

/// Inclusive threshold comparison.
pub fn meets_threshold(valence: f64, threshold: f64) -> bool {
    valence >= threshold || threshold - valence <= THRESHOLD_ULPS * f64::EPSILON * threshold
}

/// Score source replaying prepared ballots, for tests and batch runs.
#[derive(Clone, Debug, Default)]
pub struct ScriptedScoreSource {
    ballots: HashMap<String, VecDeque<Ballot>>,
    fallback: Option<Ballot>,
    requests: Vec<String>,
}

impl ScriptedScoreSource {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a ballot for a participant.
    pub fn with_ballot(mut self, participant: &str, ballot: Ballot) -> Self {
        self.push(participant, ballot);
        self
    }

    /// Ballot used when a participant has nothing queued.
    pub fn with_fallback(mut self, ballot: Ballot) -> Self {
        self.fallback = Some(ballot);
        self
    }

    /// Queue a ballot for a participant.
    pub fn push(&mut self, participant: &str, ballot: Ballot) {
        self.ballots
            .entry(participant.to_string())
            .or_default()
            .push_back(ballot);
    }

    /// Participants asked so far, in order.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }
}

impl ScoreSource for ScriptedScoreSource {
    fn collect(
        &mut self,
        participant: &str,
        _proposal: &Proposal,
        criteria: &[String],
    ) -> Result<Ballot> {
        self.requests.push(participant.to_string());

        let queued = self
            .ballots
            .get_mut(participant)
            .and_then(|queue| queue.pop_front());

        queued.or_else(|| self.fallback.clone()).ok_or_else(|| {
            let criterion = criteria.first().map(String::as_str).unwrap_or("*");
            Error::invalid_score(participant, criterion, "no ballot submitted")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> Vec<String> {
        vec!["joy".to_string(), "mercy".to_string(), "sustain".to_string()]
    }

    #[test]
    fn test_validate_ballot_derives_valence() {
        let ballot = Ballot::new()
            .with_score("joy", 0.9)
            .with_score("mercy", 0.6)
            .with_score("sustain", 0.9);
        let vote = validate_ballot("Sherif", &criteria(), ballot).unwrap();
        assert!((vote.valence - 0.8).abs() < 1e-12);
        assert!(!vote.veto);
    }

    #[test]
    fn test_missing_score_rejected() {
        let ballot = Ballot::new().with_score("joy", 0.9).with_score("mercy", 0.9);
        let err = validate_ballot("Grok", &criteria(), ballot).unwrap_err();
        match err {
            Error::InvalidScore {
                participant,
                criterion,
                ..
            } => {
                assert_eq!(participant, "Grok");
                assert_eq!(criterion, "sustain");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        for bad in [1.5, -0.01, f64::NAN, f64::INFINITY] {
            let ballot = Ballot::uniform(&criteria(), 0.5, false).with_score("mercy", bad);
            let err = validate_ballot("A", &criteria(), ballot).unwrap_err();
            assert!(
                matches!(err, Error::InvalidScore { ref criterion, .. } if criterion == "mercy")
            );
        }
    }

    #[test]
    fn test_bounds_accepted() {
        let ballot = Ballot::new()
            .with_score("joy", 0.0)
            .with_score("mercy", 1.0)
            .with_score("sustain", 0.5);
        assert!(validate_ballot("A", &criteria(), ballot).is_ok());
    }

    #[test]
    fn test_extra_criterion_rejected() {
        let ballot = Ballot::uniform(&criteria(), 0.5, false).with_score("vibes", 0.5);
        let err = validate_ballot("A", &criteria(), ballot).unwrap_err();
        assert!(matches!(err, Error::InvalidScore { ref criterion, .. } if criterion == "vibes"));
    }

    #[test]
    fn test_tally_mean_of_means() {
        let votes: Vec<Vote> = [0.95, 0.96, 0.94]
            .iter()
            .map(|v| validate_ballot("x", &criteria(), Ballot::uniform(&criteria(), *v, false)))
            .collect::<Result<_>>()
            .unwrap();

        let result = tally(&votes);
        assert_eq!(result.vote_count, 3);
        assert!((result.aggregate_valence - 0.95).abs() < 1e-12);
        assert_eq!(result.recorded_valence(), 0.95);
        assert!(!result.has_veto);
        assert!(result.approves(0.9));
    }

    #[test]
    fn test_single_veto_blocks() {
        let mut votes: Vec<Vote> = (0..4)
            .map(|_| Vote::from_scores(Ballot::uniform(&criteria(), 1.0, false).scores, false))
            .collect();
        votes.push(Vote::from_scores(
            Ballot::uniform(&criteria(), 1.0, true).scores,
            true,
        ));

        let result = tally(&votes);
        assert_eq!(result.aggregate_valence, 1.0);
        assert!(result.has_veto);
        assert!(!result.approves(0.0));
    }

    #[test]
    fn test_threshold_inclusive() {
        assert!(meets_threshold(0.95, 0.95));
        assert!(meets_threshold(0.0, 0.0));
        assert!(meets_threshold(1.0, 1.0));

        let three = |v: f64| {
            let vote = Vote::from_scores(Ballot::uniform(&criteria(), v, false).scores, false);
            tally(&[vote.clone(), vote.clone(), vote])
        };
        assert!(three(0.95).approves(0.95));
        assert!(three(0.97).approves(0.97));
    }

    #[test]
    fn test_just_below_threshold_rejected() {
        assert!(!meets_threshold(0.9999999995, 1.0));
        assert!(!meets_threshold(1.0 - 1e-12, 1.0));
        assert!(!meets_threshold(0.9999, 1.0));
        assert!(!meets_threshold(0.9499999995, 0.95));
        assert!(!meets_threshold(0.9499, 0.95));
        assert!(!meets_threshold(1e-9, 1e-8));
    }

    #[test]
    fn test_round_valence() {
        assert_eq!(round_valence(0.123456), 0.1235);
        assert_eq!(round_valence(0.9499999999999998), 0.95);
        assert_eq!(round_valence(1.0), 1.0);
    }

    #[test]
    fn test_scripted_source_replays_in_order() {
        let proposal = Proposal::new("test");
        let mut source = ScriptedScoreSource::new()
            .with_ballot("A", Ballot::uniform(&criteria(), 0.1, false))
            .with_ballot("A", Ballot::uniform(&criteria(), 0.2, true));

        let first = source.collect("A", &proposal, &criteria()).unwrap();
        let second = source.collect("A", &proposal, &criteria()).unwrap();
        assert_eq!(first.scores["joy"], 0.1);
        assert!(second.veto);
        assert!(source.collect("A", &proposal, &criteria()).is_err());
        assert_eq!(source.requests(), &["A", "A", "A"]);
    }

    #[test]
    fn test_scripted_source_fallback() {
        let proposal = Proposal::new("test");
        let mut source =
            ScriptedScoreSource::new().with_fallback(Ballot::uniform(&criteria(), 0.7, false));
        let ballot = source.collect("Anyone", &proposal, &criteria()).unwrap();
        assert_eq!(ballot.scores.len(), 3);
    }
}
