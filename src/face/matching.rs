use super::similarity::score;
use super::summary::{FeatureSummary, SummaryError};
use super::UNCLEAR;

/// Candidates must score strictly above this to be reported as a match.
pub const MATCH_THRESHOLD: f64 = 0.6;
/// Age gap beyond which a candidate is never scored.
const MAX_AGE_GAP: f64 = 20.0;

/// A stored record carrying one serialized feature summary.
pub trait Candidate {
    fn id(&self) -> &str;

    fn stored_summary(&self) -> Result<FeatureSummary, SummaryError>;

    fn label(&self) -> String {
        self.id().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Gender,
    Age,
}

/// Hard demographic rules applied before any scoring.
pub fn exclusion(query: &FeatureSummary, candidate: &FeatureSummary) -> Option<Exclusion> {
    if let (Some(a), Some(b)) = (&query.gender, &candidate.gender) {
        if a != b && a != UNCLEAR && b != UNCLEAR {
            return Some(Exclusion::Gender);
        }
    }
    if let (Some(a), Some(b)) = (query.age, candidate.age) {
        if (a - b).abs() > MAX_AGE_GAP {
            return Some(Exclusion::Age);
        }
    }
    None
}

#[derive(Debug)]
pub struct Match<'a, C> {
    pub candidate: &'a C,
    pub similarity: f64,
}

#[derive(Debug)]
pub struct MatchResult<'a, C> {
    pub matches: Vec<Match<'a, C>>,
}

impl<'a, C> MatchResult<'a, C> {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &'a C> + '_ {
        self.matches.iter().map(|m| m.candidate)
    }

    pub fn similarities(&self) -> Vec<f64> {
        self.matches.iter().map(|m| m.similarity).collect()
    }
}

pub fn rank<'a, C: Candidate>(
    query: &FeatureSummary,
    candidates: &'a [C],
    threshold: f64,
) -> MatchResult<'a, C> {
    let scored = candidates
        .iter()
        .map(|candidate| (candidate, candidate.stored_summary()))
        .filter_map(|(candidate, stored)| match stored {
            Ok(summary) => Some((candidate, summary)),
            Err(e) => {
                warn!("skip candidate {}: {}", candidate.id(), e);
                None
            }
        })
        .filter(|(candidate, summary)| match exclusion(query, summary) {
            Some(reason) => {
                debug!("skip candidate {}: {:?} mismatch", candidate.id(), reason);
                false
            }
            None => true,
        })
        .map(|(candidate, summary)| {
            let similarity = score(query, &summary);
            debug!(
                "candidate {} similarity: {:.1}%",
                candidate.label(),
                similarity * 100.0
            );
            (candidate, similarity)
        });

    let matches = select(scored, threshold)
        .into_iter()
        .map(|(candidate, similarity)| Match {
            candidate,
            similarity,
        })
        .collect();

    MatchResult { matches }
}

/// Keeps scores strictly above `threshold`, best first. Equal scores keep their input order.
fn select<T>(scored: impl IntoIterator<Item = (T, f64)>, threshold: f64) -> Vec<(T, f64)> {
    let mut kept = scored
        .into_iter()
        .filter(|(_, similarity)| *similarity > threshold)
        .collect::<Vec<_>>();
    kept.sort_by(|a, b| b.1.total_cmp(&a.1));
    kept
}
