use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::scored::ScoredCandidate;

pub const DEFAULT_CLASSIFICATION_CUTOFF: usize = 10;
pub const DEFAULT_REASSIGNMENT_CUT_SCORE: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingPolicy {
    /// Number of top-ranked candidates admitted to the classified list.
    pub classification_cutoff: usize,
    /// Minimum score for reassignment eligibility below the cutoff.
    pub reassignment_cut_score: f64,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            classification_cutoff: DEFAULT_CLASSIFICATION_CUTOFF,
            reassignment_cut_score: DEFAULT_REASSIGNMENT_CUT_SCORE,
        }
    }
}

/// A row of one of the output lists. `position` is the 1-based rank in the
/// general ranking, so it is shared across all three views.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedEntry {
    pub position: usize,
    pub id: u64,
    pub score: f64,
}

/// Score descending, then identifier ascending.
pub fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

/// Every scored candidate in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    entries: Vec<ScoredCandidate>,
}

impl RankedResult {
    pub fn from_scores(mut scores: Vec<ScoredCandidate>) -> Self {
        scores.sort_by(rank_order);
        Self { entries: scores }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn general(&self) -> &[ScoredCandidate] {
        &self.entries
    }

    pub fn classified(&self, cutoff: usize) -> &[ScoredCandidate] {
        &self.entries[..cutoff.min(self.entries.len())]
    }

    pub fn entries(&self) -> impl Iterator<Item = RankedEntry> + '_ {
        ranked_entries(&self.entries)
    }

    /// Candidates ranked below the cutoff who still reach the cut score.
    pub fn reassignment_eligible(&self, policy: &RankingPolicy) -> Vec<RankedEntry> {
        self.entries()
            .skip(policy.classification_cutoff)
            .filter(|entry| entry.score >= policy.reassignment_cut_score)
            .collect()
    }

    pub fn standings(&self, policy: &RankingPolicy) -> Standings {
        Standings {
            classified: ranked_entries(self.classified(policy.classification_cutoff)).collect(),
            reassignment: self.reassignment_eligible(policy),
            general: self.entries().collect(),
        }
    }
}

/// Numbers a rank-ordered prefix from position 1.
fn ranked_entries(sorted: &[ScoredCandidate]) -> impl Iterator<Item = RankedEntry> + '_ {
    sorted
        .iter()
        .enumerate()
        .map(|(index, scored)| RankedEntry {
            position: index + 1,
            id: scored.id,
            score: scored.score,
        })
}

/// The three output lists, all projected from one [`RankedResult`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Standings {
    pub classified: Vec<RankedEntry>,
    pub reassignment: Vec<RankedEntry>,
    pub general: Vec<RankedEntry>,
}
