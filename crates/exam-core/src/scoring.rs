use crate::model::answer_key::AnswerKey;
use crate::model::candidate::Candidate;
use crate::model::scored::ScoredCandidate;
use crate::weighting::points::PointTable;

/// Sums the point value of every question the candidate matched exactly.
pub fn score_candidate(
    candidate: &Candidate,
    key: &AnswerKey,
    points: &PointTable,
) -> ScoredCandidate {
    let score: f64 = (0..key.len())
        .filter(|&question| candidate.answered_correctly(key, question))
        .map(|question| points.value(question))
        .sum();
    ScoredCandidate::new(candidate.id, score)
}

/// Scores a block in order. Only reads shared data, so blocks can be scored
/// on any worker without coordination.
pub fn score_block(
    block: &[Candidate],
    key: &AnswerKey,
    points: &PointTable,
) -> Vec<ScoredCandidate> {
    block
        .iter()
        .map(|candidate| score_candidate(candidate, key, points))
        .collect()
}
