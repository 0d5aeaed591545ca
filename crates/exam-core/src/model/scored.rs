use serde::{Deserialize, Serialize};

/// A candidate's final score. Created once by a scorer and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub id: u64,
    pub score: f64,
}

impl ScoredCandidate {
    pub const fn new(id: u64, score: f64) -> Self {
        Self { id, score }
    }
}
