use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::answer_key::AnswerKey;
use crate::model::candidate::Candidate;

pub const DEFAULT_BASE_DIFFICULTY: f64 = 4.0;
pub const DEFAULT_UNANSWERED_DIFFICULTY: f64 = 10.0;

/// Calibration constants for the difficulty estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyParams {
    /// Weight assigned to the most-answered question.
    pub base_difficulty: f64,
    /// Weight assigned to a question nobody answered correctly.
    pub unanswered_difficulty: f64,
}

impl Default for DifficultyParams {
    fn default() -> Self {
        Self {
            base_difficulty: DEFAULT_BASE_DIFFICULTY,
            unanswered_difficulty: DEFAULT_UNANSWERED_DIFFICULTY,
        }
    }
}

impl DifficultyParams {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("base_difficulty", self.base_difficulty),
            ("unanswered_difficulty", self.unanswered_difficulty),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::InvalidConstant { name, value });
            }
        }
        Ok(())
    }
}

/// Per-question difficulty, recomputed from the full pool on every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyWeights {
    weights: Vec<f64>,
}

impl DifficultyWeights {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight(&self, question: usize) -> Option<f64> {
        self.weights.get(question).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }
}

/// Number of candidates that matched the key, per question.
pub fn count_correct(candidates: &[Candidate], key: &AnswerKey) -> Vec<usize> {
    let mut counts = vec![0usize; key.len()];
    for candidate in candidates {
        for (question, count) in counts.iter_mut().enumerate() {
            if candidate.answered_correctly(key, question) {
                *count += 1;
            }
        }
    }
    counts
}

/// Weights questions inversely to how many candidates got them right,
/// relative to the most-answered question which receives `base_difficulty`.
pub fn estimate_difficulty(correct_counts: &[usize], params: &DifficultyParams) -> DifficultyWeights {
    let max_correct = correct_counts.iter().copied().max().unwrap_or(0);

    let weights = correct_counts
        .iter()
        .map(|&count| {
            if count > 0 {
                (max_correct as f64 / count as f64) * params.base_difficulty
            } else {
                params.unanswered_difficulty
            }
        })
        .collect();

    DifficultyWeights::new(weights)
}
