use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::answer_key::AnswerKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u64,
    pub variant: u32,
    pub responses: Vec<char>,
}

impl Candidate {
    pub fn new(id: u64, variant: u32, responses: Vec<char>) -> Self {
        Self {
            id,
            variant,
            responses,
        }
    }

    /// Convenience constructor used by fixtures: `Candidate::from_responses(7, 303, "ABCD")`.
    pub fn from_responses(id: u64, variant: u32, responses: &str) -> Self {
        Self::new(id, variant, responses.chars().collect())
    }

    pub fn answered_correctly(&self, key: &AnswerKey, question: usize) -> bool {
        self.responses
            .get(question)
            .is_some_and(|response| key.is_correct(question, *response))
    }
}

/// Candidates retained for a run, in input order.
///
/// The capacity is a hard limit: pushing past it is an error rather than a
/// silent truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    questions: usize,
    capacity: usize,
}

impl CandidatePool {
    pub fn new(questions: usize, capacity: usize) -> Self {
        Self {
            candidates: Vec::new(),
            questions,
            capacity,
        }
    }

    pub fn push(&mut self, candidate: Candidate) -> Result<(), ModelError> {
        if candidate.responses.len() != self.questions {
            return Err(ModelError::ResponseCount {
                id: candidate.id,
                found: candidate.responses.len(),
                expected: self.questions,
            });
        }
        if self.candidates.len() >= self.capacity {
            return Err(ModelError::CapacityExceeded {
                capacity: self.capacity,
                id: candidate.id,
            });
        }
        self.candidates.push(candidate);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn questions(&self) -> usize {
        self.questions
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.candidates
    }
}
