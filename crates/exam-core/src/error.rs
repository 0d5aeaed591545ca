use thiserror::Error;

/// Violations of the in-memory data model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("answer key must contain at least one symbol")]
    EmptyKey,
    #[error("candidate {id} has {found} responses but the exam has {expected} questions")]
    ResponseCount {
        id: u64,
        found: usize,
        expected: usize,
    },
    #[error("candidate pool capacity of {capacity} exceeded by candidate {id}")]
    CapacityExceeded { capacity: usize, id: u64 },
}

/// Settings that would make point values meaningless (NaN or unnormalized).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("at least one subject group is required")]
    NoGroups,
    #[error("subject group {group} contains no questions")]
    EmptyGroup { group: usize },
    #[error("subject groups cover {covered} questions but the exam has {questions}")]
    Coverage { covered: usize, questions: usize },
    #[error("subject group {group} has a total difficulty of {total}")]
    ZeroGroupTotal { group: usize, total: f64 },
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidConstant { name: &'static str, value: f64 },
}
