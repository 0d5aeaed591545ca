pub mod error;
pub mod model;
pub mod ranking;
pub mod scoring;
pub mod weighting;

pub use error::{ConfigurationError, ModelError};
pub use model::answer_key::AnswerKey;
pub use model::candidate::{Candidate, CandidatePool};
pub use model::scored::ScoredCandidate;
pub use model::subject::SubjectGroups;
pub use ranking::{RankedEntry, RankedResult, RankingPolicy, Standings};
pub use scoring::{score_block, score_candidate};
pub use weighting::difficulty::{DifficultyParams, DifficultyWeights};
pub use weighting::points::{POINTS_PER_GROUP, PointTable};

pub struct ExamInfo;

impl ExamInfo {
    pub const fn name() -> &'static str {
        "exam-rank"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
