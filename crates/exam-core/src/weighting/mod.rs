pub mod difficulty;
pub mod points;

pub use difficulty::{DifficultyParams, DifficultyWeights, count_correct, estimate_difficulty};
pub use points::{POINTS_PER_GROUP, PointTable};
