use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::subject::SubjectGroups;
use crate::weighting::difficulty::DifficultyWeights;

/// Points awarded by each subject group when every question is answered.
pub const POINTS_PER_GROUP: f64 = 100.0;

/// Point value of every question. Each subject group sums to [`POINTS_PER_GROUP`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointTable {
    values: Vec<f64>,
}

impl PointTable {
    /// Splits each group's 100 points proportionally to difficulty.
    ///
    /// Fails instead of producing NaN when a group's total weight is zero or
    /// when the groups do not cover exactly the weighted questions.
    pub fn normalize(
        weights: &DifficultyWeights,
        groups: &SubjectGroups,
    ) -> Result<Self, ConfigurationError> {
        groups.ensure_covers(weights.len())?;

        let weights = weights.as_slice();
        let mut values = vec![0.0; weights.len()];
        for (group, range) in groups.ranges().iter().enumerate() {
            let total: f64 = weights[range.clone()].iter().sum();
            if !total.is_finite() || total <= 0.0 {
                return Err(ConfigurationError::ZeroGroupTotal { group, total });
            }
            for question in range.clone() {
                values[question] = weights[question] / total * POINTS_PER_GROUP;
            }
        }

        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, question: usize) -> f64 {
        self.values.get(question).copied().unwrap_or(0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn group_total(&self, groups: &SubjectGroups, group: usize) -> Option<f64> {
        groups
            .ranges()
            .get(group)
            .map(|range| self.values[range.clone()].iter().sum())
    }
}
