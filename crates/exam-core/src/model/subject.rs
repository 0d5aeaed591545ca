use std::ops::Range;

use crate::error::ConfigurationError;

/// Contiguous question ranges, each normalized to its own 100 points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroups {
    ranges: Vec<Range<usize>>,
}

impl SubjectGroups {
    /// Lays groups out back to back starting at question 0.
    pub fn from_sizes(sizes: &[usize]) -> Result<Self, ConfigurationError> {
        if sizes.is_empty() {
            return Err(ConfigurationError::NoGroups);
        }

        let mut ranges = Vec::with_capacity(sizes.len());
        let mut start = 0usize;
        for (group, &size) in sizes.iter().enumerate() {
            if size == 0 {
                return Err(ConfigurationError::EmptyGroup { group });
            }
            ranges.push(start..start + size);
            start += size;
        }

        Ok(Self { ranges })
    }

    pub fn ensure_covers(&self, questions: usize) -> Result<(), ConfigurationError> {
        let covered = self.question_count();
        if covered != questions {
            return Err(ConfigurationError::Coverage { covered, questions });
        }
        Ok(())
    }

    pub fn question_count(&self) -> usize {
        self.ranges.last().map(|range| range.end).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn group_of(&self, question: usize) -> Option<usize> {
        self.ranges
            .iter()
            .position(|range| range.contains(&question))
    }
}

impl Default for SubjectGroups {
    /// Three subjects of ten questions each.
    fn default() -> Self {
        Self {
            ranges: vec![0..10, 10..20, 20..30],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SubjectGroups;
    use crate::error::ConfigurationError;

    #[test]
    fn sizes_become_contiguous_ranges() {
        let groups = SubjectGroups::from_sizes(&[2, 3, 1]).unwrap();
        assert_eq!(groups.ranges(), &[0..2, 2..5, 5..6]);
        assert_eq!(groups.question_count(), 6);
        assert_eq!(groups.group_of(4), Some(1));
        assert_eq!(groups.group_of(6), None);
    }

    #[test]
    fn default_matches_three_subjects_of_ten() {
        let groups = SubjectGroups::default();
        assert_eq!(groups, SubjectGroups::from_sizes(&[10, 10, 10]).unwrap());
        groups.ensure_covers(30).expect("covers 30 questions");
    }

    #[test]
    fn rejects_empty_groups() {
        assert_eq!(
            SubjectGroups::from_sizes(&[4, 0]),
            Err(ConfigurationError::EmptyGroup { group: 1 })
        );
        assert_eq!(
            SubjectGroups::from_sizes(&[]),
            Err(ConfigurationError::NoGroups)
        );
    }

    #[test]
    fn coverage_mismatch_is_reported() {
        let groups = SubjectGroups::from_sizes(&[10, 10]).unwrap();
        assert_eq!(
            groups.ensure_covers(30),
            Err(ConfigurationError::Coverage {
                covered: 20,
                questions: 30
            })
        );
    }
}
