use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// The ordered correct symbol for every question of the exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    symbols: Vec<char>,
}

impl AnswerKey {
    pub fn new(symbols: Vec<char>) -> Result<Self, ModelError> {
        if symbols.is_empty() {
            return Err(ModelError::EmptyKey);
        }
        Ok(Self { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, question: usize) -> Option<char> {
        self.symbols.get(question).copied()
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn is_correct(&self, question: usize, response: char) -> bool {
        self.symbol(question) == Some(response)
    }
}

impl FromStr for AnswerKey {
    type Err = ModelError;

    /// Builds a key from a compact string such as `"ABCDA"`; whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnswerKey::new(s.chars().filter(|c| !c.is_whitespace()).collect())
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}
