use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use exam_core::{AnswerKey, Candidate, CandidatePool, ModelError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Symbol recorded for a response left blank; never matches a key symbol.
pub const BLANK_RESPONSE: char = ' ';

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {what} at {path:?}: {source}")]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("answer key has {found} symbols but the exam has {expected} questions")]
    ShortKey { found: usize, expected: usize },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Which records are retained from the responses source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFilter {
    pub questions: usize,
    pub variant: u32,
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadReport {
    pub retained: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedPool {
    pub pool: CandidatePool,
    pub report: LoadReport,
}

/// Where the coordinator reads the answer key and the candidate pool from.
pub trait ExamSource: Send + Sync {
    fn answer_key(&self, questions: usize) -> Result<AnswerKey, LoadError>;
    fn candidates(&self, filter: &RecordFilter) -> Result<LoadedPool, LoadError>;
}

/// Comma-separated files: a key file and one responses record per line.
#[derive(Debug, Clone)]
pub struct FileSource {
    answer_key: PathBuf,
    responses: PathBuf,
}

impl FileSource {
    pub fn new(answer_key: impl Into<PathBuf>, responses: impl Into<PathBuf>) -> Self {
        Self {
            answer_key: answer_key.into(),
            responses: responses.into(),
        }
    }
}

impl ExamSource for FileSource {
    fn answer_key(&self, questions: usize) -> Result<AnswerKey, LoadError> {
        let text = read_text("answer key", &self.answer_key)?;
        parse_answer_key(&text, questions)
    }

    fn candidates(&self, filter: &RecordFilter) -> Result<LoadedPool, LoadError> {
        let text = read_text("responses", &self.responses)?;
        let loaded = parse_responses(&text, filter)?;
        info!(
            path = %self.responses.display(),
            retained = loaded.report.retained,
            skipped = loaded.report.skipped,
            "loaded candidate pool"
        );
        Ok(loaded)
    }
}

/// The same formats held in memory; used by tests and benchmarks.
#[derive(Debug, Clone)]
pub struct MemorySource {
    answer_key: String,
    responses: String,
}

impl MemorySource {
    pub fn new(answer_key: impl Into<String>, responses: impl Into<String>) -> Self {
        Self {
            answer_key: answer_key.into(),
            responses: responses.into(),
        }
    }
}

impl ExamSource for MemorySource {
    fn answer_key(&self, questions: usize) -> Result<AnswerKey, LoadError> {
        parse_answer_key(&self.answer_key, questions)
    }

    fn candidates(&self, filter: &RecordFilter) -> Result<LoadedPool, LoadError> {
        parse_responses(&self.responses, filter)
    }
}

fn read_text(what: &'static str, path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Read {
        what,
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the first `questions` symbols. Commas and whitespace between them
/// are optional, so `A,B,C` and `ABC` give the same key.
pub fn parse_answer_key(text: &str, questions: usize) -> Result<AnswerKey, LoadError> {
    let symbols: Vec<char> = text
        .chars()
        .filter(|&c| c != ',' && !c.is_whitespace())
        .take(questions)
        .collect();

    if symbols.len() < questions {
        return Err(LoadError::ShortKey {
            found: symbols.len(),
            expected: questions,
        });
    }
    Ok(AnswerKey::new(symbols)?)
}

/// Parses `id,variant,r1,...,rQ` records, keeping those of the requested
/// variant. Malformed records and repeated identifiers are skipped;
/// exceeding the capacity is fatal.
pub fn parse_responses(text: &str, filter: &RecordFilter) -> Result<LoadedPool, LoadError> {
    let mut pool = CandidatePool::new(filter.questions, filter.capacity);
    let mut report = LoadReport::default();
    let mut seen = HashSet::new();

    for (line_number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line, filter) {
            Some(candidate) if !seen.insert(candidate.id) => {
                warn!(
                    line = line_number + 1,
                    id = candidate.id,
                    "skipping record with duplicate identifier"
                );
                report.skipped += 1;
            }
            Some(candidate) => {
                pool.push(candidate)?;
                report.retained += 1;
            }
            None => {
                debug!(line = line_number + 1, "skipping record");
                report.skipped += 1;
            }
        }
    }

    Ok(LoadedPool { pool, report })
}

fn parse_record(line: &str, filter: &RecordFilter) -> Option<Candidate> {
    let mut fields = line.split(',').map(str::trim);
    let id = fields.next()?.parse::<u64>().ok()?;
    let variant = fields.next()?.parse::<u32>().ok()?;
    if variant != filter.variant {
        return None;
    }

    let responses: Vec<char> = fields
        .take(filter.questions)
        .map(|field| field.chars().next().unwrap_or(BLANK_RESPONSE))
        .collect();
    if responses.len() < filter.questions {
        return None;
    }
    Some(Candidate::new(id, variant, responses))
}
