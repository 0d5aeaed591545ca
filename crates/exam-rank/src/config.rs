use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

use exam_core::ranking::{DEFAULT_CLASSIFICATION_CUTOFF, DEFAULT_REASSIGNMENT_CUT_SCORE};
use exam_core::weighting::difficulty::{DEFAULT_BASE_DIFFICULTY, DEFAULT_UNANSWERED_DIFFICULTY};
use exam_core::{DifficultyParams, RankingPolicy, SubjectGroups};

const DEFAULT_QUESTIONS: usize = 30;
const DEFAULT_VARIANT: u32 = 303;
const DEFAULT_CAPACITY: usize = 200;
const DEFAULT_SUBJECT_SIZES: [usize; 3] = [10, 10, 10];
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root ranking configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RankConfig {
    pub run_id: String,
    #[serde(default)]
    pub exam: ExamConfig,
    #[serde(default)]
    pub weighting: WeightingConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub inputs: InputsConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RankConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: RankConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.exam.validate()?;
        self.weighting.validate()?;
        self.ranking.validate()?;
        if self.workers == 0 {
            return Err(ValidationError::InvalidField {
                field: "workers".to_string(),
                message: "at least one worker is required".to_string(),
            });
        }
        self.inputs.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            classified: resolve_template(&self.run_id, &self.outputs.classified),
            reassignment: resolve_template(&self.run_id, &self.outputs.reassignment),
            general: resolve_template(&self.run_id, &self.outputs.general),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// Shape of the exam and the candidate filter.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExamConfig {
    #[serde(default = "default_questions")]
    pub questions: usize,
    #[serde(default = "default_variant")]
    pub variant: u32,
    #[serde(default = "default_subject_sizes")]
    pub subject_sizes: Vec<usize>,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            questions: DEFAULT_QUESTIONS,
            variant: DEFAULT_VARIANT,
            subject_sizes: default_subject_sizes(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ExamConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.questions == 0 {
            return Err(ValidationError::InvalidField {
                field: "exam.questions".to_string(),
                message: "the exam needs at least one question".to_string(),
            });
        }

        if self.capacity == 0 {
            return Err(ValidationError::InvalidField {
                field: "exam.capacity".to_string(),
                message: "capacity must be greater than zero".to_string(),
            });
        }

        self.subject_groups()
            .and_then(|groups| groups.ensure_covers(self.questions))
            .map_err(|err| ValidationError::InvalidField {
                field: "exam.subject_sizes".to_string(),
                message: err.to_string(),
            })
    }

    pub fn subject_groups(&self) -> Result<SubjectGroups, exam_core::ConfigurationError> {
        SubjectGroups::from_sizes(&self.subject_sizes)
    }
}

fn default_questions() -> usize {
    DEFAULT_QUESTIONS
}

fn default_variant() -> u32 {
    DEFAULT_VARIANT
}

fn default_subject_sizes() -> Vec<usize> {
    DEFAULT_SUBJECT_SIZES.to_vec()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_workers() -> usize {
    1
}

/// Difficulty calibration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WeightingConfig {
    #[serde(default = "default_base_difficulty")]
    pub base_difficulty: f64,
    #[serde(default = "default_unanswered_difficulty")]
    pub unanswered_difficulty: f64,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            base_difficulty: DEFAULT_BASE_DIFFICULTY,
            unanswered_difficulty: DEFAULT_UNANSWERED_DIFFICULTY,
        }
    }
}

impl WeightingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        self.params()
            .validate()
            .map_err(|err| ValidationError::InvalidField {
                field: "weighting".to_string(),
                message: err.to_string(),
            })
    }

    pub fn params(&self) -> DifficultyParams {
        DifficultyParams {
            base_difficulty: self.base_difficulty,
            unanswered_difficulty: self.unanswered_difficulty,
        }
    }
}

fn default_base_difficulty() -> f64 {
    DEFAULT_BASE_DIFFICULTY
}

fn default_unanswered_difficulty() -> f64 {
    DEFAULT_UNANSWERED_DIFFICULTY
}

/// Output list thresholds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RankingConfig {
    #[serde(default = "default_classification_cutoff")]
    pub classification_cutoff: usize,
    #[serde(default = "default_reassignment_cut_score")]
    pub reassignment_cut_score: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            classification_cutoff: DEFAULT_CLASSIFICATION_CUTOFF,
            reassignment_cut_score: DEFAULT_REASSIGNMENT_CUT_SCORE,
        }
    }
}

impl RankingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.reassignment_cut_score.is_finite() || self.reassignment_cut_score < 0.0 {
            return Err(ValidationError::InvalidField {
                field: "ranking.reassignment_cut_score".to_string(),
                message: "cut score must be a finite, non-negative number".to_string(),
            });
        }
        Ok(())
    }

    pub fn policy(&self) -> RankingPolicy {
        RankingPolicy {
            classification_cutoff: self.classification_cutoff,
            reassignment_cut_score: self.reassignment_cut_score,
        }
    }
}

fn default_classification_cutoff() -> usize {
    DEFAULT_CLASSIFICATION_CUTOFF
}

fn default_reassignment_cut_score() -> f64 {
    DEFAULT_REASSIGNMENT_CUT_SCORE
}

/// Input file locations.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InputsConfig {
    pub answer_key: PathBuf,
    pub responses: PathBuf,
}

impl InputsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (label, value) in [
            ("inputs.answer_key", &self.answer_key),
            ("inputs.responses", &self.responses),
        ] {
            if value.as_os_str().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub classified: String,
    pub reassignment: String,
    pub general: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.classified", &self.classified),
            ("outputs.reassignment", &self.reassignment),
            ("outputs.general", &self.general),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to human-readable logs on stderr.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub classified: PathBuf,
    pub reassignment: PathBuf,
    pub general: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

impl ResolvedOutputs {
    /// JSON twin of the Markdown summary.
    pub fn summary_json(&self) -> PathBuf {
        self.summary_md.with_extension("json")
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "exam_303"
exam:
  questions: 30
  variant: 303
  subject_sizes: [10, 10, 10]
weighting:
  unanswered_difficulty: 12.0
ranking:
  classification_cutoff: 30
workers: 4
inputs:
  answer_key: "data/gabarito.csv"
  responses: "data/respostas.csv"
outputs:
  classified: "results/{run_id}/classified.csv"
  reassignment: "results/{run_id}/reassignment.csv"
  general: "results/{run_id}/general.csv"
  summary_md: "results/{run_id}/summary.md"
  plots_dir: "results/{run_id}/plots"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: RankConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.exam.capacity, DEFAULT_CAPACITY);
        assert_eq!(cfg.weighting.base_difficulty, DEFAULT_BASE_DIFFICULTY);
        assert_eq!(cfg.weighting.unanswered_difficulty, 12.0);
        assert_eq!(cfg.ranking.policy().classification_cutoff, 30);
        assert_eq!(cfg.ranking.reassignment_cut_score, DEFAULT_REASSIGNMENT_CUT_SCORE);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.general,
            PathBuf::from("results/exam_303/general.csv")
        );
        assert_eq!(
            outputs.summary_json(),
            PathBuf::from("results/exam_303/summary.json")
        );
    }

    #[test]
    fn exam_block_defaults_to_three_subjects() {
        let yaml = BASIC_YAML.replace(
            "exam:\n  questions: 30\n  variant: 303\n  subject_sizes: [10, 10, 10]\n",
            "",
        );
        let mut cfg: RankConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.exam, ExamConfig::default());
        assert_eq!(
            cfg.exam.subject_groups().unwrap(),
            SubjectGroups::default()
        );
    }

    #[test]
    fn rejects_groups_not_covering_questions() {
        let yaml = BASIC_YAML.replace("[10, 10, 10]", "[10, 10]");
        let mut cfg: RankConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "exam.subject_sizes"
        ));
    }

    #[test]
    fn rejects_empty_subject_group() {
        let yaml = BASIC_YAML.replace("[10, 10, 10]", "[15, 0, 15]");
        let mut cfg: RankConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_workers() {
        let yaml = BASIC_YAML.replace("workers: 4", "workers: 0");
        let mut cfg: RankConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("zero workers");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "workers"
        ));
    }

    #[test]
    fn rejects_non_positive_difficulty() {
        let yaml = BASIC_YAML.replace("unanswered_difficulty: 12.0", "unanswered_difficulty: -1.0");
        let mut cfg: RankConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("negative difficulty");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "weighting"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("exam_303", "exam 303");
        let mut cfg: RankConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }
}
