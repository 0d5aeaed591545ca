//! Weighted exam scoring over a fixed-size worker group: configuration,
//! input loading, the distributed scoring run and its published artifacts.

pub mod config;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod writer;

pub use config::{RankConfig, ResolvedOutputs};
pub use loader::{ExamSource, FileSource, MemorySource};
pub use pipeline::{ExamPipeline, PipelineError, RankOutcome};
pub use report::{RunSummary, write_outputs};
