use std::fs;
use std::path::{Path, PathBuf};

use exam_core::{ExamInfo, RankingPolicy};
use plotters::prelude::*;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Median};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ResolvedOutputs;
use crate::loader::LoadReport;
use crate::pipeline::RankOutcome;
use crate::writer::{WrittenArtifact, write_standings};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode summary JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreStatistics {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl ScoreStatistics {
    /// Sample statistics; all zero for an empty pool, spread zero for one score.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                std_dev: 0.0,
                median: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let data = Data::new(scores.to_vec());
        let mean = data.mean().unwrap_or(0.0);
        let std_dev = if scores.len() > 1 {
            data.std_dev().unwrap_or(0.0)
        } else {
            0.0
        };

        Self {
            count: scores.len(),
            mean,
            std_dev,
            median: data.median(),
            min: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionReport {
    /// 1-based question number.
    pub question: usize,
    /// 1-based subject group.
    pub subject: usize,
    pub correct: usize,
    pub difficulty: f64,
    pub points: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListSizes {
    pub classified: usize,
    pub reassignment: usize,
    pub general: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub tool: String,
    pub version: String,
    pub run_id: String,
    pub variant: u32,
    pub workers: usize,
    pub block_sizes: Vec<usize>,
    pub load: LoadReport,
    pub policy: RankingPolicy,
    pub lists: ListSizes,
    pub scores: ScoreStatistics,
    pub subject_totals: Vec<f64>,
    pub questions: Vec<QuestionReport>,
}

impl RunReport {
    pub fn new(run_id: &str, variant: u32, policy: &RankingPolicy, outcome: &RankOutcome) -> Self {
        let scores: Vec<f64> = outcome.ranked.general().iter().map(|s| s.score).collect();

        let questions = outcome
            .points
            .as_slice()
            .iter()
            .enumerate()
            .map(|(question, &points)| QuestionReport {
                question: question + 1,
                subject: outcome.groups.group_of(question).map_or(0, |g| g + 1),
                correct: outcome.correct_counts.get(question).copied().unwrap_or(0),
                difficulty: outcome.weights.weight(question).unwrap_or(0.0),
                points,
            })
            .collect();

        let subject_totals = (0..outcome.groups.len())
            .filter_map(|group| outcome.points.group_total(&outcome.groups, group))
            .collect();

        Self {
            tool: ExamInfo::name().to_string(),
            version: ExamInfo::version().to_string(),
            run_id: run_id.to_string(),
            variant,
            workers: outcome.workers,
            block_sizes: outcome.block_sizes.clone(),
            load: outcome.load,
            policy: *policy,
            lists: ListSizes {
                classified: outcome.standings.classified.len(),
                reassignment: outcome.standings.reassignment.len(),
                general: outcome.standings.general.len(),
            },
            scores: ScoreStatistics::from_scores(&scores),
            subject_totals,
            questions,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Exam Ranking Summary\n\n");
        out.push_str(&format!(
            "{} {} | run `{}` | variant {}\n\n",
            self.tool, self.version, self.run_id, self.variant
        ));
        out.push_str(&format!(
            "Candidates scored: {} ({} records skipped) across {} worker{} with blocks {:?}\n\n",
            self.lists.general,
            self.load.skipped,
            self.workers,
            if self.workers == 1 { "" } else { "s" },
            self.block_sizes
        ));

        out.push_str("## Lists\n\n");
        out.push_str("| List | Rule | Entries |\n");
        out.push_str("|------|------|---------|\n");
        out.push_str(&format!(
            "| Classified | top {} | {} |\n",
            self.policy.classification_cutoff, self.lists.classified
        ));
        out.push_str(&format!(
            "| Reassignment | rank > {} and score >= {:.1} | {} |\n",
            self.policy.classification_cutoff,
            self.policy.reassignment_cut_score,
            self.lists.reassignment
        ));
        out.push_str(&format!("| General | all | {} |\n\n", self.lists.general));

        out.push_str("## Scores\n\n");
        out.push_str("| Count | Mean | Std dev | Median | Min | Max |\n");
        out.push_str("|-------|------|---------|--------|-----|-----|\n");
        let s = &self.scores;
        out.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n\n",
            s.count, s.mean, s.std_dev, s.median, s.min, s.max
        ));

        out.push_str("## Questions\n\n");
        out.push_str("| Question | Subject | Correct | Difficulty | Points |\n");
        out.push_str("|----------|---------|---------|------------|--------|\n");
        for q in &self.questions {
            out.push_str(&format!(
                "| {} | {} | {} | {:.3} | {:.3} |\n",
                q.question, q.subject, q.correct, q.difficulty, q.points
            ));
        }
        out.push('\n');

        out.push_str("Subject totals: ");
        let totals: Vec<String> = self
            .subject_totals
            .iter()
            .map(|total| format!("{total:.1}"))
            .collect();
        out.push_str(&totals.join(", "));
        out.push('\n');
        out
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        ensure_parent(path)?;
        fs::write(path, self.to_markdown()).map_err(|e| ReportError::Io {
            context: "writing summary markdown",
            source: e,
        })
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        ensure_parent(path)?;
        fs::write(path, serde_json::to_vec_pretty(self)?).map_err(|e| ReportError::Io {
            context: "writing summary json",
            source: e,
        })
    }

    /// Bar chart of point values per question, one color per subject group.
    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ReportError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| ReportError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }
        if self.questions.is_empty() {
            return Err(ReportError::Plot("no questions to plot".into()));
        }

        let output_path = dir.join("point_values.png");
        let bars: Vec<(usize, f64)> = self.questions.iter().map(|q| (q.subject, q.points)).collect();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let palette = [&BLUE, &GREEN, &RED, &MAGENTA, &CYAN];
            let root = BitMapBackend::new(&output_path, (960, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            let y_max = bars.iter().map(|&(_, points)| points).fold(0.0f64, f64::max);
            let margin = (y_max * 0.1).max(1.0);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption("Point value per question", ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 40)
                .build_cartesian_2d(0..bars.len(), 0.0..(y_max + margin))
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Points")
                .x_desc("Question")
                .x_label_formatter(&|idx| format!("{}", idx + 1))
                .draw()
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            chart
                .draw_series(bars.iter().enumerate().map(|(idx, &(subject, points))| {
                    let color = palette[subject.saturating_sub(1) % palette.len()];
                    Rectangle::new([(idx, 0.0), (idx + 1, points)], color.filled())
                }))
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(ReportError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

/// Where a completed run's artifacts ended up.
#[derive(Debug)]
pub struct RunSummary {
    pub lists: Vec<WrittenArtifact>,
    pub summary_md: Result<PathBuf, ReportError>,
    pub summary_json: Result<PathBuf, ReportError>,
    pub plot_path: Option<PathBuf>,
}

impl RunSummary {
    /// Number of artifacts that could not be written. The plot is optional
    /// and never counts.
    pub fn failures(&self) -> usize {
        self.lists.iter().filter(|w| w.outcome.is_err()).count()
            + usize::from(self.summary_md.is_err())
            + usize::from(self.summary_json.is_err())
    }
}

/// Writes the three lists, the summary pair and the chart. Every artifact is
/// attempted even when an earlier one fails.
pub fn write_outputs(
    run_id: &str,
    variant: u32,
    policy: &RankingPolicy,
    outcome: &RankOutcome,
    outputs: &ResolvedOutputs,
) -> RunSummary {
    let lists = write_standings(&outcome.standings, variant, outputs);
    let report = RunReport::new(run_id, variant, policy, outcome);

    let summary_md = report
        .write_markdown(&outputs.summary_md)
        .map(|_| outputs.summary_md.clone());
    let json_path = outputs.summary_json();
    let summary_json = report.write_json(&json_path).map(|_| json_path);
    for err in [&summary_md, &summary_json].into_iter().filter_map(|r| r.as_ref().err()) {
        warn!(error = %err, "summary not written");
    }

    let plot_path = match report.render_plot(&outputs.plots_dir) {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(error = %err, "point value chart skipped");
            None
        }
    };

    let summary = RunSummary {
        lists,
        summary_md,
        summary_json,
        plot_path,
    };
    info!(failures = summary.failures(), "outputs written");
    summary
}

fn ensure_parent(path: &Path) -> Result<(), ReportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ReportError::Io {
                context: "creating summary directory",
                source: e,
            })
        }
        _ => Ok(()),
    }
}
