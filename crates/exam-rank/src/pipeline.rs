use std::time::Instant;

use exam_cluster::{
    CollectiveError, CoordinatorLink, Endpoint, GroupError, WorkerLink, concat_blocks, launch,
    split_contiguous,
};
use exam_core::weighting::{count_correct, estimate_difficulty};
use exam_core::{
    AnswerKey, Candidate, ConfigurationError, DifficultyParams, DifficultyWeights, PointTable,
    RankedResult, RankingPolicy, ScoredCandidate, Standings, SubjectGroups, score_block,
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::RankConfig;
use crate::loader::{ExamSource, LoadError, LoadReport, RecordFilter};

/// Failures that end the whole run. Every member of the group stops together.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fatal input error: {0}")]
    FatalInput(#[from] LoadError),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("collective operation failed: {0}")]
    Collective(#[from] CollectiveError),
    #[error("worker group failed: {0}")]
    Group(#[from] GroupError),
    #[error("gathered {found} scores for a pool of {expected} candidates")]
    ScoreCount { expected: usize, found: usize },
    #[error("rank {rank} received a {found} payload during {phase}")]
    UnexpectedPayload {
        rank: usize,
        phase: &'static str,
        found: &'static str,
    },
}

/// Read-only data every member holds its own copy of after the broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedExam {
    pub pool_size: usize,
    pub key: AnswerKey,
    pub points: PointTable,
}

/// Everything that travels through a collective.
#[derive(Debug, Clone)]
pub enum Payload {
    Shared(SharedExam),
    Block(Vec<Candidate>),
    Scores(Vec<ScoredCandidate>),
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Shared(_) => "shared exam",
            Payload::Block(_) => "candidate block",
            Payload::Scores(_) => "scores",
        }
    }
}

/// Coordinator-side results of a completed run.
#[derive(Debug, Clone)]
pub struct RankOutcome {
    pub load: LoadReport,
    pub workers: usize,
    pub block_sizes: Vec<usize>,
    pub groups: SubjectGroups,
    pub correct_counts: Vec<usize>,
    pub weights: DifficultyWeights,
    pub points: PointTable,
    pub ranked: RankedResult,
    pub standings: Standings,
}

impl RankOutcome {
    pub fn pool_size(&self) -> usize {
        self.ranked.len()
    }
}

enum MemberExit {
    Coordinator(Box<RankOutcome>),
    Worker,
}

/// Inputs prepared at the coordinator before anything is distributed.
struct Prepared {
    load: LoadReport,
    candidates: Vec<Candidate>,
    shared: SharedExam,
    correct_counts: Vec<usize>,
    weights: DifficultyWeights,
}

/// One configured scoring run over a fixed-size worker group.
pub struct ExamPipeline {
    filter: RecordFilter,
    groups: SubjectGroups,
    difficulty: DifficultyParams,
    policy: RankingPolicy,
    workers: usize,
}

impl ExamPipeline {
    pub fn new(config: &RankConfig) -> Result<Self, PipelineError> {
        let groups = config.exam.subject_groups()?;
        groups.ensure_covers(config.exam.questions)?;
        let difficulty = config.weighting.params();
        difficulty.validate()?;

        Ok(Self {
            filter: RecordFilter {
                questions: config.exam.questions,
                variant: config.exam.variant,
                capacity: config.exam.capacity,
            },
            groups,
            difficulty,
            policy: config.ranking.policy(),
            workers: config.workers,
        })
    }

    pub fn policy(&self) -> &RankingPolicy {
        &self.policy
    }

    /// Launches the group, scores every candidate exactly once and ranks the
    /// gathered results at the coordinator.
    pub fn run(&self, source: &dyn ExamSource) -> Result<RankOutcome, PipelineError> {
        let started = Instant::now();
        let exits = launch::<Payload, _, _>(self.workers, |endpoint| match endpoint {
            Endpoint::Coordinator(link) => self
                .coordinate(&link, source)
                .map(|outcome| MemberExit::Coordinator(Box::new(outcome))),
            Endpoint::Worker(link) => serve(&link).map(|_| MemberExit::Worker),
        })?;

        let mut coordinator = None;
        let mut worker_failure = None;
        for exit in exits {
            match exit {
                Ok(MemberExit::Coordinator(outcome)) => coordinator = Some(Ok(*outcome)),
                Ok(MemberExit::Worker) => {}
                Err(err) if coordinator.is_none() => coordinator = Some(Err(err)),
                Err(err) => {
                    worker_failure.get_or_insert(err);
                }
            }
        }

        // Rank 0 comes first, so its error is the root cause when present.
        let outcome = match (coordinator, worker_failure) {
            (Some(Err(err)), _) | (Some(Ok(_)), Some(err)) => return Err(err),
            (Some(Ok(outcome)), None) => outcome,
            (None, _) => {
                return Err(PipelineError::Group(GroupError::Empty));
            }
        };

        info!(
            pool_size = outcome.pool_size(),
            workers = self.workers,
            classified = outcome.standings.classified.len(),
            reassignment = outcome.standings.reassignment.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ranking complete"
        );
        Ok(outcome)
    }

    fn coordinate(
        &self,
        link: &CoordinatorLink<Payload>,
        source: &dyn ExamSource,
    ) -> Result<RankOutcome, PipelineError> {
        let result = self
            .prepare(source)
            .and_then(|prepared| self.distribute_and_rank(link, prepared));
        if let Err(err) = &result {
            // Releases workers still blocked in a collective.
            error!(rank = 0, error = %err, "coordinator failed");
            link.abort(&err.to_string());
        }
        result
    }

    /// Loads inputs and derives point values from the whole pool. Runs
    /// before any distribution so configuration errors never reach workers.
    fn prepare(&self, source: &dyn ExamSource) -> Result<Prepared, PipelineError> {
        let key = source.answer_key(self.filter.questions)?;
        let loaded = source.candidates(&self.filter)?;
        let candidates = loaded.pool.into_vec();

        let correct_counts = count_correct(&candidates, &key);
        let weights = estimate_difficulty(&correct_counts, &self.difficulty);
        let points = PointTable::normalize(&weights, &self.groups)?;
        debug!(
            questions = key.len(),
            candidates = candidates.len(),
            "point values computed"
        );

        Ok(Prepared {
            load: loaded.report,
            shared: SharedExam {
                pool_size: candidates.len(),
                key,
                points,
            },
            candidates,
            correct_counts,
            weights,
        })
    }

    fn distribute_and_rank(
        &self,
        link: &CoordinatorLink<Payload>,
        prepared: Prepared,
    ) -> Result<RankOutcome, PipelineError> {
        let Prepared {
            load,
            candidates,
            shared,
            correct_counts,
            weights,
        } = prepared;

        link.broadcast(&Payload::Shared(shared.clone()))?;

        let blocks = split_contiguous(candidates, link.size());
        let block_sizes: Vec<usize> = blocks.iter().map(Vec::len).collect();
        info!(?block_sizes, "scattering candidate blocks");
        let own = link.scatter(blocks.into_iter().map(Payload::Block).collect())?;
        let own = expect_block(0, own)?;

        let scored = score_block(&own, &shared.key, &shared.points);
        let gathered = link.gather(Payload::Scores(scored))?;

        let blocks = gathered
            .into_iter()
            .enumerate()
            .map(|(rank, payload)| match payload {
                Payload::Scores(block) => Ok(block),
                other => Err(PipelineError::UnexpectedPayload {
                    rank,
                    phase: "gather",
                    found: other.kind(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let scores = concat_blocks(blocks);
        if scores.len() != shared.pool_size {
            return Err(PipelineError::ScoreCount {
                expected: shared.pool_size,
                found: scores.len(),
            });
        }

        let ranked = RankedResult::from_scores(scores);
        let standings = ranked.standings(&self.policy);

        Ok(RankOutcome {
            load,
            workers: link.size(),
            block_sizes,
            groups: self.groups.clone(),
            correct_counts,
            weights,
            points: shared.points,
            ranked,
            standings,
        })
    }
}

/// A worker's whole life: receive shared data, score the assigned block,
/// hand the scores back.
fn serve(link: &WorkerLink<Payload>) -> Result<usize, PipelineError> {
    let result = score_assigned_block(link);
    if let Err(err) = &result {
        // An abort already reached everyone; anything else goes to the coordinator.
        if !matches!(err, PipelineError::Collective(CollectiveError::Aborted { .. })) {
            error!(rank = link.rank(), error = %err, "worker failed");
            link.abort(&err.to_string());
        }
    }
    result
}

fn score_assigned_block(link: &WorkerLink<Payload>) -> Result<usize, PipelineError> {
    let shared = match link.recv_broadcast()? {
        Payload::Shared(shared) => shared,
        other => {
            return Err(PipelineError::UnexpectedPayload {
                rank: link.rank(),
                phase: "broadcast",
                found: other.kind(),
            });
        }
    };
    let block = expect_block(link.rank(), link.recv_scatter()?)?;

    let scored = score_block(&block, &shared.key, &shared.points);
    let count = scored.len();
    link.send_gather(Payload::Scores(scored))?;
    debug!(rank = link.rank(), scored = count, "block scored");
    Ok(count)
}

fn expect_block(rank: usize, payload: Payload) -> Result<Vec<Candidate>, PipelineError> {
    match payload {
        Payload::Block(block) => Ok(block),
        other => Err(PipelineError::UnexpectedPayload {
            rank,
            phase: "scatter",
            found: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ExamConfig, InputsConfig, LoggingConfig, OutputsConfig, RankingConfig, WeightingConfig,
    };
    use crate::loader::MemorySource;

    fn config(questions: usize, sizes: Vec<usize>, workers: usize) -> RankConfig {
        RankConfig {
            run_id: "unit".to_string(),
            exam: ExamConfig {
                questions,
                variant: 303,
                subject_sizes: sizes,
                capacity: 50,
            },
            weighting: WeightingConfig::default(),
            ranking: RankingConfig {
                classification_cutoff: 1,
                reassignment_cut_score: 60.0,
            },
            workers,
            inputs: InputsConfig {
                answer_key: "key.csv".into(),
                responses: "responses.csv".into(),
            },
            outputs: OutputsConfig {
                classified: "out/classified.csv".to_string(),
                reassignment: "out/reassignment.csv".to_string(),
                general: "out/general.csv".to_string(),
                summary_md: "out/summary.md".to_string(),
                plots_dir: "out/plots".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn two_subject_example_with_every_group_size() {
        let source = MemorySource::new("A,B,A,B", "1,303,A,B,A,B\n2,303,A,A,A,A\n");
        for workers in 1..=3 {
            let pipeline = ExamPipeline::new(&config(4, vec![2, 2], workers)).unwrap();
            let outcome = pipeline.run(&source).expect("run succeeds");

            assert_eq!(outcome.correct_counts, vec![2, 1, 2, 1]);
            assert_eq!(outcome.weights.as_slice(), &[4.0, 8.0, 4.0, 8.0]);
            assert_eq!(outcome.block_sizes.iter().sum::<usize>(), 2);

            let general = &outcome.standings.general;
            assert_eq!(general[0].id, 1);
            assert!((general[0].score - 200.0).abs() < 1e-9);
            assert_eq!(general[1].id, 2);
            assert!((general[1].score - 200.0 / 3.0).abs() < 1e-9);

            assert_eq!(outcome.standings.classified.len(), 1);
            assert_eq!(outcome.standings.reassignment.len(), 1);
        }
    }

    #[test]
    fn empty_pool_completes_with_empty_lists() {
        let source = MemorySource::new("A,B,A,B", "9,404,A,B,A,B\n");
        let pipeline = ExamPipeline::new(&config(4, vec![2, 2], 3)).unwrap();
        let outcome = pipeline.run(&source).expect("empty run succeeds");

        assert_eq!(outcome.pool_size(), 0);
        assert_eq!(outcome.block_sizes, vec![0, 0, 0]);
        assert_eq!(outcome.load.skipped, 1);
        assert!(outcome.standings.general.is_empty());
        assert!(outcome.standings.classified.is_empty());
        assert!(outcome.standings.reassignment.is_empty());
    }

    #[test]
    fn unreadable_key_aborts_every_member() {
        let source = MemorySource::new("A", "1,303,A,B,A,B\n");
        let pipeline = ExamPipeline::new(&config(4, vec![2, 2], 4)).unwrap();
        let err = pipeline.run(&source).expect_err("short key is fatal");
        assert!(matches!(
            err,
            PipelineError::FatalInput(LoadError::ShortKey { found: 1, expected: 4 })
        ));
    }

    #[test]
    fn mismatched_groups_fail_before_launch() {
        let err = ExamPipeline::new(&config(4, vec![3], 2)).err().expect("invalid groups");
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::Coverage { .. })
        ));
    }
}
