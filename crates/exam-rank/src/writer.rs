use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use exam_core::{RankedEntry, Standings};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ResolvedOutputs;

pub const TABLE_HEADER: &str = "Position,Variant,Identifier,Score";

/// The three ranked lists a run publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Classified,
    Reassignment,
    General,
}

impl Artifact {
    pub const ALL: [Artifact; 3] = [
        Artifact::Classified,
        Artifact::Reassignment,
        Artifact::General,
    ];

    pub fn path(self, outputs: &ResolvedOutputs) -> &Path {
        match self {
            Artifact::Classified => &outputs.classified,
            Artifact::Reassignment => &outputs.reassignment,
            Artifact::General => &outputs.general,
        }
    }

    pub fn entries(self, standings: &Standings) -> &[RankedEntry] {
        match self {
            Artifact::Classified => &standings.classified,
            Artifact::Reassignment => &standings.reassignment,
            Artifact::General => &standings.general,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Artifact::Classified => "classified",
            Artifact::Reassignment => "reassignment",
            Artifact::General => "general",
        })
    }
}

#[derive(Debug, Error)]
#[error("failed to write {artifact} list to {path:?}: {source}")]
pub struct OutputWriteError {
    pub artifact: Artifact,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Result of writing one list.
#[derive(Debug)]
pub struct WrittenArtifact {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub outcome: Result<usize, OutputWriteError>,
}

/// Writes every list independently; a failure on one does not stop the others.
pub fn write_standings(
    standings: &Standings,
    variant: u32,
    outputs: &ResolvedOutputs,
) -> Vec<WrittenArtifact> {
    Artifact::ALL
        .into_iter()
        .map(|artifact| {
            let path = artifact.path(outputs).to_path_buf();
            let outcome = write_table(&path, variant, artifact.entries(standings)).map_err(
                |source| OutputWriteError {
                    artifact,
                    path: path.clone(),
                    source,
                },
            );
            match &outcome {
                Ok(rows) => info!(%artifact, rows, path = %path.display(), "list written"),
                Err(err) => warn!(%artifact, error = %err, "list not written"),
            }
            WrittenArtifact {
                artifact,
                path,
                outcome,
            }
        })
        .collect()
}

/// Header line followed by one row per entry, scores at one decimal place.
/// Rows are numbered from 1 within the list itself.
pub fn write_table(path: &Path, variant: u32, entries: &[RankedEntry]) -> io::Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_rows(&mut writer, variant, entries)?;
    writer.flush()?;
    Ok(entries.len())
}

pub fn write_rows<W: Write>(
    writer: &mut W,
    variant: u32,
    entries: &[RankedEntry],
) -> io::Result<()> {
    writeln!(writer, "{TABLE_HEADER}")?;
    for (index, entry) in entries.iter().enumerate() {
        writeln!(
            writer,
            "{},{},{},{:.1}",
            index + 1,
            variant,
            entry.id,
            entry.score
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(position: usize, id: u64, score: f64) -> RankedEntry {
        RankedEntry {
            position,
            id,
            score,
        }
    }

    #[test]
    fn rows_use_one_decimal_place() {
        let mut buffer = Vec::new();
        write_rows(
            &mut buffer,
            303,
            &[entry(1, 7, 200.0), entry(2, 3, 200.0 / 3.0)],
        )
        .expect("write to memory");
        let text = String::from_utf8(buffer).expect("utf8");
        assert_eq!(
            text,
            "Position,Variant,Identifier,Score\n1,303,7,200.0\n2,303,3,66.7\n"
        );
    }

    #[test]
    fn reassignment_rows_are_numbered_within_their_list() {
        use exam_core::{RankedResult, RankingPolicy, ScoredCandidate};

        let ranked = RankedResult::from_scores(vec![
            ScoredCandidate::new(1, 99.0),
            ScoredCandidate::new(2, 90.0),
            ScoredCandidate::new(3, 80.0),
        ]);
        let standings = ranked.standings(&RankingPolicy {
            classification_cutoff: 2,
            reassignment_cut_score: 70.0,
        });
        assert_eq!(standings.reassignment[0].position, 3);

        let mut buffer = Vec::new();
        write_rows(&mut buffer, 303, &standings.reassignment).expect("write");
        assert_eq!(
            String::from_utf8(buffer).expect("utf8"),
            "Position,Variant,Identifier,Score\n1,303,3,80.0\n"
        );
    }

    #[test]
    fn empty_list_still_has_header() {
        let mut buffer = Vec::new();
        write_rows(&mut buffer, 303, &[]).expect("write");
        assert_eq!(buffer, format!("{TABLE_HEADER}\n").into_bytes());
    }

    #[test]
    fn one_failed_list_does_not_block_the_others() {
        let dir = tempdir().expect("temp dir");
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "file in the way").expect("create blocker");

        let outputs = ResolvedOutputs {
            classified: dir.path().join("out/classified.csv"),
            reassignment: blocker.join("reassignment.csv"),
            general: dir.path().join("out/general.csv"),
            summary_md: dir.path().join("out/summary.md"),
            plots_dir: dir.path().join("out/plots"),
        };
        let standings = Standings {
            classified: vec![entry(1, 1, 90.0)],
            reassignment: Vec::new(),
            general: vec![entry(1, 1, 90.0), entry(2, 2, 80.0)],
        };

        let written = write_standings(&standings, 303, &outputs);
        assert_eq!(written.len(), 3);
        assert!(matches!(written[0].outcome, Ok(1)));
        assert!(written[1].outcome.is_err());
        assert!(matches!(written[2].outcome, Ok(2)));
        assert!(outputs.general.exists());
    }
}
