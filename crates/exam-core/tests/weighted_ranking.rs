use exam_core::weighting::{count_correct, estimate_difficulty};
use exam_core::{
    AnswerKey, Candidate, DifficultyParams, POINTS_PER_GROUP, PointTable, RankedResult,
    RankingPolicy, SubjectGroups, score_block,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SYMBOLS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];
const EPSILON: f64 = 1e-9;

fn random_pool(seed: u64, size: usize, questions: usize) -> (AnswerKey, Vec<Candidate>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let key_symbols = (0..questions)
        .map(|_| SYMBOLS[rng.gen_range(0..SYMBOLS.len())])
        .collect();
    let key = AnswerKey::new(key_symbols).expect("non-empty key");

    let candidates = (0..size)
        .map(|index| {
            let responses = (0..questions)
                .map(|_| SYMBOLS[rng.gen_range(0..SYMBOLS.len())])
                .collect();
            Candidate::new(1_000 + index as u64, 303, responses)
        })
        .collect();
    (key, candidates)
}

#[test]
fn two_subject_example_ranks_perfect_sheet_first() {
    let key: AnswerKey = "ABAB".parse().unwrap();
    let candidates = vec![
        Candidate::from_responses(1, 303, "ABAB"),
        Candidate::from_responses(2, 303, "AAAA"),
    ];
    let groups = SubjectGroups::from_sizes(&[2, 2]).unwrap();

    let counts = count_correct(&candidates, &key);
    assert_eq!(counts, vec![2, 1, 2, 1]);

    let weights = estimate_difficulty(&counts, &DifficultyParams::default());
    assert_eq!(weights.as_slice(), &[4.0, 8.0, 4.0, 8.0]);

    let points = PointTable::normalize(&weights, &groups).unwrap();
    let ranked = RankedResult::from_scores(score_block(&candidates, &key, &points));

    let general = ranked.general();
    assert_eq!(general[0].id, 1);
    assert!((general[0].score - 200.0).abs() < EPSILON);
    assert_eq!(general[1].id, 2);
    assert!((general[1].score - 200.0 / 3.0).abs() < EPSILON);
}

#[test]
fn random_pools_respect_point_and_score_bounds() {
    let groups = SubjectGroups::default();
    let policy = RankingPolicy {
        classification_cutoff: 10,
        reassignment_cut_score: 40.0,
    };

    for seed in 0..16u64 {
        let (key, candidates) = random_pool(seed, 57, 30);
        let counts = count_correct(&candidates, &key);
        let weights = estimate_difficulty(&counts, &DifficultyParams::default());
        let points = PointTable::normalize(&weights, &groups).expect("normalizes");

        for group in 0..groups.len() {
            let total = points.group_total(&groups, group).unwrap();
            assert!((total - POINTS_PER_GROUP).abs() < EPSILON, "seed {seed}: {total}");
        }

        let scores = score_block(&candidates, &key, &points);
        let max_score = POINTS_PER_GROUP * groups.len() as f64;
        assert!(
            scores
                .iter()
                .all(|s| s.score >= 0.0 && s.score <= max_score + EPSILON)
        );

        let ranked = RankedResult::from_scores(scores);
        assert!(
            ranked
                .general()
                .windows(2)
                .all(|pair| pair[0].score >= pair[1].score)
        );

        let standings = ranked.standings(&policy);
        assert_eq!(
            standings.classified.len(),
            policy.classification_cutoff.min(candidates.len())
        );
        assert!(standings.reassignment.iter().all(|entry| {
            entry.position > policy.classification_cutoff
                && entry.score >= policy.reassignment_cut_score
        }));
    }
}

#[test]
fn identical_input_yields_identical_standings() {
    let (key, candidates) = random_pool(42, 40, 30);
    let groups = SubjectGroups::default();
    let run = || {
        let counts = count_correct(&candidates, &key);
        let weights = estimate_difficulty(&counts, &DifficultyParams::default());
        let points = PointTable::normalize(&weights, &groups).unwrap();
        let ranked = RankedResult::from_scores(score_block(&candidates, &key, &points));
        (points, ranked.standings(&RankingPolicy::default()))
    };
    assert_eq!(run(), run());
}
