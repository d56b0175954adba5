//! Training pipeline: stratified split, normalization fitted on the train
//! partition only, two linear candidates, held-out selection.

use tracing::info;

use crate::artifact::ModelArtifact;
use crate::dataset::Sample;
use crate::error::TrainError;
use crate::features::FeatureVector;
use crate::ml::{
    ClassifierKind, LinearModel, LogisticTrainer, PassiveAggressiveTrainer, DECISION_THRESHOLD,
};
use crate::model::Label;
use crate::scaler::StandardScaler;

pub const DEFAULT_TEST_RATIO: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub test_ratio: f64,
    pub seed: u64,
    pub logistic: LogisticTrainer,
    pub passive_aggressive: PassiveAggressiveTrainer,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            test_ratio: DEFAULT_TEST_RATIO,
            seed: DEFAULT_SEED,
            logistic: LogisticTrainer::default(),
            passive_aggressive: PassiveAggressiveTrainer::default(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CandidateReport {
    pub kind: ClassifierKind,
    pub accuracy: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassReport {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainReport {
    pub samples: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub test_ratio: f64,
    pub seed: u64,
    pub candidates: Vec<CandidateReport>,
    pub winner: ClassifierKind,
    pub accuracy: f64,
    pub classes: Vec<ClassReport>,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub artifact: ModelArtifact,
    pub report: TrainReport,
}

/// Fits both candidate classifiers on a stratified split of `samples` and
/// returns the one with the better held-out accuracy, paired with the scaler
/// it was fitted behind. The same seed over the same samples reproduces the
/// exact split, weights, and report.
pub fn train(samples: &[Sample], options: &TrainOptions) -> Result<TrainOutcome, TrainError> {
    if samples.is_empty() {
        return Err(TrainError::EmptyDataset);
    }
    if !(options.test_ratio > 0.0 && options.test_ratio < 1.0) {
        return Err(TrainError::InvalidRatio(options.test_ratio));
    }
    let benign_count = samples
        .iter()
        .filter(|sample| sample.label == Label::Benign)
        .count();
    if benign_count == 0 {
        return Err(TrainError::SingleClass(Label::Malware));
    }
    if benign_count == samples.len() {
        return Err(TrainError::SingleClass(Label::Benign));
    }

    let mut rng = SplitRng::new(options.seed);
    let (mut train_indexes, test_indexes) =
        stratified_split(samples, options.test_ratio, &mut rng)?;
    rng.shuffle(&mut train_indexes);

    let rows: Vec<Vec<f64>> = samples
        .iter()
        .map(|sample| FeatureVector::from_counters(&sample.counters).as_vec())
        .collect();
    let gather = |indexes: &[usize]| -> (Vec<Vec<f64>>, Vec<u8>) {
        let gathered = indexes.iter().map(|&index| rows[index].clone()).collect();
        let labels = indexes
            .iter()
            .map(|&index| samples[index].label.encode())
            .collect();
        (gathered, labels)
    };
    let (train_rows, train_labels) = gather(&train_indexes);
    let (test_rows, test_labels) = gather(&test_indexes);

    let scaler = StandardScaler::fit(&train_rows)?;
    let train_rows = scaler.transform_rows(&train_rows)?;
    let test_rows = scaler.transform_rows(&test_rows)?;

    let mut fitted = vec![
        (
            ClassifierKind::Logistic,
            options.logistic.fit(&train_rows, &train_labels),
        ),
        (
            ClassifierKind::PassiveAggressive,
            options.passive_aggressive.fit(&train_rows, &train_labels),
        ),
    ];

    let candidates: Vec<CandidateReport> = fitted
        .iter()
        .map(|(kind, model)| CandidateReport {
            kind: *kind,
            accuracy: accuracy(&predict_labels(model, &test_rows), &test_labels),
        })
        .collect();

    // ties keep the earlier candidate
    let mut winner_index = 0;
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.accuracy > candidates[winner_index].accuracy {
            winner_index = index;
        }
    }
    let winner_accuracy = candidates[winner_index].accuracy;
    let (winner_kind, winner_model) = fitted.swap_remove(winner_index);

    let winner_predictions = predict_labels(&winner_model, &test_rows);
    let classes = [Label::Benign, Label::Malware]
        .into_iter()
        .map(|label| class_report(label, &winner_predictions, &test_labels))
        .collect();

    info!(
        winner = winner_kind.as_str(),
        accuracy = winner_accuracy,
        train_size = train_indexes.len(),
        test_size = test_indexes.len(),
        "training complete"
    );

    let artifact = ModelArtifact {
        kind: winner_kind,
        model: winner_model,
        scaler,
        trained_accuracy: winner_accuracy,
    };
    let report = TrainReport {
        samples: samples.len(),
        train_size: train_indexes.len(),
        test_size: test_indexes.len(),
        test_ratio: options.test_ratio,
        seed: options.seed,
        candidates,
        winner: winner_kind,
        accuracy: winner_accuracy,
        classes,
    };
    Ok(TrainOutcome { artifact, report })
}

/// Splits sample indexes so every class lands in both partitions. Each class
/// sends `round(n * test_ratio)` samples to test, clamped to leave at least
/// one on each side.
fn stratified_split(
    samples: &[Sample],
    test_ratio: f64,
    rng: &mut SplitRng,
) -> Result<(Vec<usize>, Vec<usize>), TrainError> {
    let mut train = Vec::new();
    let mut test = Vec::new();
    for label in [Label::Benign, Label::Malware] {
        let mut indexes: Vec<usize> = samples
            .iter()
            .enumerate()
            .filter(|(_, sample)| sample.label == label)
            .map(|(index, _)| index)
            .collect();
        if indexes.len() < 2 {
            return Err(TrainError::Stratification {
                label,
                partition: "train",
            });
        }
        rng.shuffle(&mut indexes);
        let test_count = ((indexes.len() as f64) * test_ratio).round() as usize;
        let test_count = test_count.clamp(1, indexes.len() - 1);
        test.extend_from_slice(&indexes[..test_count]);
        train.extend_from_slice(&indexes[test_count..]);
    }
    Ok((train, test))
}

fn predict_labels(model: &LinearModel, rows: &[Vec<f64>]) -> Vec<u8> {
    rows.iter()
        .map(|row| u8::from(model.predict_vec(row) >= DECISION_THRESHOLD))
        .collect()
}

fn accuracy(predicted: &[u8], actual: &[u8]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .zip(actual)
        .filter(|(guess, truth)| guess == truth)
        .count();
    hits as f64 / actual.len() as f64
}

fn class_report(label: Label, predicted: &[u8], actual: &[u8]) -> ClassReport {
    let encoded = label.encode();
    let mut true_pos = 0usize;
    let mut false_pos = 0usize;
    let mut false_neg = 0usize;
    let mut support = 0usize;
    for (&guess, &truth) in predicted.iter().zip(actual) {
        if truth == encoded {
            support += 1;
        }
        match (guess == encoded, truth == encoded) {
            (true, true) => true_pos += 1,
            (true, false) => false_pos += 1,
            (false, true) => false_neg += 1,
            (false, false) => {}
        }
    }
    let precision = ratio(true_pos, true_pos + false_pos);
    let recall = ratio(true_pos, true_pos + false_neg);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassReport {
        label,
        precision,
        recall,
        f1,
        support,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Xorshift generator for reproducible splits. Not for anything security
/// sensitive.
struct SplitRng {
    state: u64,
}

impl SplitRng {
    fn new(seed: u64) -> SplitRng {
        // xorshift state must be nonzero
        SplitRng { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_u64() % (i as u64 + 1)) as usize;
            items.swap(i, j);
        }
    }
}
