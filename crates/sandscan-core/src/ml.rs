/// Probability cutoff separating benign from malware verdicts.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Scoring seam for fitted models. Implementations report the probability of
/// the malware class in [0, 1]. Keeping the seam here lets a future ensemble
/// policy slot in without touching the feature contract.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, input: &[f64]) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Logistic,
    PassiveAggressive,
}

impl ClassifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierKind::Logistic => "logistic",
            ClassifierKind::PassiveAggressive => "passive_aggressive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LinearModel {
    pub bias: f64,
    pub weights: Vec<f64>,
}

impl LinearModel {
    pub fn zeroed(width: usize) -> LinearModel {
        LinearModel {
            bias: 0.0,
            weights: vec![0.0; width],
        }
    }

    pub fn raw_score(&self, input: &[f64]) -> f64 {
        let mut sum = self.bias;
        for (weight, value) in self.weights.iter().zip(input) {
            sum += weight * value;
        }
        sum
    }

    pub fn predict_vec(&self, input: &[f64]) -> f64 {
        sigmoid(self.raw_score(input))
    }
}

impl Classifier for LinearModel {
    fn predict_proba(&self, input: &[f64]) -> f64 {
        self.predict_vec(input)
    }
}

/// Logistic regression fitted by per-sample gradient descent with L2 decay.
/// Updates run in sample order, so a fixed train ordering gives identical
/// weights on every run.
#[derive(Debug, Clone)]
pub struct LogisticTrainer {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for LogisticTrainer {
    fn default() -> Self {
        LogisticTrainer {
            epochs: 200,
            learning_rate: 0.1,
            l2: 1e-4,
        }
    }
}

impl LogisticTrainer {
    pub fn fit(&self, rows: &[Vec<f64>], labels: &[u8]) -> LinearModel {
        let width = rows.first().map_or(0, Vec::len);
        let mut model = LinearModel::zeroed(width);
        for _ in 0..self.epochs {
            for (row, label) in rows.iter().zip(labels) {
                let predicted = model.predict_vec(row);
                let error = predicted - f64::from(*label);
                for (weight, value) in model.weights.iter_mut().zip(row) {
                    *weight -= self.learning_rate * (error * value + self.l2 * *weight);
                }
                model.bias -= self.learning_rate * error;
            }
        }
        model
    }
}

/// PA-I margin learner: no update inside the margin, otherwise a step sized
/// by the hinge loss over the squared input norm, capped by `aggressiveness`.
#[derive(Debug, Clone)]
pub struct PassiveAggressiveTrainer {
    pub epochs: usize,
    pub aggressiveness: f64,
}

impl Default for PassiveAggressiveTrainer {
    fn default() -> Self {
        PassiveAggressiveTrainer {
            epochs: 20,
            aggressiveness: 1.0,
        }
    }
}

impl PassiveAggressiveTrainer {
    pub fn fit(&self, rows: &[Vec<f64>], labels: &[u8]) -> LinearModel {
        let width = rows.first().map_or(0, Vec::len);
        let mut model = LinearModel::zeroed(width);
        for _ in 0..self.epochs {
            for (row, label) in rows.iter().zip(labels) {
                let target = if *label == 1 { 1.0 } else { -1.0 };
                let margin = model.raw_score(row);
                let loss = (1.0 - target * margin).max(0.0);
                if loss == 0.0 {
                    continue;
                }
                // the bias input contributes 1 to the squared norm
                let norm_sq: f64 = row.iter().map(|value| value * value).sum::<f64>() + 1.0;
                let step = (loss / norm_sq).min(self.aggressiveness);
                for (weight, value) in model.weights.iter_mut().zip(row) {
                    *weight += step * target * value;
                }
                model.bias += step * target;
            }
        }
        model
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
