use std::fs;
use std::path::Path;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::artifact::ModelArtifact;
use crate::error::ModelError;
use crate::features::FeatureVector;
use crate::ml::{Classifier, ClassifierKind, DECISION_THRESHOLD};
use crate::model::{Label, Prediction};
use crate::report::ScanReport;
use crate::scaler::StandardScaler;
use crate::trace::{self, ExtractOptions};

/// A loaded model ready to score traces. Construction requires a complete
/// artifact, so an `Analyzer` can never be asked to predict before a model
/// is in place.
pub struct Analyzer {
    kind: ClassifierKind,
    trained_accuracy: f64,
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
}

impl Analyzer {
    pub fn new(artifact: ModelArtifact) -> Analyzer {
        Analyzer {
            kind: artifact.kind,
            trained_accuracy: artifact.trained_accuracy,
            scaler: artifact.scaler,
            classifier: Box::new(artifact.model),
        }
    }

    pub fn load(dir: &Path) -> Result<Analyzer, ModelError> {
        let artifact = ModelArtifact::load(dir)?;
        info!(
            dir = %dir.display(),
            kind = artifact.kind.as_str(),
            trained_accuracy = artifact.trained_accuracy,
            "model loaded"
        );
        Ok(Analyzer::new(artifact))
    }

    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    pub fn trained_accuracy(&self) -> f64 {
        self.trained_accuracy
    }

    /// Scores one feature vector. Confidence is the probability mass behind
    /// the returned label, so it always lands in [0.5, 1].
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, ModelError> {
        let scaled = self.scaler.transform(&features.as_vec())?;
        let malware_probability = self.classifier.predict_proba(&scaled);
        let label = if malware_probability >= DECISION_THRESHOLD {
            Label::Malware
        } else {
            Label::Benign
        };
        let confidence = if label == Label::Malware {
            malware_probability
        } else {
            1.0 - malware_probability
        };
        Ok(Prediction {
            label,
            malware_probability,
            confidence,
        })
    }

    /// Full pipeline over one trace file: read, summarize, featurize, score.
    pub fn analyze_path(&self, path: &Path, options: ExtractOptions) -> anyhow::Result<ScanReport> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read trace {}", path.display()))?;
        let sha256 = sha256_hex(&bytes);
        let text = String::from_utf8_lossy(&bytes);
        let summary = if options.parallel {
            trace::summarize_text_parallel(&text)
        } else {
            trace::summarize_text(&text)
        };
        let features = FeatureVector::from_counters(&summary.counters);
        let prediction = self.predict(&features)?;
        debug!(
            path = %path.display(),
            verdict = prediction.label.as_str(),
            probability = prediction.malware_probability,
            "trace analyzed"
        );
        Ok(ScanReport::build(
            path, sha256, &summary, features, prediction, self.kind,
        ))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_NAMES;
    use crate::ml::LinearModel;

    fn identity_analyzer(bias: f64, weights: Vec<f64>) -> Analyzer {
        Analyzer::new(ModelArtifact {
            kind: ClassifierKind::Logistic,
            model: LinearModel { bias, weights },
            scaler: StandardScaler {
                means: vec![0.0; FEATURE_NAMES.len()],
                stds: vec![1.0; FEATURE_NAMES.len()],
            },
            trained_accuracy: 1.0,
        })
    }

    #[test]
    fn test_predict_confidence_backs_the_label() {
        let analyzer = identity_analyzer(-3.0, vec![0.0; FEATURE_NAMES.len()]);
        let benign = analyzer.predict(&FeatureVector::default()).unwrap();
        assert_eq!(benign.label, Label::Benign);
        assert!(benign.confidence > 0.5);
        assert!((benign.confidence - (1.0 - benign.malware_probability)).abs() < 1e-12);

        let analyzer = identity_analyzer(3.0, vec![0.0; FEATURE_NAMES.len()]);
        let malware = analyzer.predict(&FeatureVector::default()).unwrap();
        assert_eq!(malware.label, Label::Malware);
        assert_eq!(malware.confidence, malware.malware_probability);
    }

    #[test]
    fn test_threshold_boundary_reads_as_malware() {
        let analyzer = identity_analyzer(0.0, vec![0.0; FEATURE_NAMES.len()]);
        let prediction = analyzer.predict(&FeatureVector::default()).unwrap();
        assert_eq!(prediction.malware_probability, 0.5);
        assert_eq!(prediction.label, Label::Malware);
    }

    #[test]
    fn test_sha256_hex_known_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
