//! Persistence for the trained classifier and its scaler. The two halves are
//! written and loaded as a pair so a scan can never mix a model with a
//! transform it was not fitted behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ModelError;
use crate::features::FEATURE_NAMES;
use crate::ml::{ClassifierKind, LinearModel};
use crate::scaler::StandardScaler;

pub const SCHEMA_VERSION: u32 = 1;
pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";

#[derive(serde::Serialize, serde::Deserialize)]
struct ClassifierFile {
    schema_version: u32,
    kind: ClassifierKind,
    feature_names: Vec<String>,
    trained_accuracy: f64,
    model: LinearModel,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ScalerFile {
    schema_version: u32,
    scaler: StandardScaler,
}

#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub kind: ClassifierKind,
    pub model: LinearModel,
    pub scaler: StandardScaler,
    pub trained_accuracy: f64,
}

impl ModelArtifact {
    pub fn classifier_path(dir: &Path) -> PathBuf {
        dir.join(CLASSIFIER_FILE)
    }

    pub fn scaler_path(dir: &Path) -> PathBuf {
        dir.join(SCALER_FILE)
    }

    pub fn save(&self, dir: &Path) -> Result<(), ModelError> {
        fs::create_dir_all(dir)?;
        let classifier = ClassifierFile {
            schema_version: SCHEMA_VERSION,
            kind: self.kind,
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            trained_accuracy: self.trained_accuracy,
            model: self.model.clone(),
        };
        write_json(&Self::classifier_path(dir), &classifier)?;
        let scaler = ScalerFile {
            schema_version: SCHEMA_VERSION,
            scaler: self.scaler.clone(),
        };
        write_json(&Self::scaler_path(dir), &scaler)?;
        info!(dir = %dir.display(), "model artifact saved");
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<ModelArtifact, ModelError> {
        let classifier_path = Self::classifier_path(dir);
        let scaler_path = Self::scaler_path(dir);
        match (classifier_path.is_file(), scaler_path.is_file()) {
            (false, false) => return Err(ModelError::NotFound(dir.to_path_buf())),
            (true, false) => {
                return Err(ModelError::MissingHalf {
                    present: classifier_path,
                    missing: scaler_path,
                })
            }
            (false, true) => {
                return Err(ModelError::MissingHalf {
                    present: scaler_path,
                    missing: classifier_path,
                })
            }
            (true, true) => {}
        }

        let classifier: ClassifierFile = read_json(&classifier_path)?;
        let scaler: ScalerFile = read_json(&scaler_path)?;
        if classifier.schema_version != SCHEMA_VERSION {
            return Err(ModelError::UnsupportedSchema {
                found: classifier.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        if scaler.schema_version != SCHEMA_VERSION {
            return Err(ModelError::UnsupportedSchema {
                found: scaler.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        if classifier.feature_names != FEATURE_NAMES {
            return Err(ModelError::FeatureNamesMismatch {
                found: classifier.feature_names,
            });
        }

        let artifact = ModelArtifact {
            kind: classifier.kind,
            model: classifier.model,
            scaler: scaler.scaler,
            trained_accuracy: classifier.trained_accuracy,
        };
        artifact.validate(dir)?;
        Ok(artifact)
    }

    /// Rejects artifacts whose halves disagree with the feature contract or
    /// carry parameters no prediction could use.
    pub fn validate(&self, dir: &Path) -> Result<(), ModelError> {
        let expected = FEATURE_NAMES.len();
        if self.model.weights.len() != expected {
            return Err(ModelError::ShapeMismatch {
                expected,
                got: self.model.weights.len(),
            });
        }
        if self.scaler.width() != expected {
            return Err(ModelError::ShapeMismatch {
                expected,
                got: self.scaler.width(),
            });
        }
        let usable = self.model.bias.is_finite()
            && self.trained_accuracy.is_finite()
            && self.model.weights.iter().all(|weight| weight.is_finite())
            && self.scaler.means.iter().all(|mean| mean.is_finite())
            && self
                .scaler
                .stds
                .iter()
                .all(|std| std.is_finite() && *std != 0.0);
        if !usable {
            return Err(ModelError::Corrupt {
                path: dir.to_path_buf(),
                reason: "non-finite or zero model parameters".to_string(),
            });
        }
        Ok(())
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    fs::write(path, text)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|err| ModelError::Corrupt {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> ModelArtifact {
        ModelArtifact {
            kind: ClassifierKind::Logistic,
            model: LinearModel {
                bias: 0.1,
                weights: vec![0.5; FEATURE_NAMES.len()],
            },
            scaler: StandardScaler {
                means: vec![0.0; FEATURE_NAMES.len()],
                stds: vec![1.0; FEATURE_NAMES.len()],
            },
            trained_accuracy: 0.95,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_artifact() {
        assert!(sample_artifact().validate(Path::new("model")).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_weight_width() {
        let mut artifact = sample_artifact();
        artifact.model.weights.pop();
        match artifact.validate(Path::new("model")) {
            Err(ModelError::ShapeMismatch { expected, got }) => {
                assert_eq!(expected, FEATURE_NAMES.len());
                assert_eq!(got, FEATURE_NAMES.len() - 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_non_finite_weight() {
        let mut artifact = sample_artifact();
        artifact.model.weights[2] = f64::NAN;
        assert!(matches!(
            artifact.validate(Path::new("model")),
            Err(ModelError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_std() {
        let mut artifact = sample_artifact();
        artifact.scaler.stds[0] = 0.0;
        assert!(matches!(
            artifact.validate(Path::new("model")),
            Err(ModelError::Corrupt { .. })
        ));
    }
}
