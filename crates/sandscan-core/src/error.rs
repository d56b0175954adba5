use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::features::FEATURE_NAMES;
use crate::model::Label;

#[derive(Debug)]
pub enum DatasetError {
    Io(io::Error),
    Empty,
    MissingColumn(&'static str),
    BadValue { line: usize, column: String },
    UnknownLabel { line: usize, value: String },
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::Io(err) => write!(f, "failed to read dataset: {}", err),
            DatasetError::Empty => write!(f, "dataset contains no samples"),
            DatasetError::MissingColumn(name) => {
                write!(f, "dataset header is missing column '{}'", name)
            }
            DatasetError::BadValue { line, column } => {
                write!(
                    f,
                    "dataset line {}: column '{}' is not a non-negative number",
                    line, column
                )
            }
            DatasetError::UnknownLabel { line, value } => {
                write!(
                    f,
                    "dataset line {}: unknown label '{}' (expected benign or malware)",
                    line, value
                )
            }
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DatasetError {
    fn from(err: io::Error) -> Self {
        DatasetError::Io(err)
    }
}

#[derive(Debug)]
pub enum TrainError {
    EmptyDataset,
    InvalidRatio(f64),
    SingleClass(Label),
    Stratification { label: Label, partition: &'static str },
    Scaler(ModelError),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::EmptyDataset => write!(f, "training dataset has no samples"),
            TrainError::InvalidRatio(ratio) => {
                write!(f, "test ratio {} is outside the open interval (0, 1)", ratio)
            }
            TrainError::SingleClass(label) => {
                write!(
                    f,
                    "dataset contains only {} samples; both classes are required",
                    label.as_str()
                )
            }
            TrainError::Stratification { label, partition } => {
                write!(
                    f,
                    "class {} cannot be represented in the {} partition; at least 2 samples per class are required",
                    label.as_str(),
                    partition
                )
            }
            TrainError::Scaler(err) => write!(f, "normalization failed: {}", err),
        }
    }
}

impl std::error::Error for TrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainError::Scaler(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for TrainError {
    fn from(err: ModelError) -> Self {
        TrainError::Scaler(err)
    }
}

#[derive(Debug)]
pub enum ModelError {
    NotFound(PathBuf),
    MissingHalf { present: PathBuf, missing: PathBuf },
    Corrupt { path: PathBuf, reason: String },
    UnsupportedSchema { found: u32, supported: u32 },
    FeatureNamesMismatch { found: Vec<String> },
    ShapeMismatch { expected: usize, got: usize },
    NoSamples,
    Io(io::Error),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NotFound(path) => {
                write!(f, "no model artifact at {}", path.display())
            }
            ModelError::MissingHalf { present, missing } => {
                write!(
                    f,
                    "found {} but {} is missing; the classifier and scaler load as a pair",
                    present.display(),
                    missing.display()
                )
            }
            ModelError::Corrupt { path, reason } => {
                write!(f, "model artifact at {} is corrupt: {}", path.display(), reason)
            }
            ModelError::UnsupportedSchema { found, supported } => {
                write!(
                    f,
                    "unsupported artifact schema version {} (supported: {})",
                    found, supported
                )
            }
            ModelError::FeatureNamesMismatch { found } => {
                write!(
                    f,
                    "artifact feature names [{}] do not match expected [{}]",
                    found.join(", "),
                    FEATURE_NAMES.join(", ")
                )
            }
            ModelError::ShapeMismatch { expected, got } => {
                write!(
                    f,
                    "feature vector has {} columns but the fitted transform expects {}",
                    got, expected
                )
            }
            ModelError::NoSamples => write!(f, "cannot fit a transform on zero samples"),
            ModelError::Io(err) => write!(f, "model artifact io failure: {}", err),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ModelError {
    fn from(err: io::Error) -> Self {
        ModelError::Io(err)
    }
}
