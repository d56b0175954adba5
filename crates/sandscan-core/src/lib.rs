//! Behavioral classification of sandbox execution traces: event extraction,
//! feature construction, training, and scoring.

pub mod artifact;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod features;
pub mod ml;
pub mod model;
pub mod report;
pub mod scaler;
pub mod tokenizer;
pub mod trace;
pub mod train;

pub use crate::engine::Analyzer;
pub use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use crate::model::Label;
