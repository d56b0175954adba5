use crate::trace::TraceCounters;

pub const FEATURE_COUNT: usize = 6;

/// Canonical feature order. Dataset featurization, live extraction, the
/// scaler, and persisted artifacts all consume this one list; column order
/// cannot drift between training and inference.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "file_activity",
    "registry_activity",
    "process_thread_ratio",
    "dll_per_process",
    "path_suspicion",
    "activity_score",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureVector {
    pub file_activity: f64,
    pub registry_activity: f64,
    pub process_thread_ratio: f64,
    pub dll_per_process: f64,
    pub path_suspicion: f64,
    pub activity_score: f64,
}

impl FeatureVector {
    /// The single place the feature arithmetic lives. Ratio denominators are
    /// offset by 1 so traces with zero processes or zero file creates divide
    /// cleanly; an empty trace maps to the zero vector.
    pub fn from_counters(counters: &TraceCounters) -> FeatureVector {
        let file_activity = counters.file_create as f64
            + counters.file_read as f64
            + counters.file_write as f64;
        let registry_activity = counters.reg_create as f64 + counters.reg_set as f64;
        let process_denominator = counters.process_create as f64 + 1.0;
        let process_thread_ratio = counters.thread_create as f64 / process_denominator;
        let dll_per_process = counters.dll_load as f64 / process_denominator;
        let path_suspicion = counters.unique_paths as f64 / (counters.file_create as f64 + 1.0);
        let activity_score = file_activity
            + registry_activity
            + counters.process_create as f64
            + counters.thread_create as f64
            + counters.dll_load as f64;
        FeatureVector {
            file_activity,
            registry_activity,
            process_thread_ratio,
            dll_per_process,
            path_suspicion,
            activity_score,
        }
    }

    /// Flattens in `FEATURE_NAMES` order.
    pub fn as_vec(&self) -> Vec<f64> {
        vec![
            self.file_activity,
            self.registry_activity,
            self.process_thread_ratio,
            self.dll_per_process,
            self.path_suspicion,
            self.activity_score,
        ]
    }
}
