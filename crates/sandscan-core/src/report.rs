use std::path::Path;

use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::ml::ClassifierKind;
use crate::model::{Indicator, Label, Prediction};
use crate::trace::{TraceCounters, TraceSummary};

/// Everything a scan produces for one trace, serializable as-is for `--json`
/// output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanReport {
    pub path: String,
    pub sha256: String,
    pub verdict: Label,
    pub malware_probability: f64,
    pub confidence: f64,
    pub model: ClassifierKind,
    pub features: FeatureVector,
    pub counters: TraceCounters,
    pub indicators: Vec<Indicator>,
    pub lines_seen: u64,
    pub lines_matched: u64,
}

impl ScanReport {
    pub fn build(
        path: &Path,
        sha256: String,
        summary: &TraceSummary,
        features: FeatureVector,
        prediction: Prediction,
        model: ClassifierKind,
    ) -> ScanReport {
        ScanReport {
            path: path.display().to_string(),
            sha256,
            verdict: prediction.label,
            malware_probability: prediction.malware_probability,
            confidence: prediction.confidence,
            model,
            features,
            counters: summary.counters,
            indicators: Indicator::from_counts(&summary.indicators),
            lines_seen: summary.lines_seen,
            lines_matched: summary.lines_matched,
        }
    }

    pub fn print_human(&self) {
        println!("trace: {}", self.path);
        println!("sha256: {}", self.sha256);
        println!(
            "verdict: {} (p_malware {:.4}, confidence {:.4}, model {})",
            self.verdict.as_str(),
            self.malware_probability,
            self.confidence,
            self.model.as_str()
        );
        println!(
            "events: {} lines, {} matched, {} unique paths",
            self.lines_seen, self.lines_matched, self.counters.unique_paths
        );
        println!("features:");
        for (name, value) in FEATURE_NAMES.iter().zip(self.features.as_vec()) {
            println!("  {:<22} {:.4}", name, value);
        }
        if self.indicators.is_empty() {
            println!("indicators: none");
        } else {
            println!("indicators:");
            for indicator in &self.indicators {
                println!(
                    "  [{}] {} x{}: {}",
                    indicator.severity.as_str(),
                    indicator.kind.as_str(),
                    indicator.count,
                    indicator.description
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub malware: usize,
    pub benign: usize,
    pub errors: usize,
}

/// One row of a batch scan. A failed trace keeps its place in the batch with
/// the error text instead of aborting the remaining files.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malware_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn scanned(report: &ScanReport) -> BatchEntry {
        BatchEntry {
            path: report.path.clone(),
            verdict: Some(report.verdict),
            malware_probability: Some(report.malware_probability),
            error: None,
        }
    }

    pub fn failed(path: &Path, error: String) -> BatchEntry {
        BatchEntry {
            path: path.display().to_string(),
            verdict: None,
            malware_probability: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn from_entries(entries: Vec<BatchEntry>) -> BatchReport {
        let mut summary = BatchSummary {
            total: entries.len(),
            ..BatchSummary::default()
        };
        for entry in &entries {
            match entry.verdict {
                Some(Label::Malware) => summary.malware += 1,
                Some(Label::Benign) => summary.benign += 1,
                None => summary.errors += 1,
            }
        }
        BatchReport { summary, entries }
    }

    pub fn print_human(&self) {
        for entry in &self.entries {
            if let Some(verdict) = entry.verdict {
                let probability = entry.malware_probability.unwrap_or(0.0);
                println!("{:<8} {:.4}  {}", verdict.as_str(), probability, entry.path);
            } else {
                let reason = entry.error.as_deref().unwrap_or("unknown error");
                println!("{:<8} -       {} ({})", "error", entry.path, reason);
            }
        }
        println!(
            "scanned {} traces: {} malware, {} benign, {} errors",
            self.summary.total, self.summary.malware, self.summary.benign, self.summary.errors
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::IndicatorCounts;

    fn entry(path: &str, verdict: Option<Label>, error: Option<&str>) -> BatchEntry {
        BatchEntry {
            path: path.to_string(),
            verdict,
            malware_probability: verdict.map(|v| match v {
                Label::Malware => 0.9,
                Label::Benign => 0.1,
            }),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_batch_report_counts_outcomes() {
        let report = BatchReport::from_entries(vec![
            entry("a.log", Some(Label::Malware), None),
            entry("b.log", Some(Label::Benign), None),
            entry("c.log", Some(Label::Malware), None),
            entry("d.log", None, Some("unreadable")),
        ]);
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.malware, 2);
        assert_eq!(report.summary.benign, 1);
        assert_eq!(report.summary.errors, 1);
    }

    #[test]
    fn test_scan_report_carries_indicators_and_counts() {
        let summary = TraceSummary {
            counters: TraceCounters {
                file_create: 3,
                unique_paths: 2,
                ..TraceCounters::default()
            },
            indicators: IndicatorCounts {
                powershell_exec: 1,
                ..IndicatorCounts::default()
            },
            lines_seen: 10,
            lines_matched: 4,
        };
        let prediction = Prediction {
            label: Label::Malware,
            malware_probability: 0.93,
            confidence: 0.93,
        };
        let report = ScanReport::build(
            Path::new("sample.log"),
            "abc123".to_string(),
            &summary,
            FeatureVector::from_counters(&summary.counters),
            prediction,
            ClassifierKind::Logistic,
        );
        assert_eq!(report.path, "sample.log");
        assert_eq!(report.verdict, Label::Malware);
        assert_eq!(report.indicators.len(), 1);
        assert_eq!(report.counters.file_create, 3);
        assert_eq!(report.lines_matched, 4);
    }
}
