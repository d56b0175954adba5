use serde::{Deserialize, Serialize};

use crate::trace::IndicatorCounts;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Benign,
    Malware,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Benign => "benign",
            Label::Malware => "malware",
        }
    }

    pub fn parse(value: &str) -> Option<Label> {
        match value.trim().to_ascii_lowercase().as_str() {
            "benign" => Some(Label::Benign),
            "malware" => Some(Label::Malware),
            _ => None,
        }
    }

    pub fn encode(&self) -> u8 {
        match self {
            Label::Benign => 0,
            Label::Malware => 1,
        }
    }

    pub fn decode(value: u8) -> Label {
        if value == 0 {
            Label::Benign
        } else {
            Label::Malware
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    HiddenFile,
    PowershellExec,
    CodeInjection,
    SuspiciousPort,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::HiddenFile => "hidden_file",
            IndicatorKind::PowershellExec => "powershell_exec",
            IndicatorKind::CodeInjection => "code_injection",
            IndicatorKind::SuspiciousPort => "suspicious_port",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            IndicatorKind::HiddenFile => Severity::Low,
            IndicatorKind::PowershellExec => Severity::Medium,
            IndicatorKind::CodeInjection => Severity::High,
            IndicatorKind::SuspiciousPort => Severity::High,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            IndicatorKind::HiddenFile => "file operations referencing hidden objects",
            IndicatorKind::PowershellExec => "process activity referencing powershell",
            IndicatorKind::CodeInjection => "thread activity with injection keywords",
            IndicatorKind::SuspiciousPort => "network traffic on a commonly abused port",
        }
    }
}

/// Diagnostic finding surfaced in scan reports. Indicators never feed the
/// classifier; they annotate the verdict for a human reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indicator {
    pub kind: IndicatorKind,
    pub severity: Severity,
    pub count: u64,
    pub description: String,
}

impl Indicator {
    fn new(kind: IndicatorKind, count: u64) -> Indicator {
        Indicator {
            kind,
            severity: kind.severity(),
            count,
            description: kind.describe().to_string(),
        }
    }

    pub fn from_counts(counts: &IndicatorCounts) -> Vec<Indicator> {
        let pairs = [
            (IndicatorKind::CodeInjection, counts.code_injection),
            (IndicatorKind::SuspiciousPort, counts.suspicious_ports),
            (IndicatorKind::PowershellExec, counts.powershell_exec),
            (IndicatorKind::HiddenFile, counts.hidden_files),
        ];
        pairs
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| Indicator::new(*kind, *count))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub malware_probability: f64,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse_is_case_insensitive() {
        assert_eq!(Label::parse("Benign"), Some(Label::Benign));
        assert_eq!(Label::parse("  MALWARE "), Some(Label::Malware));
        assert_eq!(Label::parse("suspicious"), None);
        assert_eq!(Label::parse(""), None);
    }

    #[test]
    fn test_label_encoding_round_trip() {
        assert_eq!(Label::Benign.encode(), 0);
        assert_eq!(Label::Malware.encode(), 1);
        assert_eq!(Label::decode(Label::Benign.encode()), Label::Benign);
        assert_eq!(Label::decode(Label::Malware.encode()), Label::Malware);
    }

    #[test]
    fn test_indicators_skip_zero_counts() {
        let counts = IndicatorCounts {
            code_injection: 2,
            suspicious_ports: 0,
            powershell_exec: 1,
            hidden_files: 0,
        };
        let indicators = Indicator::from_counts(&counts);
        assert_eq!(indicators.len(), 2);
        assert_eq!(indicators[0].kind, IndicatorKind::CodeInjection);
        assert_eq!(indicators[0].severity, Severity::High);
        assert_eq!(indicators[0].count, 2);
        assert_eq!(indicators[1].kind, IndicatorKind::PowershellExec);
    }
}
