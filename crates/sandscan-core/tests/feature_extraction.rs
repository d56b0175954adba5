use sandscan_core::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use sandscan_core::trace::{self, ExtractOptions, TraceCounters, TraceSummary};

fn fixture_path(rel: &str) -> std::path::PathBuf {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    root.join("tests/fixtures").join(rel)
}

fn summarize_fixture(rel: &str) -> TraceSummary {
    trace::summarize_path(&fixture_path(rel), ExtractOptions::default()).expect("fixture read")
}

#[test]
fn test_mixed_fixture_counters() {
    let summary = summarize_fixture("mixed_behavior.log");
    assert_eq!(summary.lines_seen, 12);
    assert_eq!(summary.lines_matched, 10);
    assert_eq!(summary.counters.file_create, 2);
    assert_eq!(summary.counters.file_read, 0);
    assert_eq!(summary.counters.file_write, 1);
    assert_eq!(summary.counters.reg_create, 1);
    assert_eq!(summary.counters.reg_set, 1);
    assert_eq!(summary.counters.network_events, 1);
    assert_eq!(summary.counters.process_create, 2);
    assert_eq!(summary.counters.thread_create, 1);
    assert_eq!(summary.counters.dll_load, 1);
    assert_eq!(summary.counters.unique_paths, 3);
}

#[test]
fn test_mixed_fixture_indicators() {
    let summary = summarize_fixture("mixed_behavior.log");
    assert_eq!(summary.indicators.hidden_files, 1);
    assert_eq!(summary.indicators.powershell_exec, 1);
    assert_eq!(summary.indicators.code_injection, 1);
    assert_eq!(summary.indicators.suspicious_ports, 1);
    assert!(summary.indicators.any());
}

#[test]
fn test_mixed_fixture_features() {
    let summary = summarize_fixture("mixed_behavior.log");
    let features = FeatureVector::from_counters(&summary.counters);
    assert_eq!(features.file_activity, 3.0);
    assert_eq!(features.registry_activity, 2.0);
    assert_eq!(features.process_thread_ratio, 1.0 / 3.0);
    assert_eq!(features.dll_per_process, 1.0 / 3.0);
    assert_eq!(features.path_suspicion, 1.0);
    assert_eq!(features.activity_score, 9.0);
}

#[test]
fn test_summary_is_deterministic() {
    let text = std::fs::read_to_string(fixture_path("mixed_behavior.log")).expect("fixture read");
    assert_eq!(trace::summarize_text(&text), trace::summarize_text(&text));
}

#[test]
fn test_empty_trace_yields_zero_vector() {
    let summary = trace::summarize_text("");
    assert_eq!(summary.counters, TraceCounters::default());
    assert_eq!(summary.lines_seen, 0);
    assert!(!summary.indicators.any());
    let features = FeatureVector::from_counters(&summary.counters);
    assert_eq!(features, FeatureVector::default());
    assert!(features.as_vec().iter().all(|value| *value == 0.0));
}

#[test]
fn test_repeated_paths_count_once() {
    let text = "[file] create C:\\tmp\\a.txt\n\
                [file] create c:\\tmp\\a.txt\n\
                [file] create C:\\TMP\\A.TXT\n\
                [file] create C:\\tmp\\b.txt\n";
    let summary = trace::summarize_text(text);
    assert_eq!(summary.counters.file_create, 4);
    assert_eq!(summary.counters.unique_paths, 2);
}

#[test]
fn test_ten_process_trace_ratios() {
    let mut lines = vec!["[process] create powershell.exe -nop".to_string()];
    for index in 0..9 {
        lines.push(format!("[process] create worker{}.exe", index));
    }
    for _ in 0..5 {
        lines.push("[dll] load C:\\Windows\\System32\\ole32.dll".to_string());
    }
    let text = lines.join("\n");
    let summary = trace::summarize_text(&text);
    assert_eq!(summary.counters.process_create, 10);
    assert_eq!(summary.counters.thread_create, 0);
    assert_eq!(summary.counters.dll_load, 5);
    assert_eq!(summary.indicators.powershell_exec, 1);

    let features = FeatureVector::from_counters(&summary.counters);
    assert_eq!(features.dll_per_process, 5.0 / 11.0);
    assert_eq!(features.process_thread_ratio, 0.0);
}

#[test]
fn test_parallel_extraction_matches_sequential() {
    let mut lines = Vec::with_capacity(10_000);
    for index in 0..10_000u32 {
        let line = match index % 5 {
            0 => format!("[file] create C:\\tmp\\gen{}.bin", index % 97),
            1 => format!("[registry] set HKCU\\Run\\entry{}", index),
            2 => format!("[process] create job{}.exe", index % 13),
            3 => format!("[thread] inject worker {}", index),
            _ => format!("[dll] load C:\\Windows\\System32\\mod{}.dll", index % 41),
        };
        lines.push(line);
    }
    let text = lines.join("\n");
    assert_eq!(
        trace::summarize_text_parallel(&text),
        trace::summarize_text(&text)
    );
}

#[test]
fn test_invalid_utf8_trace_is_tolerated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbled.log");
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"[file] create C:\\tmp\\ok.txt\n");
    bytes.extend_from_slice(&[0xFF, 0xFE, 0x80]);
    bytes.extend_from_slice(b" garbage\n[process] create run.exe\n");
    std::fs::write(&path, bytes).expect("write fixture");

    let summary = trace::summarize_path(&path, ExtractOptions::default()).expect("summarize");
    assert_eq!(summary.counters.file_create, 1);
    assert_eq!(summary.counters.process_create, 1);
    assert_eq!(summary.lines_seen, 3);
    assert_eq!(summary.lines_matched, 2);
}

#[test]
fn test_feature_name_count_matches_vector_length() {
    assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);
    assert_eq!(FeatureVector::default().as_vec().len(), FEATURE_NAMES.len());
}
