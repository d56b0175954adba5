use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::tokenizer::{self, EventCategory};

const PARALLEL_CHUNK_LINES: usize = 4096;

/// Raw per-category counts for one trace. Counts only grow while a trace is
/// being processed; `unique_paths` is resolved from the path set when the
/// accumulator finishes, or comes pre-aggregated from a dataset row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TraceCounters {
    pub file_create: u64,
    pub file_read: u64,
    pub file_write: u64,
    pub reg_create: u64,
    pub reg_set: u64,
    pub process_create: u64,
    pub thread_create: u64,
    pub dll_load: u64,
    pub network_events: u64,
    pub unique_paths: u64,
}

impl TraceCounters {
    fn merge(&mut self, other: &TraceCounters) {
        self.file_create += other.file_create;
        self.file_read += other.file_read;
        self.file_write += other.file_write;
        self.reg_create += other.reg_create;
        self.reg_set += other.reg_set;
        self.process_create += other.process_create;
        self.thread_create += other.thread_create;
        self.dll_load += other.dll_load;
        self.network_events += other.network_events;
        self.unique_paths += other.unique_paths;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IndicatorCounts {
    pub hidden_files: u64,
    pub powershell_exec: u64,
    pub code_injection: u64,
    pub suspicious_ports: u64,
}

impl IndicatorCounts {
    pub fn any(&self) -> bool {
        self.hidden_files > 0
            || self.powershell_exec > 0
            || self.code_injection > 0
            || self.suspicious_ports > 0
    }

    fn merge(&mut self, other: &IndicatorCounts) {
        self.hidden_files += other.hidden_files;
        self.powershell_exec += other.powershell_exec;
        self.code_injection += other.code_injection;
        self.suspicious_ports += other.suspicious_ports;
    }
}

/// Streaming accumulator for one trace. Construct fresh per trace; there is
/// no reset. `merge` exists only so chunked extraction can combine partial
/// accumulators, and path de-duplication survives the merge because the sets
/// are unioned before `finish` counts them.
#[derive(Debug, Default)]
pub struct TraceAccumulator {
    counters: TraceCounters,
    indicators: IndicatorCounts,
    paths: HashSet<String>,
    lines_seen: u64,
    lines_matched: u64,
}

impl TraceAccumulator {
    pub fn new() -> TraceAccumulator {
        TraceAccumulator::default()
    }

    pub fn feed(&mut self, line: &str) {
        let event = tokenizer::tokenize(line);
        let body = event.body.as_str();
        self.lines_seen += 1;
        match event.category {
            Some(EventCategory::File) => {
                if body.contains("create") {
                    self.counters.file_create += 1;
                }
                if body.contains("read") {
                    self.counters.file_read += 1;
                }
                if body.contains("write") {
                    self.counters.file_write += 1;
                }
                if body.contains("hidden") {
                    self.indicators.hidden_files += 1;
                }
            }
            Some(EventCategory::Registry) => {
                if body.contains("create") {
                    self.counters.reg_create += 1;
                }
                if body.contains("set") || body.contains("modify") {
                    self.counters.reg_set += 1;
                }
            }
            Some(EventCategory::Network) => {
                self.counters.network_events += 1;
                if tokenizer::has_suspicious_port(body) {
                    self.indicators.suspicious_ports += 1;
                }
            }
            Some(EventCategory::Process) => {
                self.counters.process_create += 1;
                if body.contains("powershell") {
                    self.indicators.powershell_exec += 1;
                }
            }
            Some(EventCategory::Dll) => {
                self.counters.dll_load += 1;
            }
            Some(EventCategory::Thread) => {
                self.counters.thread_create += 1;
                if body.contains("inject") || body.contains("remote") {
                    self.indicators.code_injection += 1;
                }
            }
            None => {}
        }
        if event.category.is_some() {
            self.lines_matched += 1;
        }
        if tokenizer::is_path_like(body) {
            self.paths.insert(body.trim().to_string());
        }
    }

    pub fn merge(&mut self, other: TraceAccumulator) {
        self.counters.merge(&other.counters);
        self.indicators.merge(&other.indicators);
        self.paths.extend(other.paths);
        self.lines_seen += other.lines_seen;
        self.lines_matched += other.lines_matched;
    }

    pub fn finish(mut self) -> TraceSummary {
        self.counters.unique_paths = self.paths.len() as u64;
        TraceSummary {
            counters: self.counters,
            indicators: self.indicators,
            lines_seen: self.lines_seen,
            lines_matched: self.lines_matched,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TraceSummary {
    pub counters: TraceCounters,
    pub indicators: IndicatorCounts,
    pub lines_seen: u64,
    pub lines_matched: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub parallel: bool,
}

pub fn summarize_lines<'a, I>(lines: I) -> TraceSummary
where
    I: IntoIterator<Item = &'a str>,
{
    let mut acc = TraceAccumulator::new();
    for line in lines {
        acc.feed(line);
    }
    acc.finish()
}

pub fn summarize_text(text: &str) -> TraceSummary {
    summarize_lines(text.lines())
}

/// Chunked reduction for large traces. Counters are order-independent sums,
/// so partial accumulators merge by pointwise addition and path-set union.
/// Produces the same summary as the sequential pass.
pub fn summarize_text_parallel(text: &str) -> TraceSummary {
    use rayon::prelude::*;

    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= PARALLEL_CHUNK_LINES {
        return summarize_lines(lines);
    }
    lines
        .par_chunks(PARALLEL_CHUNK_LINES)
        .map(|chunk| {
            let mut acc = TraceAccumulator::new();
            for line in chunk {
                acc.feed(line);
            }
            acc
        })
        .reduce(TraceAccumulator::new, |mut left, right| {
            left.merge(right);
            left
        })
        .finish()
}

/// Reads a trace tolerantly: invalid UTF-8 is replaced rather than rejected,
/// so a partially garbled trace still yields whatever events remain legible.
pub fn read_trace(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn summarize_path(path: &Path, options: ExtractOptions) -> io::Result<TraceSummary> {
    let text = read_trace(path)?;
    let summary = if options.parallel {
        summarize_text_parallel(&text)
    } else {
        summarize_text(&text)
    };
    debug!(
        path = %path.display(),
        lines = summary.lines_seen,
        matched = summary.lines_matched,
        unique_paths = summary.counters.unique_paths,
        "trace summarized"
    );
    Ok(summary)
}
