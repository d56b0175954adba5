use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::DatasetError;
use crate::model::Label;
use crate::trace::TraceCounters;

/// Column holding the ground-truth class of each row.
pub const LABEL_COLUMN: &str = "label";

/// Counter columns a training CSV must carry, in the order exports write
/// them. `counters_from_values` and `counter_values` both key off this
/// order, so loading and exporting cannot drift apart.
pub const COUNTER_COLUMNS: [&str; 9] = [
    "file_create",
    "file_read",
    "file_write",
    "reg_create",
    "reg_set",
    "process_create",
    "thread_create",
    "dll_load",
    "unique_paths",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub counters: TraceCounters,
    pub label: Label,
}

/// Reads a labelled dataset from a CSV file. Columns are matched by header
/// name, so extra columns (feature exports, notes) are ignored.
pub fn load_csv(path: &Path) -> Result<Vec<Sample>, DatasetError> {
    let text = fs::read_to_string(path)?;
    let samples = parse_csv(&text)?;
    info!(
        path = %path.display(),
        samples = samples.len(),
        "dataset loaded"
    );
    Ok(samples)
}

fn parse_csv(text: &str) -> Result<Vec<Sample>, DatasetError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(DatasetError::Empty)?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let counter_indexes: Vec<usize> = COUNTER_COLUMNS
        .into_iter()
        .map(|name| find_column(&columns, name))
        .collect::<Result<_, _>>()?;
    let label_index = find_column(&columns, LABEL_COLUMN)?;

    let mut samples = Vec::new();
    for (line_index, line) in lines {
        let line_number = line_index + 1;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        let mut values = [0u64; COUNTER_COLUMNS.len()];
        for (slot, (&column_index, name)) in values
            .iter_mut()
            .zip(counter_indexes.iter().zip(COUNTER_COLUMNS))
        {
            let raw = fields.get(column_index).copied().unwrap_or("");
            *slot = parse_count(raw).ok_or_else(|| DatasetError::BadValue {
                line: line_number,
                column: name.to_string(),
            })?;
        }

        let raw_label = fields.get(label_index).copied().unwrap_or("");
        let label = Label::parse(raw_label).ok_or_else(|| DatasetError::UnknownLabel {
            line: line_number,
            value: raw_label.to_string(),
        })?;

        samples.push(Sample {
            counters: counters_from_values(values),
            label,
        });
    }

    if samples.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(samples)
}

fn find_column(columns: &[&str], name: &'static str) -> Result<usize, DatasetError> {
    columns
        .iter()
        .position(|column| *column == name)
        .ok_or(DatasetError::MissingColumn(name))
}

fn parse_count(raw: &str) -> Option<u64> {
    if raw.is_empty() {
        // empty cells read as zero
        return Some(0);
    }
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value as u64)
}

fn counters_from_values(values: [u64; COUNTER_COLUMNS.len()]) -> TraceCounters {
    TraceCounters {
        file_create: values[0],
        file_read: values[1],
        file_write: values[2],
        reg_create: values[3],
        reg_set: values[4],
        process_create: values[5],
        thread_create: values[6],
        dll_load: values[7],
        unique_paths: values[8],
        network_events: 0,
    }
}

/// Counter values in `COUNTER_COLUMNS` order, for writing export rows.
pub fn counter_values(counters: &TraceCounters) -> [u64; COUNTER_COLUMNS.len()] {
    [
        counters.file_create,
        counters.file_read,
        counters.file_write,
        counters.reg_create,
        counters.reg_set,
        counters.process_create,
        counters.thread_create,
        counters.dll_load,
        counters.unique_paths,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
        let mut columns = COUNTER_COLUMNS.join(",");
        columns.push_str(",label");
        columns
    }

    #[test]
    fn test_parse_csv_reads_rows() {
        let text = format!("{}\n3,1,2,0,4,1,2,5,3,malware\n0,0,0,0,0,1,0,1,0,benign\n", header());
        let samples = parse_csv(&text).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, Label::Malware);
        assert_eq!(samples[0].counters.file_create, 3);
        assert_eq!(samples[0].counters.unique_paths, 3);
        assert_eq!(samples[1].label, Label::Benign);
        assert_eq!(samples[1].counters.dll_load, 1);
    }

    #[test]
    fn test_parse_csv_ignores_extra_columns() {
        let text = format!(
            "path,{},file_activity\na.log,1,0,0,0,0,1,0,1,1,benign,1.0\n",
            header()
        );
        let samples = parse_csv(&text).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].counters.file_create, 1);
    }

    #[test]
    fn test_parse_csv_fills_empty_cells_with_zero() {
        let text = format!("{}\n,,,,,2,,1,,malware\n", header());
        let samples = parse_csv(&text).unwrap();
        assert_eq!(samples[0].counters.file_create, 0);
        assert_eq!(samples[0].counters.process_create, 2);
    }

    #[test]
    fn test_parse_csv_accepts_float_counts() {
        let text = format!("{}\n3.0,1.0,2.0,0.0,4.0,1.0,2.0,5.0,3.0,malware\n", header());
        let samples = parse_csv(&text).unwrap();
        assert_eq!(samples[0].counters.reg_set, 4);
    }

    #[test]
    fn test_parse_csv_rejects_missing_column() {
        let text = "file_create,label\n1,malware\n";
        match parse_csv(text) {
            Err(DatasetError::MissingColumn(name)) => assert_eq!(name, "file_read"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_csv_rejects_bad_value() {
        let text = format!("{}\n1,1,1,1,1,1,1,oops,1,malware\n", header());
        match parse_csv(&text) {
            Err(DatasetError::BadValue { line, column }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "dll_load");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_csv_rejects_negative_count() {
        let text = format!("{}\n1,1,1,1,1,-2,1,1,1,malware\n", header());
        assert!(matches!(
            parse_csv(&text),
            Err(DatasetError::BadValue { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_csv_rejects_unknown_label() {
        let text = format!("{}\n1,1,1,1,1,1,1,1,1,suspicious\n", header());
        match parse_csv(&text) {
            Err(DatasetError::UnknownLabel { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "suspicious");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_csv_rejects_header_only_input() {
        assert!(matches!(parse_csv(&header()), Err(DatasetError::Empty)));
        assert!(matches!(parse_csv(""), Err(DatasetError::Empty)));
    }

    #[test]
    fn test_counter_values_round_trip() {
        let values = [3, 1, 4, 1, 5, 9, 2, 6, 5];
        let counters = counters_from_values(values);
        assert_eq!(counter_values(&counters), values);
    }
}
