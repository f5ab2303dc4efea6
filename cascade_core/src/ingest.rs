//! Edge-list ingestion from delimited text.
//!
//! Rows are `src,dst` or `src dst`; extra columns are ignored. Blank lines
//! and `#` comments are skipped silently, malformed rows with a warning.

use crate::error::CoreError;
use crate::model::NodeId;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Parsed edge pairs plus how many rows were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub edges: Vec<(NodeId, NodeId)>,
    pub skipped: usize,
}

/// Reads `(src, dst)` pairs from any buffered reader.
///
/// # Errors
/// Only an I/O failure of the reader itself aborts; bad rows are skipped.
pub fn read_edges<R: BufRead>(reader: R) -> Result<IngestReport, CoreError> {
    let mut report = IngestReport::default();

    for (index, row) in reader.split(b'\n').enumerate() {
        let row = row?;
        let line_no = index + 1;

        let line = match std::str::from_utf8(&row) {
            Ok(line) => line.trim(),
            Err(_) => {
                warn!("Skipping edge row {}: not valid UTF-8", line_no);
                report.skipped += 1;
                continue;
            }
        };

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_row(line) {
            Ok(pair) => report.edges.push(pair),
            Err(reason) => {
                warn!("Skipping edge row {}: {} ({:?})", line_no, reason, line);
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

/// Opens and reads an edge-list file.
///
/// # Errors
/// `CoreError::EdgeSourceUnavailable` if the file cannot be opened.
pub fn load_edge_file(path: impl AsRef<Path>) -> Result<IngestReport, CoreError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| CoreError::EdgeSourceUnavailable {
        path: path.display().to_string(),
        source,
    })?;

    let report = read_edges(BufReader::new(file))?;
    info!(
        "Loaded {} edges from {} ({} rows skipped)",
        report.edges.len(),
        path.display(),
        report.skipped
    );
    Ok(report)
}

fn parse_row(line: &str) -> Result<(NodeId, NodeId), String> {
    let mut fields = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty());

    let (Some(src), Some(dst)) = (fields.next(), fields.next()) else {
        return Err("expected two columns".to_string());
    };

    let src = src.parse::<NodeId>().map_err(|e| format!("bad source id: {}", e))?;
    let dst = dst.parse::<NodeId>().map_err(|e| format!("bad target id: {}", e))?;
    Ok((src, dst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_reads_comma_and_whitespace_rows() {
        let input = "1,2\n2 3\n3\t4,17\n";
        let report = read_edges(Cursor::new(input)).unwrap();

        assert_eq!(report.edges, vec![(1, 2), (2, 3), (3, 4)]);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_skips_malformed_rows() {
        let input = "src,dst\n1,2\n\n# comment\n5\n-1,3\n4,x\n2,1\n";
        let report = read_edges(Cursor::new(input)).unwrap();

        assert_eq!(report.edges, vec![(1, 2), (2, 1)]);
        assert_eq!(report.skipped, 4);
    }

    #[test]
    fn test_skips_invalid_utf8() {
        let mut input = b"1,2\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"3,4");

        let report = read_edges(Cursor::new(input)).unwrap();
        assert_eq!(report.edges, vec![(1, 2), (3, 4)]);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load_edge_file("/definitely/not/here/edges.csv").unwrap_err();
        assert!(matches!(err, CoreError::EdgeSourceUnavailable { .. }));
    }

    #[test]
    fn test_load_edge_file() {
        let path = std::env::temp_dir().join(format!("cascade_ingest_{}.csv", std::process::id()));
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, "1,2").unwrap();
            writeln!(file, "2,3").unwrap();
        }

        let report = load_edge_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(report.edges, vec![(1, 2), (2, 3)]);
    }
}
