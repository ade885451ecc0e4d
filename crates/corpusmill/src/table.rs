//! Reader for the delimited tables of a compiled corpus.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CorpusError, Result};

/// One data line of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the file, the header being line 1.
    pub line: usize,
    pub cells: Vec<String>,
}

/// A parsed table. Rows are kept as read: a row may have more or fewer cells
/// than the header.
#[derive(Debug, Clone)]
pub struct Table {
    /// File name without path.
    pub file: String,
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    /// Read a whole table.
    pub fn read(path: impl AsRef<Path>, delimiter: u8, quote: u8) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| CorpusError::io(path, e))?;
        let mut reader = reader_builder(delimiter, quote).from_reader(bytes.as_slice());

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result?;
            let line = record
                .position()
                .and_then(|p| usize::try_from(p.line()).ok())
                .unwrap_or(index + 2);
            rows.push(Record {
                line,
                cells: record.iter().map(String::from).collect(),
            });
        }

        Ok(Self {
            file: file_name(path),
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Read only the header line of a table.
    pub fn read_headers(path: impl AsRef<Path>, delimiter: u8, quote: u8) -> Result<Vec<String>> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| CorpusError::io(path, e))?;
        let mut reader = reader_builder(delimiter, quote).from_reader(file);
        Ok(reader.headers()?.iter().map(String::from).collect())
    }

    /// Position of a column in the header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of a column, skipping rows too short to have it.
    pub fn column(&self, name: &str) -> impl Iterator<Item = &str> {
        let index = self.column_index(name);
        self.rows.iter().filter_map(move |record| {
            index
                .and_then(|i| record.cells.get(i))
                .map(String::as_str)
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn reader_builder(delimiter: u8, quote: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .quote(quote)
        .has_headers(true)
        .flexible(true);
    builder
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_keeps_ragged_rows_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.csv");
        fs::write(&path, "token_id,form_id\n1,1\n2\n3,\"3\",x\n").unwrap();

        let table = Table::read(&path, b',', b'"').unwrap();
        assert_eq!(table.file, "token.csv");
        assert_eq!(table.headers, vec!["token_id", "form_id"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows[1].cells, vec!["2"]);
        assert_eq!(table.rows[2].line, 4);
        assert_eq!(table.column("form_id").collect::<Vec<_>>(), vec!["1", "3"]);
    }

    #[test]
    fn test_read_headers_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.tsv");
        fs::write(&path, "segment_id\tchar_range\n").unwrap();
        let headers = Table::read_headers(&path, b'\t', b'"').unwrap();
        assert_eq!(headers, vec!["segment_id", "char_range"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Table::read("/nonexistent/table.csv", b',', b'"');
        assert!(matches!(result, Err(CorpusError::Io { .. })));
    }
}
