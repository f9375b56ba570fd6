//! Append-only `;`-separated table writer.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// One value in a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Float(f64),
    Int(i64),
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<i32> for Cell {
    fn from(v: i32) -> Self {
        Cell::Int(i64::from(v))
    }
}

/// A sample type with a fixed column layout.
pub trait CsvRow {
    const COLUMNS: &'static [&'static str];

    fn cells(&self) -> Vec<Cell>;
}

/// Fixed-point, 6 decimals. Non-finite values use the C spelling (`nan`, `inf`).
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        format!("{v:.6}")
    }
}

/// Render a data row exactly as it lands in the file.
pub fn render_row(cells: &[Cell]) -> String {
    let mut line = String::new();
    for cell in cells {
        match cell {
            Cell::Float(v) => line.push_str(&format_float(*v)),
            Cell::Int(v) => {
                let _ = write!(line, "{v}");
            }
        }
        line.push(';');
    }
    line.push('\n');
    line
}

/// Render the header line for a column set.
pub fn render_header(columns: &[&str]) -> String {
    let mut line = String::new();
    for column in columns {
        line.push_str(column);
        line.push(';');
    }
    line.push('\n');
    line
}

/// A single output table. The header is written on open; rows are appended
/// until [`CsvSink::finish`] flushes and releases the file.
pub struct CsvSink {
    writer: BufWriter<File>,
    path: PathBuf,
    width: usize,
    rows_written: u64,
}

impl CsvSink {
    /// Create (truncate) `path` and write the header for `columns`.
    pub fn create(path: &Path, columns: &[&str]) -> Result<Self, ExportError> {
        let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(render_header(columns).as_bytes())
            .map_err(|e| ExportError::io(path, e))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            width: columns.len(),
            rows_written: 0,
        })
    }

    /// Create a sink laid out for `R`.
    pub fn for_row<R: CsvRow>(path: &Path) -> Result<Self, ExportError> {
        Self::create(path, R::COLUMNS)
    }

    pub fn write_row(&mut self, cells: &[Cell]) -> Result<(), ExportError> {
        debug_assert_eq!(cells.len(), self.width, "row width does not match header");
        self.writer
            .write_all(render_row(cells).as_bytes())
            .map_err(|e| ExportError::io(&self.path, e))?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn write_record<R: CsvRow>(&mut self, row: &R) -> Result<(), ExportError> {
        self.write_row(&row.cells())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and close. Consumes the sink so it cannot be closed twice.
    pub fn finish(mut self) -> Result<u64, ExportError> {
        self.writer
            .flush()
            .map_err(|e| ExportError::io(&self.path, e))?;
        Ok(self.rows_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.000000");
        assert_eq!(format_float(-0.5), "-0.500000");
        assert_eq!(format_float(586610.1234567), "586610.123457");
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_render_row_mixes_ints_and_floats() {
        let row = render_row(&[Cell::Float(2.5), Cell::Int(7), Cell::from(0.1), Cell::from(3)]);
        assert_eq!(row, "2.500000;7;0.100000;3;\n");
    }

    #[test]
    fn test_header_written_once_before_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");

        let mut sink = CsvSink::create(&path, &["a", "b"]).unwrap();
        sink.write_row(&[Cell::Float(1.0), Cell::Int(2)]).unwrap();
        sink.write_row(&[Cell::Float(3.0), Cell::Int(4)]).unwrap();
        assert_eq!(sink.rows_written(), 2);
        assert_eq!(sink.finish().unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a;b;\n1.000000;2;\n3.000000;4;\n");
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("t.csv");
        let err = CsvSink::create(&path, &["a"]).err().unwrap();
        assert!(matches!(err, ExportError::Io { .. }));
        assert!(err.to_string().contains("missing"));
    }
}
