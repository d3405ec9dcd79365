//! Dense numeric tables and their whitespace-delimited text format.
//!
//! This is the only on-disk format the tool reads or writes: one row per
//! line, columns separated by whitespace, `#` starting a comment. Output
//! values are written in fixed-precision scientific notation so that every
//! table written here parses back to the same numbers.

use crate::error::EvalError;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Table {
    /// A zero-filled table of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// A zero-filled table, or `None` when `rows * cols` overflows or the
    /// allocation fails.
    pub fn try_zeros(rows: usize, cols: usize) -> Option<Self> {
        let len = rows.checked_mul(cols)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        data.resize(len, 0.0);
        Some(Self { rows, cols, data })
    }

    /// Build a table from equally long columns.
    ///
    /// Returns `None` if the columns differ in length.
    #[allow(dead_code)] // Column-wise construction for fixtures
    pub fn from_columns(columns: &[Vec<f64>]) -> Option<Self> {
        let rows = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != rows) {
            return None;
        }

        let mut table = Self::zeros(rows, columns.len());
        for (c, column) in columns.iter().enumerate() {
            for (r, value) in column.iter().enumerate() {
                table.set(r, c, *value);
            }
        }
        Some(table)
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy of one column, top to bottom.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |r| self.row(r))
    }
}

/// Location and reason of a failed parse, before a path is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct TableParseError {
    /// 1-based line number.
    pub line: usize,
    pub detail: String,
}

/// Parse whitespace-delimited numeric text.
///
/// Blank lines and `#` comments are skipped. All data lines must have the
/// same number of columns.
pub fn parse_table(text: &str) -> Result<Table, TableParseError> {
    let mut cols: Option<usize> = None;
    let mut rows = 0;
    let mut data = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let before = data.len();
        for token in line.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| TableParseError {
                line: idx + 1,
                detail: format!("invalid number '{}'", token),
            })?;
            data.push(value);
        }

        let width = data.len() - before;
        match cols {
            None => cols = Some(width),
            Some(expected) if expected != width => {
                return Err(TableParseError {
                    line: idx + 1,
                    detail: format!("expected {} columns, found {}", expected, width),
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    Ok(Table {
        rows,
        cols: cols.unwrap_or(0),
        data,
    })
}

/// Read and parse a table from disk.
pub fn load_table(path: &Path) -> Result<Table, EvalError> {
    let text = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    parse_table(&text).map_err(|e| EvalError::Parse {
        path: path.to_path_buf(),
        line: e.line,
        detail: e.detail,
    })
}

/// Format one value as `d.ddd…e±XX`.
fn format_value(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}

/// Render a table as text, one row per line.
pub fn format_table(table: &Table, precision: usize) -> String {
    let mut out = String::new();
    for row in table.iter_rows() {
        for (c, value) in row.iter().enumerate() {
            if c > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{}", format_value(*value, precision));
        }
        out.push('\n');
    }
    out
}

/// Write a table to `path`, replacing any existing file.
pub fn save_table(path: &Path, table: &Table, precision: usize) -> Result<(), EvalError> {
    fs::write(path, format_table(table, precision)).map_err(|e| EvalError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_table() {
        let table = parse_table("1 4\n2 0\n3 9\n").unwrap();
        assert_eq!(table.shape(), (3, 2));
        assert_eq!(table.row(2), &[3.0, 9.0]);
        assert_eq!(table.column(1), vec![4.0, 0.0, 9.0]);
    }

    #[test]
    fn test_parse_skips_blank_lines_and_comments() {
        let text = "# header\n\n1 2 3\n  4\t5   6  # trailing\n\n";
        let table = parse_table(text).unwrap();
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.get(1, 2), 6.0);
    }

    #[test]
    fn test_parse_single_row() {
        let table = parse_table("7 11").unwrap();
        assert_eq!(table.shape(), (1, 2));
    }

    #[test]
    fn test_parse_empty() {
        let table = parse_table("").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.shape(), (0, 0));
    }

    #[test]
    fn test_parse_rejects_bad_token() {
        let err = parse_table("1 2\n3 abc\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.detail.contains("abc"));
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let err = parse_table("1 2\n3 4 5\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.detail.contains("expected 2 columns"));
    }

    #[test]
    fn test_format_value_exponent() {
        assert_eq!(format_value(4.0, 3), "4.000e+00");
        assert_eq!(format_value(-0.0015, 2), "-1.50e-03");
        assert_eq!(format_value(12345.0, 1), "1.2e+04");
        assert_eq!(format_value(0.0, 2), "0.00e+00");
    }

    #[test]
    fn test_format_table_layout() {
        let table = Table::from_columns(&[vec![0.0, 1.0], vec![4.0, 9.0]]).unwrap();
        let text = format_table(&table, 1);
        assert_eq!(text, "0.0e+00 4.0e+00\n1.0e+00 9.0e+00\n");
    }

    #[test]
    fn test_from_columns_rejects_uneven() {
        assert!(Table::from_columns(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    }

    #[test]
    fn test_save_then_load_matches() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("energy.txt");

        let table = Table::from_columns(&[
            vec![1.0, 10.0, 100.0],
            vec![-0.731_245_5, -1.25e-7, 3.0e12],
            vec![0.1, 0.2, 0.3],
        ])
        .unwrap();
        save_table(&path, &table, 18).unwrap();
        let loaded = load_table(&path).unwrap();

        assert_eq!(loaded.shape(), table.shape());
        for r in 0..table.nrows() {
            for c in 0..table.ncols() {
                let (a, b) = (table.get(r, c), loaded.get(r, c));
                assert!((a - b).abs() <= 1e-12 * a.abs().max(1.0), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_save_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("psi_config.txt");
        std::fs::write(&path, "stale contents that are not numbers\n").unwrap();

        save_table(&path, &Table::zeros(1, 2), 2).unwrap();
        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded, Table::zeros(1, 2));
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.txt");
        std::fs::write(&path, "1 2\nfoo 3\n").unwrap();

        match load_table(&path) {
            Err(EvalError::Parse { path: p, line, .. }) => {
                assert_eq!(p, path);
                assert_eq!(line, 2);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_try_zeros_rejects_overflowing_shape() {
        assert!(Table::try_zeros(usize::MAX, 2).is_none());
        assert_eq!(Table::try_zeros(2, 3), Some(Table::zeros(2, 3)));
    }
}
