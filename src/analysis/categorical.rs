//! Categorical-count (psi_config) aggregation.
//!
//! Each trial writes a sparse histogram of `<category index> <count>` lines
//! whose index set differs from trial to trial. The group's histograms are
//! expanded into one dense `trials x (max_index + 1)` table.
//!
//! Only strictly positive counts are kept. A zero or negative count neither
//! fills its cell nor widens the table, so an explicit zero reads back the
//! same as an index the trial never reported.

use crate::error::EvalError;
use crate::models::OutputOptions;
use crate::scanner::{matching_files, DirLister, ScanConfig, TrialGroup};
use crate::table::{load_table, save_table, Table};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One trial's sparse histogram, keyed by category index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseHistogram {
    counts: BTreeMap<usize, i64>,
}

impl SparseHistogram {
    /// Merge rule, last write wins: pairs are applied in file order and a
    /// repeated index replaces the count stored before it.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, i64)>) -> Self {
        let mut counts = BTreeMap::new();
        for (index, count) in pairs {
            counts.insert(index, count);
        }
        Self { counts }
    }

    #[allow(dead_code)] // Lookup for callers holding a single record
    pub fn get(&self, index: usize) -> Option<i64> {
        self.counts.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Entries with a strictly positive count.
    pub fn positive(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(index, count)| (*index, *count))
    }

    /// Largest index carrying a positive count.
    pub fn max_positive_index(&self) -> Option<usize> {
        self.positive().map(|(index, _)| index).max()
    }
}

/// Result of a successful categorical aggregation.
#[derive(Debug, Clone)]
pub struct CategoricalOutput {
    pub table: Table,
    pub trials: usize,
    pub output: PathBuf,
}

fn parse_failure(path: &Path, row: usize, detail: String) -> EvalError {
    EvalError::Parse {
        path: path.to_path_buf(),
        line: row + 1,
        detail,
    }
}

/// Convert a parsed two-column table into a histogram.
///
/// Values are truncated toward zero. Indices must lie in `0..=max_index`.
pub fn histogram_from_table(
    path: &Path,
    table: &Table,
    max_index: usize,
) -> Result<SparseHistogram, EvalError> {
    if table.is_empty() {
        return Ok(SparseHistogram::default());
    }
    if table.ncols() < 2 {
        return Err(parse_failure(
            path,
            0,
            format!("expected 2 columns (index count), found {}", table.ncols()),
        ));
    }

    let mut pairs = Vec::with_capacity(table.nrows());
    for (row, values) in table.iter_rows().enumerate() {
        let (index, count) = (values[0], values[1]);
        if !index.is_finite() || !count.is_finite() {
            return Err(parse_failure(path, row, "non-finite value in row".to_string()));
        }
        let index = index.trunc();
        if index < 0.0 {
            return Err(parse_failure(
                path,
                row,
                format!("negative category index {}", index),
            ));
        }
        if index > max_index as f64 {
            return Err(parse_failure(
                path,
                row,
                format!("category index {} exceeds limit {}", index, max_index),
            ));
        }
        pairs.push((index as usize, count.trunc() as i64));
    }

    Ok(SparseHistogram::from_pairs(pairs))
}

pub fn read_histogram(path: &Path, max_index: usize) -> Result<SparseHistogram, EvalError> {
    let table = load_table(path)?;
    histogram_from_table(path, &table, max_index)
}

/// Expand histograms into a dense table, one row per record in order.
///
/// Column count is the largest positively-counted index plus one (one column
/// when no record has a positive count). `None` if that shape cannot be
/// allocated.
pub fn dense_table(records: &[SparseHistogram]) -> Option<Table> {
    let mut table = Table::try_zeros(records.len(), max_key(records).checked_add(1)?)?;
    for (row, record) in records.iter().enumerate() {
        for (index, count) in record.positive() {
            table.set(row, index, count as f64);
        }
    }
    Some(table)
}

fn max_key(records: &[SparseHistogram]) -> usize {
    records
        .iter()
        .filter_map(SparseHistogram::max_positive_index)
        .max()
        .unwrap_or(0)
}

/// Merge every categorical-count file of `group` and write the dense table.
pub fn aggregate_categorical(
    group: &TrialGroup,
    scan: &ScanConfig,
    output: &OutputOptions,
    lister: &dyn DirLister,
) -> Result<CategoricalOutput, EvalError> {
    let files = matching_files(&group.results, &scan.psi_config_marker, lister)?;
    debug!(
        "{} files containing '{}' in {}",
        files.len(),
        scan.psi_config_marker,
        group.results.display()
    );

    let records = files
        .iter()
        .map(|f| read_histogram(f, scan.max_category_index))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "{} sparse entries across {} records ({} empty)",
        records.iter().map(SparseHistogram::len).sum::<usize>(),
        records.len(),
        records.iter().filter(|r| r.is_empty()).count()
    );

    let table = dense_table(&records).ok_or_else(|| EvalError::TableTooLarge {
        path: group.results.clone(),
        rows: records.len(),
        cols: max_key(&records).saturating_add(1),
    })?;
    let final_path = group.final_dir.join(&output.psi_config_file);
    info!(
        "Saving psi_config of shape {:?} to {}",
        table.shape(),
        final_path.display()
    );
    save_table(&final_path, &table, output.precision)?;

    Ok(CategoricalOutput {
        table,
        trials: records.len(),
        output: final_path,
    })
}
