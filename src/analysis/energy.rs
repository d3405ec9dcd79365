//! Energy trajectory aggregation.
//!
//! Every trial of a group records `<time> _ <energy> _ <inherent structure
//! energy> ...` on a shared time grid. The trials are stacked, the grid is
//! checked, and the two energy columns are reduced to mean and population
//! std per time point.

use super::stats::{column_stats, min};
use crate::error::EvalError;
use crate::models::OutputOptions;
use crate::scanner::{matching_files, DirLister, ScanConfig, TrialGroup};
use crate::table::{load_table, save_table, Table};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TIME_COLUMN: usize = 0;
pub const ENERGY_COLUMN: usize = 2;
pub const INHERENT_COLUMN: usize = 4;
/// Narrowest row that still carries the inherent structure energy.
pub const MIN_COLUMNS: usize = INHERENT_COLUMN + 1;

/// All trials of one group, indexed `(trial, time row, column)`.
#[derive(Debug, Clone)]
pub struct EnergyTrials {
    trials: Vec<Table>,
    rows: usize,
    cols: usize,
}

impl EnergyTrials {
    /// Stack trials, requiring one common `(rows, cols)` shape with at least
    /// [`MIN_COLUMNS`] columns.
    ///
    /// `group` is only used to label errors.
    pub fn stack(group: &Path, trials: Vec<(PathBuf, Table)>) -> Result<Self, EvalError> {
        let Some((first_path, first)) = trials.first() else {
            return Err(EvalError::ragged(group, "no trials to stack"));
        };
        let (rows, cols) = first.shape();

        for (path, table) in &trials {
            if table.shape() != (rows, cols) {
                return Err(EvalError::ragged(
                    group,
                    format!(
                        "{} has shape {:?}, but {} has shape {:?}",
                        path.display(),
                        table.shape(),
                        first_path.display(),
                        (rows, cols)
                    ),
                ));
            }
        }
        if cols < MIN_COLUMNS {
            return Err(EvalError::ragged(
                group,
                format!("expected at least {} columns, found {}", MIN_COLUMNS, cols),
            ));
        }

        Ok(Self {
            trials: trials.into_iter().map(|(_, t)| t).collect(),
            rows,
            cols,
        })
    }

    /// `(trials, rows, cols)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.trials.len(), self.rows, self.cols)
    }

    /// Number of distinct time values over every trial. All NaN timestamps
    /// count as one value.
    pub fn distinct_times(&self) -> usize {
        let mut times: Vec<f64> = self
            .trials
            .iter()
            .flat_map(|t| t.column(TIME_COLUMN))
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));
        times.dedup_by(|a, b| a == b || (a.is_nan() && b.is_nan()));
        times.len()
    }

    /// The union of all time columns must have exactly `rows` values: no
    /// trial repeats a timestamp and no two trials disagree on the grid.
    pub fn validate_time_grid(&self, group: &Path) -> Result<(), EvalError> {
        let distinct = self.distinct_times();
        if distinct != self.rows {
            return Err(EvalError::ragged(
                group,
                format!(
                    "time grid mismatch: {} distinct time values for {} rows per trial",
                    distinct, self.rows
                ),
            ));
        }
        Ok(())
    }

    /// Column `col` of every trial, shape `trials x rows`.
    pub fn series(&self, col: usize) -> Vec<Vec<f64>> {
        self.trials.iter().map(|t| t.column(col)).collect()
    }

    /// Canonical time axis (the first trial's column 0).
    pub fn time_axis(&self) -> Vec<f64> {
        self.trials[0].column(TIME_COLUMN)
    }
}

/// Per-time-point reduction of a group's trials.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySummary {
    pub time: Vec<f64>,
    pub energy_mean: Vec<f64>,
    pub energy_std: Vec<f64>,
    pub inherent_mean: Vec<f64>,
    pub inherent_std: Vec<f64>,
    /// Diagnostic only, never persisted.
    pub energy_min: Option<f64>,
    pub inherent_min: Option<f64>,
}

impl EnergySummary {
    pub fn from_trials(trials: &EnergyTrials) -> Self {
        let energies = trials.series(ENERGY_COLUMN);
        let inherent = trials.series(INHERENT_COLUMN);
        let (energy_mean, energy_std) = column_stats(&energies);
        let (inherent_mean, inherent_std) = column_stats(&inherent);

        Self {
            time: trials.time_axis(),
            energy_mean,
            energy_std,
            inherent_mean,
            inherent_std,
            energy_min: min(&energies.concat()),
            inherent_min: min(&inherent.concat()),
        }
    }

    /// Columns: time, mean E, std E, mean E_IS, std E_IS.
    pub fn to_table(&self) -> Table {
        let columns = [
            &self.time,
            &self.energy_mean,
            &self.energy_std,
            &self.inherent_mean,
            &self.inherent_std,
        ];
        let mut table = Table::zeros(self.time.len(), columns.len());
        for (col, values) in columns.iter().enumerate() {
            for (row, value) in values.iter().enumerate().take(self.time.len()) {
                table.set(row, col, *value);
            }
        }
        table
    }
}

/// Result of a successful energy aggregation.
#[derive(Debug, Clone)]
pub struct EnergyOutput {
    #[allow(dead_code)] // Unrounded values behind `table`
    pub summary: EnergySummary,
    pub table: Table,
    pub trials: usize,
    pub output: PathBuf,
}

/// Reduce every energy-trajectory file of `group` and write the summary.
///
/// Nothing is written unless every trial parses and the grid checks pass.
pub fn aggregate_energy(
    group: &TrialGroup,
    scan: &ScanConfig,
    output: &OutputOptions,
    lister: &dyn DirLister,
) -> Result<EnergyOutput, EvalError> {
    let files = matching_files(&group.results, &scan.energy_marker, lister)?;
    if files.is_empty() {
        return Err(EvalError::EmptyGroup {
            path: group.results.clone(),
            marker: scan.energy_marker.clone(),
        });
    }

    let mut parsed = Vec::with_capacity(files.len());
    for file in files {
        let table = load_table(&file)?;
        debug!("Read {:?} from {}", table.shape(), file.display());
        parsed.push((file, table));
    }

    let trials = EnergyTrials::stack(&group.path, parsed)?;
    info!(
        "Read trials of shape {:?} from {}",
        trials.shape(),
        group.results.display()
    );
    trials.validate_time_grid(&group.path)?;

    let summary = EnergySummary::from_trials(&trials);
    info!(
        "Loaded energies of shape {:?}; min energy {:?}, min inherent structure energy {:?}",
        (trials.shape().0, trials.shape().1),
        summary.energy_min,
        summary.inherent_min
    );

    let table = summary.to_table();
    let final_path = group.final_dir.join(&output.energy_file);
    info!(
        "Saving energy and energy inherent structure of shape {:?} to {}",
        table.shape(),
        final_path.display()
    );
    save_table(&final_path, &table, output.precision)?;

    Ok(EnergyOutput {
        summary,
        table,
        trials: trials.shape().0,
        output: final_path,
    })
}
