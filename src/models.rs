//! Data models shared by the pipelines and the batch report.
//!
//! The per-trial record types live next to the pipeline that reads them;
//! this module holds what crosses module boundaries: which pipeline ran,
//! how each group fared, and the report assembled from those outcomes.

use crate::error::EvalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One of the two independent reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// Categorical-count histograms merged into a dense table.
    PsiConfig,
    /// Energy trajectories reduced to mean/std per time point.
    Energy,
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipeline::PsiConfig => write!(f, "PsiC"),
            Pipeline::Energy => write!(f, "Energy"),
        }
    }
}

/// Output file settings for both pipelines.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// File name of the categorical table inside `final/`.
    pub psi_config_file: String,
    /// File name of the energy summary inside `final/`.
    pub energy_file: String,
    /// Digits after the decimal point in written values.
    pub precision: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            psi_config_file: "psi_config.txt".to_string(),
            energy_file: "energy.txt".to_string(),
            precision: 18,
        }
    }
}

impl From<&crate::config::OutputConfig> for OutputOptions {
    fn from(config: &crate::config::OutputConfig) -> Self {
        Self {
            psi_config_file: config.psi_config_file.clone(),
            energy_file: config.energy_file.clone(),
            precision: config.precision,
        }
    }
}

/// How a single pipeline stage ended for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Succeeded,
    Failed,
    /// Dry run: files were counted, nothing was read or written.
    Planned,
}

impl StageStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            StageStatus::Succeeded => "✅",
            StageStatus::Failed => "❌",
            StageStatus::Planned => "📋",
        }
    }
}

/// Result of one pipeline on one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub pipeline: Pipeline,
    pub status: StageStatus,
    /// Number of trial files matched.
    pub trials: usize,
    /// Written file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// `(rows, cols)` of the written table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<(usize, usize)>,
    /// Stable error code (see `EvalError::kind`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageOutcome {
    pub fn succeeded(
        pipeline: Pipeline,
        trials: usize,
        output: PathBuf,
        shape: (usize, usize),
    ) -> Self {
        Self {
            pipeline,
            status: StageStatus::Succeeded,
            trials,
            output: Some(output),
            shape: Some(shape),
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(pipeline: Pipeline, err: &EvalError) -> Self {
        Self {
            pipeline,
            status: StageStatus::Failed,
            trials: 0,
            output: None,
            shape: None,
            error_kind: Some(err.kind().to_string()),
            error: Some(err.to_string()),
        }
    }

    pub fn planned(pipeline: Pipeline, trials: usize) -> Self {
        Self {
            pipeline,
            status: StageStatus::Planned,
            trials,
            output: None,
            shape: None,
            error_kind: None,
            error: None,
        }
    }
}

/// Every stage run for one trial group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    pub path: PathBuf,
    pub name: String,
    pub stages: Vec<StageOutcome>,
}

impl GroupReport {
    pub fn is_ok(&self) -> bool {
        self.stages.iter().all(|s| s.status != StageStatus::Failed)
    }
}

/// Metadata about one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub cache_root: PathBuf,
    pub run_date: DateTime<Utc>,
    pub dry_run: bool,
    pub groups_total: usize,
    pub stages_succeeded: usize,
    pub stages_failed: usize,
    pub duration_seconds: f64,
}

/// Outcome of every group in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub metadata: BatchMetadata,
    pub groups: Vec<GroupReport>,
}

impl BatchReport {
    pub fn new(cache_root: PathBuf, dry_run: bool) -> Self {
        Self {
            metadata: BatchMetadata {
                cache_root,
                run_date: Utc::now(),
                dry_run,
                groups_total: 0,
                stages_succeeded: 0,
                stages_failed: 0,
                duration_seconds: 0.0,
            },
            groups: Vec::new(),
        }
    }

    /// Recount groups and stage outcomes into the metadata.
    pub fn calculate_summary(&mut self) {
        let stages = self.groups.iter().flat_map(|g| &g.stages);
        let (mut ok, mut failed) = (0, 0);
        for stage in stages {
            match stage.status {
                StageStatus::Succeeded => ok += 1,
                StageStatus::Failed => failed += 1,
                StageStatus::Planned => {}
            }
        }
        self.metadata.groups_total = self.groups.len();
        self.metadata.stages_succeeded = ok;
        self.metadata.stages_failed = failed;
    }

    /// Failed stages with the group they belong to, in run order.
    pub fn failures(&self) -> Vec<(&GroupReport, &StageOutcome)> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.stages
                    .iter()
                    .filter(|s| s.status == StageStatus::Failed)
                    .map(move |s| (g, s))
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.groups.iter().any(|g| !g.is_ok())
    }
}
