//! Error types for the aggregation pipelines.
//!
//! Every failure carries the path it concerns so the batch report can say
//! which group and which file went wrong.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering groups or reducing their trials.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The cache root is missing, not a directory, or cannot be listed.
    /// Fatal for the whole run.
    #[error("cannot discover trial groups under {}: {reason}", .path.display())]
    Discovery { path: PathBuf, reason: String },

    /// A group's `results/` directory is missing or unreadable.
    #[error("results directory {} is missing or unreadable: {source}", .path.display())]
    MissingResults {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Energy trials whose shapes or time grids disagree.
    #[error("ragged data in {}: {detail}", .path.display())]
    RaggedData { path: PathBuf, detail: String },

    /// Malformed numeric text.
    #[error("parse error in {} at line {line}: {detail}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    /// No trial file matched the marker for a pipeline that needs one.
    #[error("no files containing '{marker}' under {}", .path.display())]
    EmptyGroup { path: PathBuf, marker: String },

    /// A dense table whose shape cannot be allocated.
    #[error("table of {rows} x {cols} for {} is too large to allocate", .path.display())]
    TableTooLarge {
        path: PathBuf,
        rows: usize,
        cols: usize,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EvalError {
    /// Stable machine readable code for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Discovery { .. } => "discovery",
            EvalError::MissingResults { .. } => "missing_results",
            EvalError::RaggedData { .. } => "ragged_data",
            EvalError::Parse { .. } => "parse",
            EvalError::EmptyGroup { .. } => "empty_group",
            EvalError::TableTooLarge { .. } => "table_too_large",
            EvalError::Io { .. } => "io",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn ragged(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        EvalError::RaggedData {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
