//! Batch driver: runs the selected pipelines over every trial group.
//!
//! Groups are processed one at a time in discovery order. A failure inside a
//! group is recorded in that group's report and the batch moves on; only a
//! failed discovery of the cache root aborts the run.

use super::categorical::aggregate_categorical;
use super::energy::aggregate_energy;
use crate::error::EvalError;
use crate::models::{BatchReport, GroupReport, OutputOptions, Pipeline, StageOutcome};
use crate::scanner::{locate_groups, matching_files, DirLister, ScanConfig, TrialGroup};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub scan: ScanConfig,
    pub output: OutputOptions,
    /// Pipelines to run, in this order, for each group.
    pub pipelines: Vec<Pipeline>,
    /// Create `final/` when it is missing.
    pub create_final: bool,
    /// Only count matched trial files.
    pub dry_run: bool,
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            output: OutputOptions::default(),
            pipelines: vec![Pipeline::PsiConfig, Pipeline::Energy],
            create_final: true,
            dry_run: false,
            show_progress: false,
        }
    }
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Run one pipeline on one group.
fn run_stage(
    pipeline: Pipeline,
    group: &TrialGroup,
    options: &BatchOptions,
    lister: &dyn DirLister,
) -> Result<StageOutcome, EvalError> {
    match pipeline {
        Pipeline::PsiConfig => {
            let out = aggregate_categorical(group, &options.scan, &options.output, lister)?;
            Ok(StageOutcome::succeeded(
                pipeline,
                out.trials,
                out.output,
                out.table.shape(),
            ))
        }
        Pipeline::Energy => {
            let out = aggregate_energy(group, &options.scan, &options.output, lister)?;
            Ok(StageOutcome::succeeded(
                pipeline,
                out.trials,
                out.output,
                out.table.shape(),
            ))
        }
    }
}

/// Count the files each pipeline would read.
fn plan_stage(
    pipeline: Pipeline,
    group: &TrialGroup,
    options: &BatchOptions,
    lister: &dyn DirLister,
) -> Result<StageOutcome, EvalError> {
    let marker = match pipeline {
        Pipeline::PsiConfig => &options.scan.psi_config_marker,
        Pipeline::Energy => &options.scan.energy_marker,
    };
    let files = matching_files(&group.results, marker, lister)?;
    Ok(StageOutcome::planned(pipeline, files.len()))
}

/// Run every selected pipeline on `group`, isolating failures per stage.
pub fn run_group(group: &TrialGroup, options: &BatchOptions, lister: &dyn DirLister) -> GroupReport {
    info!("Evaluating {}", group.path.display());

    let final_error = if options.dry_run || !options.create_final {
        None
    } else {
        fs::create_dir_all(&group.final_dir).err()
    };

    let stages = options
        .pipelines
        .iter()
        .map(|&pipeline| {
            let result = match &final_error {
                Some(e) => Err(EvalError::io(
                    &group.final_dir,
                    io::Error::new(e.kind(), e.to_string()),
                )),
                None if options.dry_run => plan_stage(pipeline, group, options, lister),
                None => run_stage(pipeline, group, options, lister),
            };

            result.unwrap_or_else(|err| {
                warn!("{} failed for {}: {}", pipeline, group.name(), err);
                StageOutcome::failed(pipeline, &err)
            })
        })
        .collect();

    GroupReport {
        path: group.path.clone(),
        name: group.name(),
        stages,
    }
}

/// Discover groups under `root` and aggregate each of them.
pub fn run_batch(
    root: &Path,
    lister: &dyn DirLister,
    options: &BatchOptions,
) -> Result<BatchReport, EvalError> {
    let start = Instant::now();
    let groups = locate_groups(root, lister)?;

    for pipeline in &options.pipelines {
        info!("{}: evaluating {} total directories", pipeline, groups.len());
    }

    let mut report = BatchReport::new(root.to_path_buf(), options.dry_run);
    let pb = progress_bar(groups.len(), options.show_progress);

    for path in groups {
        let group = TrialGroup::new(path, &options.scan);
        pb.set_message(group.name());

        let group_report = run_group(&group, options, lister);
        debug!(
            "{}: {} of {} stages ok",
            group_report.name,
            group_report
                .stages
                .iter()
                .filter(|s| s.error.is_none())
                .count(),
            group_report.stages.len()
        );
        report.groups.push(group_report);
        pb.inc(1);
    }
    pb.finish_and_clear();

    report.calculate_summary();
    report.metadata.duration_seconds = start.elapsed().as_secs_f64();
    info!(
        "Done: {} groups, {} stages succeeded, {} failed",
        report.metadata.groups_total, report.metadata.stages_succeeded, report.metadata.stages_failed
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StageStatus;
    use crate::scanner::FsLister;
    use tempfile::TempDir;

    fn write_good_group(root: &Path, name: &str) {
        let results = root.join(name).join("results");
        fs::create_dir_all(&results).unwrap();
        fs::write(results.join("psi_config_0.txt"), "1 4\n2 0\n3 9").unwrap();
        fs::write(results.join("0_energy.txt"), "1 0 -1 0 -2\n2 0 -3 0 -4\n").unwrap();
        fs::write(results.join("1_energy.txt"), "1 0 -3 0 -2\n2 0 -3 0 -6\n").unwrap();
    }

    #[test]
    fn test_batch_creates_final_and_writes_outputs() {
        let temp_dir = TempDir::new().unwrap();
        write_good_group(temp_dir.path(), "a");

        let report = run_batch(temp_dir.path(), &FsLister, &BatchOptions::default()).unwrap();

        assert_eq!(report.metadata.groups_total, 1);
        assert_eq!(report.metadata.stages_succeeded, 2);
        assert!(!report.has_failures());

        let stages = &report.groups[0].stages;
        assert_eq!(stages[0].pipeline, Pipeline::PsiConfig);
        assert_eq!(stages[0].shape, Some((1, 4)));
        assert_eq!(stages[1].pipeline, Pipeline::Energy);
        assert_eq!(stages[1].shape, Some((2, 5)));
        assert_eq!(stages[1].trials, 2);

        let final_dir = temp_dir.path().join("a").join("final");
        assert!(final_dir.join("psi_config.txt").exists());
        assert!(final_dir.join("energy.txt").exists());
    }

    #[test]
    fn test_missing_results_is_isolated_to_its_group() {
        let temp_dir = TempDir::new().unwrap();
        write_good_group(temp_dir.path(), "good");
        fs::create_dir(temp_dir.path().join("broken")).unwrap();

        let report = run_batch(temp_dir.path(), &FsLister, &BatchOptions::default()).unwrap();

        assert_eq!(report.metadata.groups_total, 2);
        assert_eq!(report.metadata.stages_succeeded, 2);
        assert_eq!(report.metadata.stages_failed, 2);

        let broken = report.groups.iter().find(|g| g.name == "broken").unwrap();
        assert!(broken
            .stages
            .iter()
            .all(|s| s.error_kind.as_deref() == Some("missing_results")));

        let good = report.groups.iter().find(|g| g.name == "good").unwrap();
        assert!(good.is_ok());
    }

    #[test]
    fn test_huge_category_index_is_isolated_to_its_group() {
        let temp_dir = TempDir::new().unwrap();
        let results = temp_dir.path().join("huge").join("results");
        fs::create_dir_all(&results).unwrap();
        fs::write(results.join("psi_config_0.txt"), "1e20 3\n").unwrap();
        write_good_group(temp_dir.path(), "good");

        let options = BatchOptions {
            pipelines: vec![Pipeline::PsiConfig],
            ..BatchOptions::default()
        };
        let report = run_batch(temp_dir.path(), &FsLister, &options).unwrap();

        assert_eq!(report.metadata.groups_total, 2);
        assert_eq!(report.metadata.stages_failed, 1);
        assert_eq!(report.metadata.stages_succeeded, 1);

        let huge = report.groups.iter().find(|g| g.name == "huge").unwrap();
        assert_eq!(huge.stages[0].error_kind.as_deref(), Some("parse"));
        assert!(!temp_dir.path().join("huge/final/psi_config.txt").exists());

        let good = report.groups.iter().find(|g| g.name == "good").unwrap();
        assert!(good.is_ok());
        assert!(temp_dir.path().join("good/final/psi_config.txt").exists());
    }

    #[test]
    fn test_results_file_fails_both_pipelines() {
        let temp_dir = TempDir::new().unwrap();
        let group = temp_dir.path().join("g");
        fs::create_dir(&group).unwrap();
        fs::write(group.join("results"), "").unwrap();

        let report = run_batch(temp_dir.path(), &FsLister, &BatchOptions::default()).unwrap();

        assert_eq!(report.metadata.stages_failed, 2);
        assert!(report.groups[0]
            .stages
            .iter()
            .all(|s| s.error_kind.as_deref() == Some("missing_results")));
        assert!(!group.join("final/psi_config.txt").exists());
    }

    #[test]
    fn test_energy_failure_does_not_block_psi_config() {
        let temp_dir = TempDir::new().unwrap();
        let results = temp_dir.path().join("g").join("results");
        fs::create_dir_all(&results).unwrap();
        fs::write(results.join("psi_config_0.txt"), "0 1\n").unwrap();
        fs::write(results.join("0_energy.txt"), "1 0 0 0 0\n1 0 0 0 0\n").unwrap();

        let report = run_batch(temp_dir.path(), &FsLister, &BatchOptions::default()).unwrap();
        let stages = &report.groups[0].stages;

        assert_eq!(stages[0].status, StageStatus::Succeeded);
        assert_eq!(stages[1].status, StageStatus::Failed);
        assert_eq!(stages[1].error_kind.as_deref(), Some("ragged_data"));
        assert!(!temp_dir.path().join("g/final/energy.txt").exists());
    }

    #[test]
    fn test_pipeline_selection() {
        let temp_dir = TempDir::new().unwrap();
        write_good_group(temp_dir.path(), "a");

        let options = BatchOptions {
            pipelines: vec![Pipeline::Energy],
            ..BatchOptions::default()
        };
        let report = run_batch(temp_dir.path(), &FsLister, &options).unwrap();

        assert_eq!(report.groups[0].stages.len(), 1);
        assert!(!temp_dir.path().join("a/final/psi_config.txt").exists());
    }

    #[test]
    fn test_dry_run_counts_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        write_good_group(temp_dir.path(), "a");

        let options = BatchOptions {
            dry_run: true,
            ..BatchOptions::default()
        };
        let report = run_batch(temp_dir.path(), &FsLister, &options).unwrap();
        let stages = &report.groups[0].stages;

        assert_eq!(stages[0].status, StageStatus::Planned);
        assert_eq!(stages[0].trials, 1);
        assert_eq!(stages[1].trials, 2);
        assert!(!temp_dir.path().join("a/final").exists());
    }

    #[test]
    fn test_without_create_final_write_fails() {
        let temp_dir = TempDir::new().unwrap();
        write_good_group(temp_dir.path(), "a");

        let options = BatchOptions {
            create_final: false,
            ..BatchOptions::default()
        };
        let report = run_batch(temp_dir.path(), &FsLister, &options).unwrap();

        assert!(report.groups[0]
            .stages
            .iter()
            .all(|s| s.error_kind.as_deref() == Some("io")));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let err = run_batch(
            &temp_dir.path().join("missing"),
            &FsLister,
            &BatchOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "discovery");
    }
}
