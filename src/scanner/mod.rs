//! Discovery of trial groups and their per-trial result files.
//!
//! Directory listing goes through the [`DirLister`] trait so the aggregators
//! can be driven against synthetic listings in tests.

use crate::error::EvalError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Lists the immediate entries of a directory as full paths.
pub trait DirLister {
    /// Entries in listing order. No sorting is applied.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Lists the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirLister for FsLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            entries.push(entry?.into_path());
        }
        Ok(entries)
    }
}

/// Layout settings for a trial group.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Subdirectory holding the raw per-trial files.
    pub results_dir: String,
    /// Subdirectory receiving the aggregated outputs.
    pub final_dir: String,
    /// File-name substring of categorical-count files.
    pub psi_config_marker: String,
    /// File-name substring of energy-trajectory files.
    pub energy_marker: String,
    /// Category indices above this are rejected as malformed.
    pub max_category_index: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            results_dir: config.results_dir.clone(),
            final_dir: config.final_dir.clone(),
            psi_config_marker: config.psi_config_marker.clone(),
            energy_marker: config.energy_marker.clone(),
            max_category_index: config.max_category_index,
        }
    }
}

/// One parameter configuration on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialGroup {
    pub path: PathBuf,
    pub results: PathBuf,
    pub final_dir: PathBuf,
}

impl TrialGroup {
    pub fn new(path: impl Into<PathBuf>, config: &ScanConfig) -> Self {
        let path = path.into();
        Self {
            results: path.join(&config.results_dir),
            final_dir: path.join(&config.final_dir),
            path,
        }
    }

    /// Short display name (the directory's own name).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Immediate subdirectories of `root`, in listing order.
///
/// Any subdirectory is a trial group; names are not inspected.
pub fn locate_groups(root: &Path, lister: &dyn DirLister) -> Result<Vec<PathBuf>, EvalError> {
    if !root.exists() {
        return Err(EvalError::Discovery {
            path: root.to_path_buf(),
            reason: "path does not exist".to_string(),
        });
    }
    if !root.is_dir() {
        return Err(EvalError::Discovery {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let entries = lister.list(root).map_err(|e| EvalError::Discovery {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let groups: Vec<PathBuf> = entries.into_iter().filter(|p| p.is_dir()).collect();
    debug!("Found {} group directories under {}", groups.len(), root.display());
    Ok(groups)
}

/// Entries of `results_dir` whose file name contains `marker`, in listing order.
pub fn matching_files(
    results_dir: &Path,
    marker: &str,
    lister: &dyn DirLister,
) -> Result<Vec<PathBuf>, EvalError> {
    if results_dir.exists() && !results_dir.is_dir() {
        return Err(EvalError::MissingResults {
            path: results_dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "not a directory"),
        });
    }

    let entries = lister
        .list(results_dir)
        .map_err(|source| EvalError::MissingResults {
            path: results_dir.to_path_buf(),
            source,
        })?;

    Ok(entries
        .into_iter()
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().contains(marker))
                .unwrap_or(false)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Returns a fixed listing regardless of the directory.
    struct StaticLister(Vec<PathBuf>);

    impl DirLister for StaticLister {
        fn list(&self, _dir: &Path) -> io::Result<Vec<PathBuf>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_locate_groups_keeps_only_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("16_0.750_1.000_0_0_6")).unwrap();
        fs::create_dir(temp_dir.path().join("anything")).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "not a group").unwrap();

        let mut groups = locate_groups(temp_dir.path(), &FsLister).unwrap();
        groups.sort();

        assert_eq!(groups.len(), 2);
        assert!(groups[0].ends_with("16_0.750_1.000_0_0_6"));
        assert!(groups[1].ends_with("anything"));
    }

    #[test]
    fn test_locate_groups_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let err = locate_groups(&missing, &FsLister).unwrap_err();
        assert_eq!(err.kind(), "discovery");
    }

    #[test]
    fn test_locate_groups_root_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("cache");
        fs::write(&file, "").unwrap();

        let err = locate_groups(&file, &FsLister).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_locate_groups_preserves_listing_order() {
        let temp_dir = TempDir::new().unwrap();
        let b = temp_dir.path().join("b");
        let a = temp_dir.path().join("a");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();

        let lister = StaticLister(vec![b.clone(), a.clone()]);
        let groups = locate_groups(temp_dir.path(), &lister).unwrap();
        assert_eq!(groups, vec![b, a]);
    }

    #[test]
    fn test_matching_files_filters_by_marker() {
        let temp_dir = TempDir::new().unwrap();
        let results = temp_dir.path().join("results");
        fs::create_dir(&results).unwrap();
        fs::write(results.join("0_psi_config.txt"), "1 1").unwrap();
        fs::write(results.join("0_energy.txt"), "").unwrap();
        fs::write(results.join("README"), "").unwrap();

        let files = matching_files(&results, "psi_config", &FsLister).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("0_psi_config.txt"));
    }

    #[test]
    fn test_matching_files_missing_results() {
        let temp_dir = TempDir::new().unwrap();
        let err = matching_files(&temp_dir.path().join("results"), "energy", &FsLister)
            .unwrap_err();
        assert_eq!(err.kind(), "missing_results");
    }

    #[test]
    fn test_matching_files_results_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let results = temp_dir.path().join("results");
        fs::write(&results, "psi_config").unwrap();

        let err = matching_files(&results, "psi_config", &FsLister).unwrap_err();
        assert_eq!(err.kind(), "missing_results");
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_trial_group_layout() {
        let group = TrialGroup::new("/cache/16_0.750", &ScanConfig::default());
        assert_eq!(group.results, PathBuf::from("/cache/16_0.750/results"));
        assert_eq!(group.final_dir, PathBuf::from("/cache/16_0.750/final"));
        assert_eq!(group.name(), "16_0.750");
    }
}
