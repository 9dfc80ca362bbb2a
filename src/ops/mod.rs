//! Episode operations engine
//!
//! Coordinates the path layout, the metadata store and raw file
//! operations so the three representations of a dataset (data files,
//! sidecar records, derived counters) stay mutually consistent across
//! structural edits.
//!
//! Every mutation follows the same state machine:
//!
//! ```text
//! VALIDATE -> (DRY_RUN_REPORT | APPLY) -> PERSIST -> CLEANUP
//! ```
//!
//! Validation failures abort before any file is touched. Once file
//! mutation begins, a failure aborts the remaining steps without rolling
//! back completed moves; the metadata persist runs strictly last, so
//! metadata never claims a state the files have not reached.

mod copy;
mod delete;
mod filter;
mod merge;

pub use copy::CopyPlan;
pub use delete::DeletePlan;
pub use filter::{filter_dataset, FilterOptions, FilterReport, FrameRange};
pub use merge::{merge_datasets, MergeReport};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::layout::DatasetLayout;
use crate::meta::MetadataStore;
use crate::{Error, Result};

/// Whether a mutation is previewed or executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compute and return the plan; perform zero side effects.
    DryRun,
    /// Execute the plan, then persist metadata.
    Apply,
}

impl Mode {
    /// True for [`Mode::DryRun`].
    #[must_use]
    pub const fn is_dry_run(self) -> bool {
        matches!(self, Self::DryRun)
    }
}

/// One (camera, file) entry of an episode's media set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Camera/feature name, e.g. `observation.images.left`
    pub camera: String,
    /// Resolved video file path
    pub path: PathBuf,
    /// Whether the file exists on disk (missing media is reportable,
    /// not fatal)
    pub exists: bool,
}

/// Detail view of one episode, consumed by presentation layers.
#[derive(Debug, Clone)]
pub struct EpisodeDetail {
    /// Episode index
    pub index: usize,
    /// Frame count from the episode record
    pub length: usize,
    /// Ordered task-description strings
    pub tasks: Vec<String>,
    /// Resolved data file path
    pub data_path: PathBuf,
    /// Whether the data file exists on disk
    pub data_exists: bool,
    /// Per-camera media files
    pub media: Vec<MediaFile>,
}

/// Dataset-level summary, consumed by presentation layers.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    /// Dataset root
    pub path: PathBuf,
    /// Episode record count
    pub total_episodes: usize,
    /// Sum of episode lengths
    pub total_frames: usize,
    /// Task record count
    pub total_tasks: usize,
    /// Robot identifier
    pub robot_type: String,
    /// Recording frame rate
    pub fps: f64,
    /// Schema/version tag
    pub codebase_version: Option<String>,
    /// Instruction texts, task-index order
    pub tasks: Vec<String>,
    /// Camera names (video features)
    pub cameras: Vec<String>,
}

/// Table-row projection of one episode for listings.
#[derive(Debug, Clone)]
pub struct EpisodeRow {
    /// Episode index
    pub index: usize,
    /// Frame count
    pub length: usize,
    /// Task-description strings
    pub tasks: Vec<String>,
    /// Whether the data file exists on disk
    pub data_exists: bool,
}

/// Editor for one dataset root.
///
/// Owns a fresh, disk-truthful metadata view for the duration of one
/// invocation; callers discard the editor between top-level commands
/// rather than caching it.
#[derive(Debug)]
pub struct DatasetEditor {
    layout: DatasetLayout,
    store: MetadataStore,
}

impl DatasetEditor {
    /// Open a dataset, validating its structure and loading metadata.
    ///
    /// # Errors
    /// `InvalidDatasetStructure` when a required directory or metadata
    /// file is missing, plus any metadata load error.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = DatasetLayout::new(root);
        validate_structure(&layout)?;
        let store = MetadataStore::load(&layout)?;
        Ok(Self { layout, store })
    }

    /// Path layout for this dataset.
    #[must_use]
    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Metadata store for this dataset.
    #[must_use]
    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Number of episodes.
    #[must_use]
    pub fn episode_count(&self) -> usize {
        self.store.episode_count()
    }

    /// Detail view of one episode, with per-file existence flags.
    ///
    /// # Errors
    /// `IndexOutOfRange` for an index with no record.
    pub fn episode(&self, index: usize) -> Result<EpisodeDetail> {
        let record = self
            .store
            .get_episode(index)
            .ok_or_else(|| self.out_of_range(index))?;

        let data_path = self.layout.data_path(index);
        let media = self
            .store
            .info()
            .camera_keys()
            .into_iter()
            .map(|camera| {
                let path = self.layout.media_path(index, &camera);
                let exists = path.is_file();
                MediaFile {
                    camera,
                    path,
                    exists,
                }
            })
            .collect();

        Ok(EpisodeDetail {
            index,
            length: record.length,
            tasks: record.tasks.clone(),
            data_exists: data_path.is_file(),
            data_path,
            media,
        })
    }

    /// Dataset-level summary.
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let info = self.store.info();
        DatasetSummary {
            path: self.layout.root().to_path_buf(),
            total_episodes: self.store.episode_count(),
            total_frames: self.store.total_frames(),
            total_tasks: self.store.task_count(),
            robot_type: info.robot_type.clone(),
            fps: info.fps,
            codebase_version: info.codebase_version.clone(),
            tasks: self.store.tasks().iter().map(|t| t.task.clone()).collect(),
            cameras: info.camera_keys(),
        }
    }

    /// Table rows for episodes `start .. start+count`, clamped to range.
    #[must_use]
    pub fn list_episodes(&self, start: usize, count: usize) -> Vec<EpisodeRow> {
        self.store
            .episodes()
            .iter()
            .skip(start)
            .take(count)
            .map(|record| EpisodeRow {
                index: record.episode_index,
                length: record.length,
                tasks: record.tasks.clone(),
                data_exists: self.layout.data_path(record.episode_index).is_file(),
            })
            .collect()
    }

    pub(crate) fn store_mut(&mut self) -> &mut MetadataStore {
        &mut self.store
    }

    pub(crate) fn out_of_range(&self, index: usize) -> Error {
        Error::IndexOutOfRange {
            index,
            max: self.store.episode_count().saturating_sub(1),
        }
    }
}

/// Check that the required directories and metadata files exist.
pub(crate) fn validate_structure(layout: &DatasetLayout) -> Result<()> {
    let root = layout.root();
    let required = [
        root.to_path_buf(),
        root.join("meta"),
        root.join("data"),
        layout.info_path(),
        layout.episodes_path(),
        layout.tasks_path(),
    ];
    for path in required {
        if !path.exists() {
            return Err(Error::InvalidDatasetStructure { path });
        }
    }
    Ok(())
}

/// Remove a file, logging the path. Missing files are tolerated.
pub(crate) fn remove_file_logged(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::fs(path, e)),
    }
}

/// Rename a file, creating the target's parent directory. Logs the move.
pub(crate) fn rename_file_logged(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
    }
    fs::rename(from, to).map_err(|e| Error::fs(from, e))?;
    info!(from = %from.display(), to = %to.display(), "renamed");
    Ok(())
}

/// Copy a file, creating the target's parent directory. Logs the copy.
pub(crate) fn copy_file_logged(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| Error::fs(to, e))?;
    info!(from = %from.display(), to = %to.display(), "copied");
    Ok(())
}

/// Remove now-empty chunk and camera directories under `data/` and
/// `videos/`. Best effort: directories that refuse to go are left alone.
pub(crate) fn prune_empty_dirs(root: &Path) {
    for subtree in ["data", "videos"] {
        prune_below(&root.join(subtree));
    }
}

fn prune_below(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            prune_below(&path);
            if fs::remove_dir(&path).is_ok() {
                debug!(path = %path.display(), "pruned empty directory");
            }
        }
    }
}

/// Working set of file paths for one episode: data file plus media files
/// keyed by camera.
pub(crate) struct EpisodePaths {
    pub data: PathBuf,
    pub media: BTreeMap<String, PathBuf>,
}

impl EpisodePaths {
    pub(crate) fn resolve(layout: &DatasetLayout, index: usize, cameras: &[String]) -> Self {
        Self {
            data: layout.data_path(index),
            media: layout.media_paths(index, cameras),
        }
    }
}
