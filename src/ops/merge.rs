//! Merge multiple datasets into one

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{copy_file_logged, validate_structure, EpisodePaths};
use crate::layout::DatasetLayout;
use crate::meta::MetadataStore;
use crate::storage::EpisodeData;
use crate::{Error, Result};

/// Outcome of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Episodes in the merged dataset
    pub total_episodes: usize,
    /// Deduplicated tasks in the merged dataset
    pub total_tasks: usize,
    /// Total frames in the merged dataset
    pub total_frames: usize,
}

/// Concatenate the episode sequences of several datasets into one.
///
/// Episodes are reindexed to a single contiguous range in input order
/// (all of the first source's episodes, then the second's, and so on).
/// Tasks are deduplicated into a contiguous range after `task_map`
/// substitutions are applied to instruction texts. The destination info
/// record inherits robot type, fps, version and features from the first
/// source; its counters are recomputed at persist.
///
/// Fails fast, before copying any file, if any source root is missing or
/// structurally invalid.
///
/// # Errors
/// `InvalidDatasetStructure` for a missing source, metadata errors from
/// source loads, `FileSystem`/`DataFileCorrupt` from file copies and
/// relabels.
pub fn merge_datasets(
    sources: &[PathBuf],
    dest: &Path,
    task_map: Option<&BTreeMap<String, String>>,
) -> Result<MergeReport> {
    if sources.is_empty() {
        return Err(Error::InvalidDatasetStructure {
            path: dest.to_path_buf(),
        });
    }

    // Validate every source before any copy.
    let mut loaded = Vec::with_capacity(sources.len());
    for source in sources {
        let layout = DatasetLayout::new(source);
        validate_structure(&layout)?;
        let store = MetadataStore::load(&layout)?;
        loaded.push((layout, store));
    }

    let dest_layout = DatasetLayout::new(dest);
    fs::create_dir_all(dest_layout.meta_dir()).map_err(|e| Error::fs(dest_layout.meta_dir(), e))?;

    let mut merged = MetadataStore::new(loaded[0].1.info().clone());

    for (source_layout, source_store) in &loaded {
        let cameras = source_store.info().camera_keys();
        for record in source_store.episodes() {
            let mut record = record.clone();
            record.tasks = record
                .tasks
                .iter()
                .map(|task| remap(task, task_map))
                .collect();
            for task in &record.tasks {
                merged.find_or_create_task(task);
            }

            let source_paths =
                EpisodePaths::resolve(source_layout, record.episode_index, &cameras);
            let new_index = merged.append_episode_record(record);
            let target_paths = EpisodePaths::resolve(&dest_layout, new_index, &cameras);

            copy_file_logged(&source_paths.data, &target_paths.data)?;
            EpisodeData::load(&target_paths.data)?
                .with_episode_index(new_index)?
                .write(&target_paths.data)?;

            for (camera, from) in &source_paths.media {
                if from.exists() {
                    copy_file_logged(from, &target_paths.media[camera])?;
                }
            }
        }
    }

    let report = MergeReport {
        total_episodes: merged.episode_count(),
        total_tasks: merged.task_count(),
        total_frames: merged.total_frames(),
    };
    merged.persist(&dest_layout)?;

    info!(
        sources = sources.len(),
        episodes = report.total_episodes,
        tasks = report.total_tasks,
        dest = %dest.display(),
        "merged datasets"
    );
    Ok(report)
}

fn remap(task: &str, task_map: Option<&BTreeMap<String, String>>) -> String {
    task_map
        .and_then(|map| map.get(task))
        .cloned()
        .unwrap_or_else(|| task.to_string())
}
