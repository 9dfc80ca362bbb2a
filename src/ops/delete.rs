//! Delete an episode and compact the remaining indices

use std::path::PathBuf;

use tracing::info;

use super::{
    prune_empty_dirs, remove_file_logged, rename_file_logged, DatasetEditor, EpisodePaths, Mode,
};
use crate::Result;

/// What a deletion will do: files removed, files shifted down one index.
#[derive(Debug, Clone)]
pub struct DeletePlan {
    /// Episode being removed
    pub index: usize,
    /// Files that will be removed (those that exist)
    pub removals: Vec<PathBuf>,
    /// Ascending-order renames `(from, to)` for every later episode
    pub renames: Vec<(PathBuf, PathBuf)>,
}

impl DatasetEditor {
    /// Delete an episode, renumbering every later episode down by one.
    ///
    /// File moves run in strictly ascending index order so no file is
    /// overwritten before it is read, and the metadata persist runs only
    /// after every move has succeeded. `Mode::DryRun` returns the plan
    /// with zero side effects.
    ///
    /// Tasks orphaned by the deletion keep their records; compaction of
    /// the task set is a separate concern.
    ///
    /// # Errors
    /// `IndexOutOfRange` before any mutation; `FileSystem` if a remove
    /// or rename fails mid-batch (completed moves are not rolled back).
    pub fn delete_episode(&mut self, index: usize, mode: Mode) -> Result<DeletePlan> {
        let count = self.episode_count();
        if index >= count {
            return Err(self.out_of_range(index));
        }

        let cameras = self.store().info().camera_keys();
        let plan = self.plan_delete(index, count, &cameras);

        if mode.is_dry_run() {
            return Ok(plan);
        }

        info!(index, "deleting episode");
        for path in &plan.removals {
            remove_file_logged(path)?;
        }
        for (from, to) in &plan.renames {
            rename_file_logged(from, to)?;
        }

        self.store_mut().remove_episode(index)?;
        let layout = self.layout().clone();
        self.store_mut().persist(&layout)?;

        prune_empty_dirs(layout.root());
        info!(index, "deleted episode and renumbered remaining episodes");
        Ok(plan)
    }

    fn plan_delete(&self, index: usize, count: usize, cameras: &[String]) -> DeletePlan {
        let target = EpisodePaths::resolve(self.layout(), index, cameras);
        let mut removals = Vec::new();
        if target.data.exists() {
            removals.push(target.data);
        }
        removals.extend(target.media.into_values().filter(|p| p.exists()));

        let mut renames = Vec::new();
        for current in index + 1..count {
            let from = EpisodePaths::resolve(self.layout(), current, cameras);
            let to = EpisodePaths::resolve(self.layout(), current - 1, cameras);
            if from.data.exists() {
                renames.push((from.data, to.data));
            }
            for (camera, from_path) in from.media {
                if from_path.exists() {
                    renames.push((from_path, to.media[&camera].clone()));
                }
            }
        }

        DeletePlan {
            index,
            removals,
            renames,
        }
    }
}
