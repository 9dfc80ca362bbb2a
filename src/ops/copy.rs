//! Copy an episode under a new instruction

use std::path::PathBuf;

use tracing::info;

use super::{copy_file_logged, DatasetEditor, EpisodePaths, Mode};
use crate::storage::EpisodeData;
use crate::{Error, Result};

/// What a copy will do: source/target paths and the new instruction.
#[derive(Debug, Clone)]
pub struct CopyPlan {
    /// Episode being copied
    pub source_index: usize,
    /// Index the copy will land at (always the current episode count)
    pub target_index: usize,
    /// Instruction text the copy will carry
    pub instruction: String,
    /// File copies `(from, to)` for the data file and existing media
    pub copies: Vec<(PathBuf, PathBuf)>,
}

impl DatasetEditor {
    /// Copy an episode to the end of the dataset under a new instruction.
    ///
    /// The copied data file's `episode_index` column is rewritten to the
    /// target index; the source files are left byte-identical. The
    /// instruction resolves to an existing task on exact text match and
    /// creates a new task record otherwise. `Mode::DryRun` returns the
    /// plan with zero side effects.
    ///
    /// # Errors
    /// `IndexOutOfRange` or `InstructionEmpty` before any mutation;
    /// `FileSystem`/`DataFileCorrupt` if a copy or the relabel fails.
    pub fn copy_episode(
        &mut self,
        source_index: usize,
        instruction: &str,
        mode: Mode,
    ) -> Result<CopyPlan> {
        let count = self.episode_count();
        if source_index >= count {
            return Err(self.out_of_range(source_index));
        }
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(Error::InstructionEmpty);
        }

        let target_index = count;
        let cameras = self.store().info().camera_keys();
        let source = EpisodePaths::resolve(self.layout(), source_index, &cameras);
        let target = EpisodePaths::resolve(self.layout(), target_index, &cameras);

        let mut copies = vec![(source.data.clone(), target.data.clone())];
        for (camera, from) in &source.media {
            if from.exists() {
                copies.push((from.clone(), target.media[camera].clone()));
            }
        }

        let plan = CopyPlan {
            source_index,
            target_index,
            instruction: instruction.to_string(),
            copies,
        };

        if mode.is_dry_run() {
            return Ok(plan);
        }

        info!(source_index, target_index, "copying episode");
        for (from, to) in &plan.copies {
            copy_file_logged(from, to)?;
        }

        // The copied parquet is byte-identical to its source until this
        // relabel; skipping it would leave two files claiming one index.
        EpisodeData::load(&target.data)?
            .with_episode_index(target_index)?
            .write(&target.data)?;

        let length = self
            .store()
            .get_episode(source_index)
            .map_or(0, |record| record.length);
        self.store_mut().find_or_create_task(instruction);
        self.store_mut()
            .add_episode(length, vec![plan.instruction.clone()]);
        let layout = self.layout().clone();
        self.store_mut().persist(&layout)?;

        info!(
            source_index,
            target_index, instruction, "copied episode with new instruction"
        );
        Ok(plan)
    }
}
