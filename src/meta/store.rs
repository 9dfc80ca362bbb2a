//! Metadata store: the three sidecar record sets and their invariants
//!
//! Owns the in-memory `InfoRecord`, episode records and task records for
//! the duration of one engine invocation. Load validates referential
//! integrity (contiguous indices, resolvable task references); persist
//! recomputes the derived counters from the record sets and rewrites all
//! three files via write-temp-then-rename, never trusting a stale counter.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use super::{EpisodeRecord, InfoRecord, TaskRecord};
use crate::layout::DatasetLayout;
use crate::{Error, Result};

/// In-memory view of `meta/info.json` + `episodes.jsonl` + `tasks.jsonl`.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    info: InfoRecord,
    episodes: Vec<EpisodeRecord>,
    tasks: Vec<TaskRecord>,
}

impl MetadataStore {
    /// Create a store with the given info record and empty record sets.
    ///
    /// Used when deriving a new dataset (merge, filter); counters are
    /// recomputed at persist time regardless of what `info` claims.
    #[must_use]
    pub fn new(info: InfoRecord) -> Self {
        Self {
            info,
            episodes: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Read the three sidecar files into memory.
    ///
    /// Zero-length jsonl files parse to zero records. Episode records
    /// carrying only a legacy singular `task_index` get their task text
    /// resolved against the task records here.
    ///
    /// # Errors
    /// `MalformedMetadata` for unparsable content or non-contiguous
    /// indices, `MissingRequiredField` for an incomplete info record,
    /// `FileSystem` when a sidecar file cannot be read.
    pub fn load(layout: &DatasetLayout) -> Result<Self> {
        let info_path = layout.info_path();
        let text = fs::read_to_string(&info_path).map_err(|e| Error::fs(&info_path, e))?;
        let info = InfoRecord::parse(&text, &info_path)?;

        let tasks: Vec<TaskRecord> = read_jsonl(&layout.tasks_path())?;
        let mut episodes: Vec<EpisodeRecord> = read_jsonl(&layout.episodes_path())?;

        check_contiguous(
            episodes.iter().map(|e| e.episode_index),
            &layout.episodes_path(),
            "episode_index",
        )?;
        check_contiguous(
            tasks.iter().map(|t| t.task_index),
            &layout.tasks_path(),
            "task_index",
        )?;

        for episode in &mut episodes {
            if episode.tasks.is_empty() {
                if let Some(task_index) = episode.legacy_task_index() {
                    if let Some(task) = tasks.get(task_index) {
                        episode.tasks.push(task.task.clone());
                    }
                }
            }
            // The tasks list is canonical from here on; a retained
            // singular reference would go stale after renumbering.
            episode.extra.remove("task_index");
        }

        Ok(Self {
            info,
            episodes,
            tasks,
        })
    }

    /// Dataset-level info record.
    #[must_use]
    pub fn info(&self) -> &InfoRecord {
        &self.info
    }

    /// Number of episode records.
    #[must_use]
    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// Number of task records.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Sum of episode frame lengths.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.episodes.iter().map(|e| e.length).sum()
    }

    /// Episode record by index; absent for out-of-range indices.
    #[must_use]
    pub fn get_episode(&self, index: usize) -> Option<&EpisodeRecord> {
        self.episodes.get(index)
    }

    /// All episode records, index order.
    #[must_use]
    pub fn episodes(&self) -> &[EpisodeRecord] {
        &self.episodes
    }

    /// All task records, index order.
    #[must_use]
    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    /// Instruction text for a task index.
    #[must_use]
    pub fn task_text(&self, task_index: usize) -> Option<&str> {
        self.tasks.get(task_index).map(|t| t.task.as_str())
    }

    /// Append an episode record at the next contiguous index.
    ///
    /// Stamps the record with the current UTC time and returns the new
    /// index.
    pub fn add_episode(&mut self, length: usize, tasks: Vec<String>) -> usize {
        let index = self.episodes.len();
        let mut record = EpisodeRecord::new(index, length, tasks);
        record.timestamp = Some(Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string());
        self.episodes.push(record);
        index
    }

    /// Append an existing record at the next contiguous index, preserving
    /// its timestamp and extras. Returns the index it landed at.
    pub fn append_episode_record(&mut self, mut record: EpisodeRecord) -> usize {
        let index = self.episodes.len();
        record.episode_index = index;
        self.episodes.push(record);
        index
    }

    /// Mutable access to the info record, for derived-dataset rewrites.
    pub fn info_mut(&mut self) -> &mut InfoRecord {
        &mut self.info
    }

    /// Remove an episode record and shift every later record down by one.
    ///
    /// Touches no files; callers renumber the on-disk tree separately.
    ///
    /// # Errors
    /// `IndexOutOfRange` when the index has no record.
    pub fn remove_episode(&mut self, index: usize) -> Result<()> {
        if index >= self.episodes.len() {
            return Err(Error::IndexOutOfRange {
                index,
                max: self.episodes.len().saturating_sub(1),
            });
        }
        self.episodes.remove(index);
        for episode in &mut self.episodes[index..] {
            episode.episode_index -= 1;
        }
        Ok(())
    }

    /// Task index for an instruction, appending a new record on first use.
    ///
    /// Matching is exact text equality; normalization heuristics belong to
    /// display layers, never to the canonical association.
    pub fn find_or_create_task(&mut self, text: &str) -> usize {
        if let Some(task) = self.tasks.iter().find(|t| t.task == text) {
            return task.task_index;
        }
        let index = self.tasks.len();
        self.tasks.push(TaskRecord::new(index, text));
        index
    }

    /// Write all three sidecar files, recomputing the derived counters.
    ///
    /// Each file is written to a sibling `.tmp` path then renamed into
    /// place, so a crash mid-write cannot leave a truncated file
    /// masquerading as valid metadata.
    ///
    /// # Errors
    /// `FileSystem` with the offending path on any write failure.
    pub fn persist(&mut self, layout: &DatasetLayout) -> Result<()> {
        self.info.total_episodes = self.episodes.len();
        self.info.total_tasks = self.tasks.len();
        self.info.total_frames = self.total_frames();

        let info_path = layout.info_path();
        let text = serde_json::to_string_pretty(&self.info)?;
        write_atomic(&info_path, text.as_bytes())?;
        debug!(path = %info_path.display(), "wrote info record");

        write_jsonl(&layout.episodes_path(), &self.episodes)?;
        write_jsonl(&layout.tasks_path(), &self.tasks)?;
        Ok(())
    }
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| Error::MalformedMetadata {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        })
        .collect()
}

fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, record)?;
        buf.push(b'\n');
    }
    write_atomic(path, &buf)?;
    debug!(path = %path.display(), records = records.len(), "wrote record file");
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp).map_err(|e| Error::fs(&tmp, e))?;
    file.write_all(bytes).map_err(|e| Error::fs(&tmp, e))?;
    file.sync_all().map_err(|e| Error::fs(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::fs(path, e))?;
    Ok(())
}

fn check_contiguous(
    indices: impl Iterator<Item = usize>,
    path: &Path,
    field: &str,
) -> Result<()> {
    for (expected, actual) in indices.enumerate() {
        if actual != expected {
            return Err(Error::MalformedMetadata {
                path: path.to_path_buf(),
                detail: format!("{field} {actual} at position {expected} breaks contiguity"),
            });
        }
    }
    Ok(())
}
