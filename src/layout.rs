//! Dataset path layout
//!
//! Pure path arithmetic for the chunked on-disk layout:
//!
//! ```text
//! <root>/meta/info.json
//! <root>/meta/episodes.jsonl
//! <root>/meta/tasks.jsonl
//! <root>/data/chunk-<NNN>/episode_<IIIIII>.parquet
//! <root>/videos/chunk-<NNN>/<camera>/episode_<IIIIII>.mp4
//! ```
//!
//! No function here performs I/O or checks existence; callers decide what
//! a missing file means.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Episodes per chunk directory
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

const META_DIR: &str = "meta";
const DATA_DIR: &str = "data";
const VIDEOS_DIR: &str = "videos";

const INFO_FILE: &str = "info.json";
const EPISODES_FILE: &str = "episodes.jsonl";
const TASKS_FILE: &str = "tasks.jsonl";

/// Resolves on-disk locations for a dataset rooted at one directory.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    chunk_size: usize,
}

impl DatasetLayout {
    /// Create a layout with the standard chunk size of 1000 episodes.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Create a layout with a custom chunk size.
    ///
    /// Chunk size zero is nonsensical and is clamped to 1.
    pub fn with_chunk_size(root: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            root: root.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Dataset root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Chunk number for an episode index.
    #[must_use]
    pub const fn chunk_of(&self, index: usize) -> usize {
        index / self.chunk_size
    }

    /// `meta/` directory.
    #[must_use]
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    /// `meta/info.json`
    #[must_use]
    pub fn info_path(&self) -> PathBuf {
        self.meta_dir().join(INFO_FILE)
    }

    /// `meta/episodes.jsonl`
    #[must_use]
    pub fn episodes_path(&self) -> PathBuf {
        self.meta_dir().join(EPISODES_FILE)
    }

    /// `meta/tasks.jsonl`
    #[must_use]
    pub fn tasks_path(&self) -> PathBuf {
        self.meta_dir().join(TASKS_FILE)
    }

    /// Chunk directory holding an episode's data file.
    #[must_use]
    pub fn data_chunk_dir(&self, index: usize) -> PathBuf {
        self.root
            .join(DATA_DIR)
            .join(format!("chunk-{:03}", self.chunk_of(index)))
    }

    /// Parquet data file for an episode.
    #[must_use]
    pub fn data_path(&self, index: usize) -> PathBuf {
        self.data_chunk_dir(index)
            .join(format!("episode_{index:06}.parquet"))
    }

    /// Chunk directory holding an episode's video file for one camera.
    #[must_use]
    pub fn media_chunk_dir(&self, index: usize, camera: &str) -> PathBuf {
        self.root
            .join(VIDEOS_DIR)
            .join(format!("chunk-{:03}", self.chunk_of(index)))
            .join(camera)
    }

    /// Video file for one (episode, camera) pair.
    #[must_use]
    pub fn media_path(&self, index: usize, camera: &str) -> PathBuf {
        self.media_chunk_dir(index, camera)
            .join(format!("episode_{index:06}.mp4"))
    }

    /// Video files for an episode across a camera list, keyed by camera.
    #[must_use]
    pub fn media_paths(&self, index: usize, cameras: &[String]) -> BTreeMap<String, PathBuf> {
        cameras
            .iter()
            .map(|cam| (cam.clone(), self.media_path(index, cam)))
            .collect()
    }
}
