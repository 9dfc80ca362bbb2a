//! # Lero: LeRobot Dataset Operations Toolkit
//!
//! Lero manages collections of recorded robot-interaction episodes stored
//! as a chunked tree of parquet data files and per-camera video files,
//! plus three sidecar metadata files (`meta/info.json`,
//! `meta/episodes.jsonl`, `meta/tasks.jsonl`).
//!
//! The crate keeps those three representations mutually consistent across
//! structural edits: deleting an episode (with index compaction), copying
//! an episode under a new instruction, merging whole datasets, and
//! filtering feature columns or frame ranges into a new dataset.
//!
//! ## Consistency contract
//!
//! Every mutation runs VALIDATE -> (DRY-RUN REPORT | APPLY) -> PERSIST ->
//! CLEANUP. Validation failures abort before any file is touched; the
//! metadata persist is deferred until all file moves have succeeded, so
//! metadata never claims fewer episodes than the files that actually
//! moved. Completed moves are not rolled back on a later failure; each
//! destructive step logs its path so manual reconciliation is possible.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lero::ops::{DatasetEditor, Mode};
//!
//! let mut editor = DatasetEditor::open("data/my_dataset")?;
//! println!("{} episodes", editor.episode_count());
//!
//! // Preview a deletion, then apply it.
//! let plan = editor.delete_episode(2, Mode::DryRun)?;
//! println!("would remove {} files", plan.removals.len());
//! editor.delete_episode(2, Mode::Apply)?;
//! # Ok::<(), lero::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod layout;
pub mod meta;
pub mod ops;
pub mod storage;

pub use error::{Error, Result};
