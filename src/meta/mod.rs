//! Sidecar metadata: records and their store
//!
//! A dataset carries three metadata files:
//!
//! ```text
//! meta/info.json       InfoRecord   (1)  dataset-level scalars + features
//! meta/episodes.jsonl  EpisodeRecord (N) one line per episode
//! meta/tasks.jsonl     TaskRecord    (N) one line per distinct instruction
//! ```
//!
//! [`MetadataStore`] owns all three in memory for one engine invocation
//! and enforces the cross-record invariants: dense contiguous indices and
//! derived counters that always match the record sets.

mod episode_record;
mod info_record;
mod store;
mod task_record;

pub use episode_record::EpisodeRecord;
pub use info_record::{FeatureSpec, InfoRecord, VIDEO_DTYPE};
pub use store::MetadataStore;
pub use task_record::TaskRecord;
