//! Per-episode record (`meta/episodes.jsonl`)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of `episodes.jsonl`.
///
/// Deserialization accepts both the canonical plural form
/// (`"tasks": ["..."]`) and the legacy singular forms (`"task": "..."`,
/// `"task_index": N`); serialization always emits the plural form. A
/// record carrying only `task_index` gets its text resolved against the
/// task records at load time by the store.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EpisodeRecord {
    /// Dense zero-based index
    pub episode_index: usize,
    /// Number of frames in the episode's data file
    pub length: usize,
    /// Ordered task-description strings
    pub tasks: Vec<String>,
    /// Recording timestamp, if the writer recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Unrecognized fields, preserved verbatim on rewrite
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EpisodeRecord {
    /// Create a record with no timestamp or extras.
    #[must_use]
    pub fn new(episode_index: usize, length: usize, tasks: Vec<String>) -> Self {
        Self {
            episode_index,
            length,
            tasks,
            timestamp: None,
            extra: BTreeMap::new(),
        }
    }

    /// Task index referenced by the legacy singular form, if any.
    ///
    /// Only meaningful on freshly deserialized records; the store clears
    /// it once the reference is resolved to task text.
    #[must_use]
    pub fn legacy_task_index(&self) -> Option<usize> {
        self.extra
            .get("task_index")
            .and_then(Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
    }
}

#[derive(Deserialize)]
struct RawEpisode {
    episode_index: usize,
    length: usize,
    #[serde(default)]
    tasks: Option<Vec<String>>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl From<RawEpisode> for EpisodeRecord {
    fn from(raw: RawEpisode) -> Self {
        let tasks = match (raw.tasks, raw.task) {
            (Some(tasks), _) => tasks,
            (None, Some(task)) => vec![task],
            (None, None) => Vec::new(),
        };
        Self {
            episode_index: raw.episode_index,
            length: raw.length,
            tasks,
            timestamp: raw.timestamp,
            extra: raw.extra,
        }
    }
}

impl<'de> Deserialize<'de> for EpisodeRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        RawEpisode::deserialize(deserializer).map(Into::into)
    }
}
