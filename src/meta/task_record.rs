//! Per-task record (`meta/tasks.jsonl`)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of `tasks.jsonl`: a deduplicated natural-language instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    /// Dense zero-based index
    pub task_index: usize,
    /// Instruction text, unique across the record set
    pub task: String,
    /// Unrecognized fields, preserved verbatim on rewrite
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TaskRecord {
    /// Create a record with no extras.
    #[must_use]
    pub fn new(task_index: usize, task: impl Into<String>) -> Self {
        Self {
            task_index,
            task: task.into(),
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let rec = TaskRecord::new(0, "Pick up the red block");
        let json = serde_json::to_string(&rec).unwrap();
        let back: TaskRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_extra_fields_preserved() {
        let rec: TaskRecord =
            serde_json::from_str(r#"{"task_index": 1, "task": "place", "source": "teleop"}"#)
                .unwrap();
        assert_eq!(rec.extra["source"], serde_json::json!("teleop"));
    }
}
