//! Shared fixture: a minimal on-disk dataset in the standard layout
//!
//! Three episodes of 100 frames each, tasks A, B, A, two cameras:
//! enough structure to exercise every operation end to end.

// Each integration test binary compiles this module separately and uses
// a different subset of it.
#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use arrow::array::{Float32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

pub const TASK_A: &str = "Pick up the red block";
pub const TASK_B: &str = "Place the block in container";

pub const CAMERAS: [&str; 2] = ["observation.images.left", "observation.images.wrist.right"];

pub const FRAMES_PER_EPISODE: usize = 100;

/// Route operation logs to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a three-episode dataset under `root` and return its path.
pub fn sample_dataset(root: &Path) -> Result<PathBuf> {
    init_tracing();
    sample_dataset_with_tasks(root, &[TASK_A, TASK_B, TASK_A])
}

/// Build a dataset with one episode per entry of `episode_tasks`.
pub fn sample_dataset_with_tasks(root: &Path, episode_tasks: &[&str]) -> Result<PathBuf> {
    fs::create_dir_all(root.join("meta"))?;
    fs::create_dir_all(root.join("data/chunk-000"))?;
    for camera in CAMERAS {
        fs::create_dir_all(root.join("videos/chunk-000").join(camera))?;
    }

    let mut tasks: Vec<&str> = Vec::new();
    for task in episode_tasks {
        if !tasks.contains(task) {
            tasks.push(task);
        }
    }

    let info = serde_json::json!({
        "codebase_version": "v2.1",
        "robot_type": "so100",
        "fps": 30,
        "total_episodes": episode_tasks.len(),
        "total_frames": episode_tasks.len() * FRAMES_PER_EPISODE,
        "total_tasks": tasks.len(),
        "features": {
            "action": {"dtype": "float32", "shape": [6]},
            "observation.state": {"dtype": "float32", "shape": [6]},
            "observation.images.left": {"dtype": "video", "shape": [480, 640, 3]},
            "observation.images.wrist.right": {"dtype": "video", "shape": [480, 640, 3]}
        }
    });
    fs::write(
        root.join("meta/info.json"),
        serde_json::to_string_pretty(&info)?,
    )?;

    let tasks_jsonl: String = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| format!(r#"{{"task_index": {i}, "task": "{task}"}}"#) + "\n")
        .collect();
    fs::write(root.join("meta/tasks.jsonl"), tasks_jsonl)?;

    let episodes_jsonl: String = episode_tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            format!(
                r#"{{"episode_index": {i}, "length": {FRAMES_PER_EPISODE}, "tasks": ["{task}"], "timestamp": "2024-01-{:02}T10:00:00"}}"#,
                i + 1
            ) + "\n"
        })
        .collect();
    fs::write(root.join("meta/episodes.jsonl"), episodes_jsonl)?;

    for index in 0..episode_tasks.len() {
        write_episode_parquet(root, index, FRAMES_PER_EPISODE)?;
        for camera in CAMERAS {
            let video = root
                .join("videos/chunk-000")
                .join(camera)
                .join(format!("episode_{index:06}.mp4"));
            fs::write(video, format!("video-{index}"))?;
        }
    }

    Ok(root.to_path_buf())
}

/// Write one episode's parquet data file.
pub fn write_episode_parquet(root: &Path, index: usize, frames: usize) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("episode_index", DataType::Int64, false),
        Field::new("frame_index", DataType::Int64, false),
        Field::new("timestamp", DataType::Float32, false),
        Field::new("action", DataType::Float32, false),
        Field::new("observation.state", DataType::Float32, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![index as i64; frames])),
            Arc::new(Int64Array::from_iter_values(0..frames as i64)),
            Arc::new(Float32Array::from_iter_values(
                (0..frames).map(|f| f as f32 / 30.0),
            )),
            Arc::new(Float32Array::from(vec![0.5; frames])),
            Arc::new(Float32Array::from(vec![0.25; frames])),
        ],
    )?;

    let path = root
        .join("data/chunk-000")
        .join(format!("episode_{index:06}.parquet"));
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Data file path for an episode in the first chunk.
pub fn data_file(root: &Path, index: usize) -> PathBuf {
    root.join("data/chunk-000")
        .join(format!("episode_{index:06}.parquet"))
}

/// Video file path for an (episode, camera) pair in the first chunk.
pub fn video_file(root: &Path, index: usize, camera: &str) -> PathBuf {
    root.join("videos/chunk-000")
        .join(camera)
        .join(format!("episode_{index:06}.mp4"))
}
