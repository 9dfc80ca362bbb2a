//! End-to-end tests for episode deletion and copying
//!
//! Each test builds a real on-disk dataset (parquet data files, dummy
//! video files, sidecar metadata) and drives the editor against it.

mod common;

use std::fs;

use common::{
    data_file, sample_dataset, video_file, CAMERAS, FRAMES_PER_EPISODE, TASK_A, TASK_B,
};
use lero::ops::{DatasetEditor, Mode};
use lero::storage::EpisodeData;
use lero::Error;
use tempfile::TempDir;

#[test]
fn test_open_rejects_missing_structure() {
    let dir = TempDir::new().unwrap();
    let err = DatasetEditor::open(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::InvalidDatasetStructure { .. }));
}

#[test]
fn test_episode_detail_read_path() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let editor = DatasetEditor::open(&root).unwrap();
    let detail = editor.episode(1).unwrap();
    assert_eq!(detail.index, 1);
    assert_eq!(detail.length, FRAMES_PER_EPISODE);
    assert_eq!(detail.tasks, vec![TASK_B]);
    assert!(detail.data_exists);
    assert_eq!(detail.media.len(), 2);
    assert!(detail.media.iter().all(|m| m.exists));
}

#[test]
fn test_missing_media_is_reportable_not_fatal() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();
    fs::remove_file(video_file(&root, 0, CAMERAS[0])).unwrap();

    let editor = DatasetEditor::open(&root).unwrap();
    let detail = editor.episode(0).unwrap();
    let missing: Vec<_> = detail.media.iter().filter(|m| !m.exists).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].camera, CAMERAS[0]);
}

#[test]
fn test_summary_and_listing() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let editor = DatasetEditor::open(&root).unwrap();
    let summary = editor.summary();
    assert_eq!(summary.total_episodes, 3);
    assert_eq!(summary.total_tasks, 2);
    assert_eq!(summary.robot_type, "so100");
    assert_eq!(summary.cameras.len(), 2);

    let rows = editor.list_episodes(1, 10);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].index, 1);
    assert!(rows.iter().all(|r| r.data_exists));
}

#[test]
fn test_delete_dry_run_has_zero_side_effects() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    let plan = editor.delete_episode(1, Mode::DryRun).unwrap();

    // 1 data file + 2 videos removed; episode 2 shifts down (3 renames).
    assert_eq!(plan.removals.len(), 3);
    assert_eq!(plan.renames.len(), 3);

    assert!(data_file(&root, 1).exists());
    assert!(data_file(&root, 2).exists());
    let reopened = DatasetEditor::open(&root).unwrap();
    assert_eq!(reopened.episode_count(), 3);
}

#[test]
fn test_delete_compacts_indices_and_files() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    editor.delete_episode(1, Mode::Apply).unwrap();

    // Count decreased by exactly one, indices contiguous from zero.
    let reopened = DatasetEditor::open(&root).unwrap();
    assert_eq!(reopened.episode_count(), 2);
    for (pos, row) in reopened.list_episodes(0, 10).iter().enumerate() {
        assert_eq!(row.index, pos);
    }

    // Old episode 2's files moved into slot 1; slot 2 is gone.
    assert!(data_file(&root, 0).exists());
    assert!(data_file(&root, 1).exists());
    assert!(!data_file(&root, 2).exists());
    for camera in CAMERAS {
        assert!(video_file(&root, 1, camera).exists());
        assert!(!video_file(&root, 2, camera).exists());
    }
    assert_eq!(
        fs::read(video_file(&root, 1, CAMERAS[0])).unwrap(),
        b"video-2"
    );
}

#[test]
fn test_delete_keeps_orphaned_task_records() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    // Episode 1 is the only reference to task B. Deleting it orphans the
    // task record but must not prune it.
    let mut editor = DatasetEditor::open(&root).unwrap();
    editor.delete_episode(1, Mode::Apply).unwrap();

    let reopened = DatasetEditor::open(&root).unwrap();
    let summary = reopened.summary();
    assert_eq!(summary.total_tasks, 2);
    assert!(summary.tasks.contains(&TASK_B.to_string()));

    let task_a_refs = reopened
        .list_episodes(0, 10)
        .iter()
        .filter(|row| row.tasks.contains(&TASK_A.to_string()))
        .count();
    assert_eq!(task_a_refs, 2);
}

#[test]
fn test_delete_first_and_last() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    editor.delete_episode(0, Mode::Apply).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    assert_eq!(editor.episode_count(), 2);
    editor.delete_episode(1, Mode::Apply).unwrap();

    let reopened = DatasetEditor::open(&root).unwrap();
    assert_eq!(reopened.episode_count(), 1);
    assert!(data_file(&root, 0).exists());
    assert!(!data_file(&root, 1).exists());
}

#[test]
fn test_delete_updates_derived_counters() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    editor.delete_episode(2, Mode::Apply).unwrap();

    let info: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("meta/info.json")).unwrap()).unwrap();
    assert_eq!(info["total_episodes"], 2);
    assert_eq!(info["total_frames"], 200);
}

#[test]
fn test_delete_out_of_range_rejected_before_mutation() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    let err = editor.delete_episode(3, Mode::Apply).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 3, max: 2 }));
    assert!(data_file(&root, 0).exists());
    assert_eq!(DatasetEditor::open(&root).unwrap().episode_count(), 3);
}

#[test]
fn test_copy_appends_at_end_with_new_task() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    let plan = editor.copy_episode(0, "new task", Mode::Apply).unwrap();
    assert_eq!(plan.target_index, 3);

    let reopened = DatasetEditor::open(&root).unwrap();
    assert_eq!(reopened.episode_count(), 4);
    assert_eq!(reopened.summary().total_tasks, 3);

    let detail = reopened.episode(3).unwrap();
    assert_eq!(detail.tasks, vec!["new task"]);
    assert_eq!(detail.length, FRAMES_PER_EPISODE);
    assert!(detail.data_exists);
}

#[test]
fn test_copy_relabels_episode_index_column() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let source_bytes = fs::read(data_file(&root, 0)).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    editor.copy_episode(0, "new task", Mode::Apply).unwrap();

    let copied = EpisodeData::load(&data_file(&root, 3)).unwrap();
    let values = copied.episode_index_values().unwrap();
    assert_eq!(values.len(), FRAMES_PER_EPISODE);
    assert!(values.iter().all(|&v| v == 3));

    // Source file untouched, byte for byte.
    assert_eq!(fs::read(data_file(&root, 0)).unwrap(), source_bytes);
}

#[test]
fn test_copy_reuses_existing_task() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    editor.copy_episode(1, TASK_A, Mode::Apply).unwrap();

    let reopened = DatasetEditor::open(&root).unwrap();
    assert_eq!(reopened.summary().total_tasks, 2);
    assert_eq!(reopened.episode(3).unwrap().tasks, vec![TASK_A]);
}

#[test]
fn test_copy_dry_run_has_zero_side_effects() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    let plan = editor.copy_episode(2, "preview", Mode::DryRun).unwrap();
    assert_eq!(plan.source_index, 2);
    assert_eq!(plan.target_index, 3);
    assert_eq!(plan.copies.len(), 3);

    assert!(!data_file(&root, 3).exists());
    assert_eq!(DatasetEditor::open(&root).unwrap().episode_count(), 3);
}

#[test]
fn test_copy_rejects_blank_instruction() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    for blank in ["", "   "] {
        let err = editor.copy_episode(0, blank, Mode::Apply).unwrap_err();
        assert!(matches!(err, Error::InstructionEmpty));
    }
    assert!(!data_file(&root, 3).exists());
}

#[test]
fn test_delete_then_copy_never_reuses_stale_index() {
    let dir = TempDir::new().unwrap();
    let root = sample_dataset(dir.path()).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    editor.delete_episode(1, Mode::Apply).unwrap();

    let mut editor = DatasetEditor::open(&root).unwrap();
    let plan = editor.copy_episode(0, "restored", Mode::Apply).unwrap();
    assert_eq!(plan.target_index, 2);

    let reopened = DatasetEditor::open(&root).unwrap();
    assert_eq!(reopened.episode_count(), 3);
    let detail = reopened.episode(2).unwrap();
    assert_eq!(detail.length, FRAMES_PER_EPISODE);

    let data = EpisodeData::load(&data_file(&root, 2)).unwrap();
    assert_eq!(data.num_frames(), FRAMES_PER_EPISODE);
    assert!(data.episode_index_values().unwrap().iter().all(|&v| v == 2));
}
