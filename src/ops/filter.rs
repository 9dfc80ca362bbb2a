//! Filter a dataset: feature column projection and frame-range slicing

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::info;

use super::{copy_file_logged, validate_structure, EpisodePaths};
use crate::layout::DatasetLayout;
use crate::meta::MetadataStore;
use crate::storage::EpisodeData;
use crate::{Error, Result};

/// Inclusive-exclusive frame-index bounds, parsed from `start:end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    /// First frame kept
    pub start: usize,
    /// First frame dropped
    pub end: usize,
}

impl FrameRange {
    /// Parse a `start:end` specification.
    ///
    /// # Errors
    /// `InvalidRange` for malformed text or an inverted range
    /// (`end < start`).
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidRange(text.to_string());
        let (start, end) = text.split_once(':').ok_or_else(invalid)?;
        let start: usize = start.trim().parse().map_err(|_| invalid())?;
        let end: usize = end.trim().parse().map_err(|_| invalid())?;
        if end < start {
            return Err(invalid());
        }
        Ok(Self { start, end })
    }
}

/// What to keep or drop when filtering a dataset.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Keep only these feature columns (mutually exclusive with
    /// `exclude`)
    pub include: Option<Vec<String>>,
    /// Drop these feature columns (mutually exclusive with `include`)
    pub exclude: Option<Vec<String>>,
    /// Frame slice applied to every episode
    pub frame_range: Option<FrameRange>,
}

impl FilterOptions {
    /// Reject contradictory option combinations.
    ///
    /// # Errors
    /// `MutuallyExclusiveOptions` when include and exclude are both set.
    pub fn validate(&self) -> Result<()> {
        if self.include.is_some() && self.exclude.is_some() {
            return Err(Error::MutuallyExclusiveOptions);
        }
        Ok(())
    }
}

/// Outcome of a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterReport {
    /// Episodes written to the destination
    pub total_episodes: usize,
    /// Frames written to the destination
    pub total_frames: usize,
    /// Feature names surviving the projection
    pub features: Vec<String>,
}

/// Produce a new dataset with a column projection and/or frame slice
/// applied to every data file.
///
/// The destination info record's `features` reflect exactly the
/// surviving columns; media for dropped video features is not copied;
/// episode-record lengths are updated to the sliced frame counts.
/// Validation (option conflicts, source structure) happens before any
/// file is written.
///
/// # Errors
/// `MutuallyExclusiveOptions`/`InvalidRange`/`InvalidDatasetStructure`
/// before any mutation, plus file and parquet errors during rewrite.
pub fn filter_dataset(
    source: &Path,
    dest: &Path,
    options: &FilterOptions,
) -> Result<FilterReport> {
    options.validate()?;

    let source_layout = DatasetLayout::new(source);
    validate_structure(&source_layout)?;
    let source_store = MetadataStore::load(&source_layout)?;

    let surviving = surviving_features(&source_store, options);
    let mut info = source_store.info().clone();
    info.features.retain(|name, _| surviving.contains(name));
    let cameras = info.camera_keys();

    let dest_layout = DatasetLayout::new(dest);
    fs::create_dir_all(dest_layout.meta_dir()).map_err(|e| Error::fs(dest_layout.meta_dir(), e))?;
    let mut filtered = MetadataStore::new(info);

    for record in source_store.episodes() {
        let index = record.episode_index;
        let source_paths = EpisodePaths::resolve(&source_layout, index, &cameras);
        let target_paths = EpisodePaths::resolve(&dest_layout, index, &cameras);

        let mut data = EpisodeData::load(&source_paths.data)?;
        if options.include.is_some() || options.exclude.is_some() {
            let keep = projection_keep(&data, options, &surviving);
            data = data.project(&keep)?;
        }
        if let Some(range) = options.frame_range {
            data = data.slice_frames(range)?;
        }
        data.write(&target_paths.data)?;

        for (camera, from) in &source_paths.media {
            if from.exists() {
                copy_file_logged(from, &target_paths.media[camera])?;
            }
        }

        let mut record = record.clone();
        record.length = data.num_frames();
        for task in &record.tasks {
            filtered.find_or_create_task(task);
        }
        filtered.append_episode_record(record);
    }

    let report = FilterReport {
        total_episodes: filtered.episode_count(),
        total_frames: filtered.total_frames(),
        features: filtered.info().feature_keys(),
    };
    filtered.persist(&dest_layout)?;

    info!(
        source = %source.display(),
        dest = %dest.display(),
        episodes = report.total_episodes,
        features = report.features.len(),
        "filtered dataset"
    );
    Ok(report)
}

/// Feature names that survive the projection, from the declared set.
/// Include names not declared in the source info are ignored.
fn surviving_features(store: &MetadataStore, options: &FilterOptions) -> BTreeSet<String> {
    let declared = store.info().feature_keys();
    match (&options.include, &options.exclude) {
        (Some(include), _) => declared
            .into_iter()
            .filter(|name| include.contains(name))
            .collect(),
        (None, Some(exclude)) => declared
            .into_iter()
            .filter(|name| !exclude.contains(name))
            .collect(),
        (None, None) => declared.into_iter().collect(),
    }
}

/// Column keep-set for one data file. In exclude mode, columns that are
/// not declared features pass through untouched.
fn projection_keep(
    data: &EpisodeData,
    options: &FilterOptions,
    surviving: &BTreeSet<String>,
) -> BTreeSet<String> {
    match (&options.include, &options.exclude) {
        (Some(_), _) => surviving.clone(),
        (None, Some(exclude)) => data
            .column_names()
            .into_iter()
            .filter(|name| !exclude.contains(name))
            .collect(),
        (None, None) => data.column_names().into_iter().collect(),
    }
}
