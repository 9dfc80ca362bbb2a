//! Episode data files (Arrow/Parquet)
//!
//! One parquet file per episode, one row per frame. Files are processed
//! whole: loaded into record batches, transformed in memory (index
//! relabel, column projection, frame slice) and rewritten through a
//! sibling temp path with an atomic rename, so a crash mid-write cannot
//! leave a half-written file masquerading as valid.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int32Array, Int64Array};
use arrow::compute::kernels::boolean::and;
use arrow::compute::kernels::cmp::{gt_eq, lt};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use tracing::{debug, warn};

use crate::ops::FrameRange;
use crate::{Error, Result};

/// Repeated per-row index column every data file carries
pub const EPISODE_INDEX_COLUMN: &str = "episode_index";

/// Per-row frame counter column used by frame-range slicing
pub const FRAME_INDEX_COLUMN: &str = "frame_index";

/// Columns that survive every projection regardless of the feature list.
const BOOKKEEPING_COLUMNS: [&str; 5] = [
    EPISODE_INDEX_COLUMN,
    FRAME_INDEX_COLUMN,
    "timestamp",
    "index",
    "task_index",
];

/// One episode's frames, held as Arrow record batches.
#[derive(Debug, Clone)]
pub struct EpisodeData {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl EpisodeData {
    /// Load an episode data file.
    ///
    /// # Errors
    /// `FileSystem` when the file cannot be opened, `DataFileCorrupt`
    /// when its content fails to parse as parquet.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::fs(path, e))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::DataFileCorrupt {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }
        })?;
        let schema = builder.schema().clone();

        let reader = builder.build().map_err(|e| Error::DataFileCorrupt {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| Error::DataFileCorrupt {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
            batches.push(batch);
        }

        Ok(Self { schema, batches })
    }

    /// Number of frames (rows) across all batches.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Column names, schema order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// All record batches.
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Rewrite every value of the `episode_index` column to `new_index`.
    ///
    /// A file without the column is left untouched; the raw bytes of a
    /// copied episode are otherwise identical to its source, so this
    /// relabel is what makes a copy structurally its own episode.
    ///
    /// # Errors
    /// Propagates Arrow errors from batch reconstruction.
    pub fn with_episode_index(mut self, new_index: usize) -> Result<Self> {
        let Some(col_idx) = self.schema.index_of(EPISODE_INDEX_COLUMN).ok() else {
            warn!("data file has no {EPISODE_INDEX_COLUMN} column, skipping relabel");
            return Ok(self);
        };

        let dtype = self.schema.field(col_idx).data_type().clone();
        let mut relabeled = Vec::with_capacity(self.batches.len());
        for batch in &self.batches {
            let rows = batch.num_rows();
            let column: ArrayRef = match dtype {
                DataType::Int32 => {
                    let v = i32::try_from(new_index).map_err(|_| {
                        Error::Arrow(arrow::error::ArrowError::CastError(format!(
                            "episode index {new_index} exceeds Int32 column range"
                        )))
                    })?;
                    Arc::new(Int32Array::from(vec![v; rows]))
                }
                _ => Arc::new(Int64Array::from(vec![new_index as i64; rows])),
            };
            let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
            columns[col_idx] = column;
            relabeled.push(RecordBatch::try_new(self.schema.clone(), columns)?);
        }
        self.batches = relabeled;
        Ok(self)
    }

    /// Keep only the named columns, plus the bookkeeping columns that
    /// every data file must retain (`episode_index`, `frame_index`,
    /// `timestamp`, `index`, `task_index`).
    ///
    /// # Errors
    /// Propagates Arrow errors from schema projection.
    pub fn project(mut self, keep: &BTreeSet<String>) -> Result<Self> {
        let indices: Vec<usize> = self
            .schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| {
                keep.contains(field.name().as_str())
                    || BOOKKEEPING_COLUMNS.contains(&field.name().as_str())
            })
            .map(|(i, _)| i)
            .collect();

        self.schema = Arc::new(self.schema.project(&indices)?);
        self.batches = self
            .batches
            .iter()
            .map(|batch| batch.project(&indices))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    /// Retain only rows whose `frame_index` lies within the range.
    ///
    /// A file without a `frame_index` column is left untouched.
    ///
    /// # Errors
    /// Propagates Arrow errors from the comparison and filter kernels.
    pub fn slice_frames(mut self, range: FrameRange) -> Result<Self> {
        let Ok(col_idx) = self.schema.index_of(FRAME_INDEX_COLUMN) else {
            warn!("data file has no {FRAME_INDEX_COLUMN} column, skipping slice");
            return Ok(self);
        };

        let lo = Int64Array::new_scalar(range.start as i64);
        let hi = Int64Array::new_scalar(range.end as i64);

        let mut sliced = Vec::with_capacity(self.batches.len());
        for batch in &self.batches {
            let frames = arrow::compute::cast(batch.column(col_idx), &DataType::Int64)?;
            let mask = and(&gt_eq(&frames, &lo)?, &lt(&frames, &hi)?)?;
            sliced.push(filter_record_batch(batch, &mask)?);
        }
        self.batches = sliced;
        Ok(self)
    }

    /// Values of the `episode_index` column across all rows, widened to i64.
    ///
    /// # Errors
    /// Propagates Arrow cast errors.
    pub fn episode_index_values(&self) -> Result<Vec<i64>> {
        let Ok(col_idx) = self.schema.index_of(EPISODE_INDEX_COLUMN) else {
            return Ok(Vec::new());
        };
        let mut values = Vec::with_capacity(self.num_frames());
        for batch in &self.batches {
            let cast = arrow::compute::cast(batch.column(col_idx), &DataType::Int64)?;
            let array = cast
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| {
                    Error::Arrow(arrow::error::ArrowError::CastError(
                        "episode_index column did not cast to Int64".to_string(),
                    ))
                })?;
            values.extend(array.iter().flatten());
        }
        Ok(values)
    }

    /// Write the episode to a parquet file via write-temp-then-rename.
    ///
    /// Creates missing parent directories.
    ///
    /// # Errors
    /// `FileSystem` with the offending path on I/O failure, parquet
    /// errors on encoding failure.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
        }

        let tmp = path.with_extension("parquet.tmp");
        let file = File::create(&tmp).map_err(|e| Error::fs(&tmp, e))?;
        let props = WriterProperties::builder().build();
        let mut writer = ArrowWriter::try_new(file, self.schema.clone(), Some(props))?;
        for batch in &self.batches {
            writer.write(batch)?;
        }
        writer.close()?;

        fs::rename(&tmp, path).map_err(|e| Error::fs(path, e))?;
        debug!(path = %path.display(), frames = self.num_frames(), "wrote data file");
        Ok(())
    }
}
