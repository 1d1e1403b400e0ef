//! Labelled dataset readers, chosen by file name.
//!
//! | name pattern                 | format                                  |
//! |------------------------------|-----------------------------------------|
//! | last extension contains `idx`| IDX3 images + IDX1 labels (MNIST style) |
//! | last extension contains `bin`| label byte + raw pixel records (CIFAR)  |
//! | ends in `.txt`               | list of `image-path label` lines        |
//!
//! Every reader takes an `offset` (records to skip) and a `count` (records to
//! keep, `0` meaning all remaining).

pub mod binary;
pub mod idx;
pub mod image_file;
pub mod image_list;

pub use image_file::{image_bytes_to_tensor, load_image};

use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::data::Dataset;
use crate::error::Result;
use crate::math::Dimensions;
use crate::numeric::NumericPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Idx,
    Binary,
    ImageList,
}

impl DatasetFormat {
    /// Detects the format from the file name alone.
    pub fn detect(path: &Path) -> Option<DatasetFormat> {
        let name = path.file_name()?.to_str()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        if ext.contains("idx") {
            Some(DatasetFormat::Idx)
        } else if ext.contains("bin") {
            Some(DatasetFormat::Binary)
        } else if ext == "txt" {
            Some(DatasetFormat::ImageList)
        } else {
            None
        }
    }
}

/// Where the reader options for one dataset come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetOptions {
    pub input_dims: Dimensions,
    pub output_size: usize,
    pub offset: usize,
    pub count: usize,
    pub grayscale: bool,
}

/// Reads and concatenates every file in `files`.
///
/// Files whose format cannot be detected are skipped with a warning.
pub fn parse_input_dataset<P: NumericPolicy>(
    files: &[PathBuf],
    options: &DatasetOptions,
) -> Result<Dataset<P>> {
    let mut dataset = Dataset::new();
    for file in files {
        let mut part = match DatasetFormat::detect(file) {
            Some(DatasetFormat::Idx) => {
                let labels = idx::label_path_for(file);
                idx::parse_labelled_images(file, &labels, options)?
            }
            Some(DatasetFormat::Binary) => binary::parse_labelled_images(file, options)?,
            Some(DatasetFormat::ImageList) => image_list::parse_labelled_images(file, options)?,
            None => {
                warn!(
                    file = %file.display(),
                    "input data file not detected as BIN, IDX or TXT (based on extension), skipping"
                );
                continue;
            }
        };
        info!(file = %file.display(), samples = part.len(), "loaded dataset");
        dataset.append(&mut part);
    }
    Ok(dataset)
}

/// Record indices kept after applying `offset` and `count` to `total` records.
pub fn select_range(total: usize, offset: usize, count: usize) -> Range<usize> {
    let start = offset.min(total);
    let end = if count == 0 {
        total
    } else {
        start.saturating_add(count).min(total)
    };
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_from_name() {
        let detect = |s: &str| DatasetFormat::detect(Path::new(s));
        assert_eq!(detect("data/train-images.idx3-ubyte"), Some(DatasetFormat::Idx));
        assert_eq!(detect("data_batch_1.bin"), Some(DatasetFormat::Binary));
        assert_eq!(detect("cifar.bin2"), Some(DatasetFormat::Binary));
        assert_eq!(detect("set/list.txt"), Some(DatasetFormat::ImageList));
        assert_eq!(detect("weights.json"), None);
        assert_eq!(detect(".txt"), None);
        assert_eq!(detect("noext"), None);
    }

    #[test]
    fn offset_and_count_select_records() {
        assert_eq!(select_range(10, 0, 0), 0..10);
        assert_eq!(select_range(10, 3, 0), 3..10);
        assert_eq!(select_range(10, 3, 4), 3..7);
        assert_eq!(select_range(10, 8, 5), 8..10);
        assert_eq!(select_range(10, 12, 1), 10..10);
    }
}
