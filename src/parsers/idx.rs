//! IDX image/label pairs as used by MNIST and its derivatives.
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions = 3)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x01        (number of dimensions = 1)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::data::{Dataset, Sample};
use crate::error::{CnnError, Result};
use crate::math::Tensor;
use crate::numeric::{NumericPolicy, Scalar};
use crate::parsers::{select_range, DatasetOptions};

/// Label file matching an image file: `images` → `labels`, `idx3` → `idx1`.
pub fn label_path_for(image_path: &Path) -> PathBuf {
    let s = image_path.to_string_lossy();
    PathBuf::from(s.replace("images", "labels").replace("idx3", "idx1"))
}

pub fn parse_labelled_images<P: NumericPolicy>(
    image_path: &Path,
    label_path: &Path,
    options: &DatasetOptions,
) -> Result<Dataset<P>> {
    let image_bytes = fs::read(image_path)?;
    let label_bytes = fs::read(label_path)?;
    parse_idx_pair(&image_bytes, &label_bytes, options)
}

fn be_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
}

fn check_header(bytes: &[u8], kind: &str, header_len: usize, dimensions: u8) -> Result<()> {
    if bytes.len() < header_len {
        return Err(CnnError::Data(format!(
            "IDX {} file too short: expected at least {} header bytes, got {}",
            kind,
            header_len,
            bytes.len()
        )));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(CnnError::Data(format!(
            "IDX {} file: bytes 0-1 must be 0x00 0x00, got 0x{:02X} 0x{:02X}",
            kind, bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(CnnError::Data(format!(
            "IDX {} file: dtype must be 0x08 (uint8), got 0x{:02X}",
            kind, bytes[2]
        )));
    }
    if bytes[3] != dimensions {
        return Err(CnnError::Data(format!(
            "IDX {} file: expected {} dimensions, got {}",
            kind, dimensions, bytes[3]
        )));
    }
    Ok(())
}

/// Decodes an IDX3/IDX1 pair into one-hot labelled samples.
///
/// Pixels are scaled to `[0, 1]`; the image size must equal the network
/// input, which must have depth 1.
pub fn parse_idx_pair<P: NumericPolicy>(
    image_bytes: &[u8],
    label_bytes: &[u8],
    options: &DatasetOptions,
) -> Result<Dataset<P>> {
    check_header(image_bytes, "image", 16, 0x03)?;
    check_header(label_bytes, "label", 8, 0x01)?;

    let n_items = be_u32(image_bytes, 4);
    let rows = be_u32(image_bytes, 8);
    let cols = be_u32(image_bytes, 12);
    let dims = options.input_dims;
    if rows != dims.height || cols != dims.width || dims.depth != 1 {
        return Err(CnnError::Data(format!(
            "IDX images are {}x{}x1 but the network expects {}",
            cols, rows, dims
        )));
    }

    let n_pixels = rows * cols;
    let required_image_len = n_items
        .checked_mul(n_pixels)
        .and_then(|n| n.checked_add(16))
        .ok_or_else(|| CnnError::Data("IDX image file: data length overflows usize".into()))?;
    if image_bytes.len() < required_image_len {
        return Err(CnnError::Data(format!(
            "IDX image file too short: header declares {} items of {}x{} pixels, file is {} bytes",
            n_items,
            rows,
            cols,
            image_bytes.len()
        )));
    }

    let label_count = be_u32(label_bytes, 4);
    if label_count != n_items {
        return Err(CnnError::Data(format!(
            "IDX file mismatch: image file declares {} items but label file declares {}",
            n_items, label_count
        )));
    }
    if label_bytes.len() < 8 + n_items {
        return Err(CnnError::Data(format!(
            "IDX label file too short: header declares {} labels, file is {} bytes",
            n_items,
            label_bytes.len()
        )));
    }

    select_range(n_items, options.offset, options.count)
        .map(|i| {
            let pixels = &image_bytes[16 + i * n_pixels..16 + (i + 1) * n_pixels];
            let data = pixels
                .iter()
                .map(|&px| P::Forward::from_f64_lossy(px as f64 / 255.0))
                .collect();
            let input = Tensor::from_vec(dims, data)?;
            Sample::one_hot(input, label_bytes[8 + i] as usize, options.output_size)
        })
        .collect()
}
