//! Decoding of PNG/JPEG/BMP/GIF images into network inputs.

use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::{CnnError, Result};
use crate::math::{Dimensions, Tensor};
use crate::numeric::Scalar;

/// Loads the image at `path` as an input of shape `dims`.
pub fn load_image<T: Scalar>(path: &Path, dims: Dimensions, grayscale: bool) -> Result<Tensor<T>> {
    let bytes = fs::read(path)?;
    image_bytes_to_tensor(&bytes, dims, grayscale)
}

/// Decodes image bytes, resizes to `dims.width × dims.height` and normalizes
/// pixels to `[0, 1]`.
///
/// Grayscale images give one channel, colour images three (R, G and B planes
/// in that order); `dims.depth` must match.
pub fn image_bytes_to_tensor<T: Scalar>(bytes: &[u8], dims: Dimensions, grayscale: bool) -> Result<Tensor<T>> {
    let channels = if grayscale { 1 } else { 3 };
    if dims.depth != channels {
        return Err(CnnError::Data(format!(
            "{} images have {} channel(s) but the network expects {}",
            if grayscale { "grayscale" } else { "colour" },
            channels,
            dims
        )));
    }
    let width = u32::try_from(dims.width).map_err(|_| CnnError::Data(format!("image width {} too large", dims.width)))?;
    let height =
        u32::try_from(dims.height).map_err(|_| CnnError::Data(format!("image height {} too large", dims.height)))?;

    let img = image::load_from_memory(bytes)?;
    let resized = if img.dimensions() == (width, height) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };
    Tensor::from_vec(dims, planes(&resized, grayscale))
}

fn planes<T: Scalar>(img: &DynamicImage, grayscale: bool) -> Vec<T> {
    let scale = |c: u8| T::from_f64_lossy(c as f64 / 255.0);
    if grayscale {
        img.to_luma8().pixels().map(|p| scale(p.0[0])).collect()
    } else {
        let rgb = img.to_rgb8();
        (0..3)
            .flat_map(|c| rgb.pixels().map(move |p| scale(p.0[c])).collect::<Vec<T>>())
            .collect()
    }
}
