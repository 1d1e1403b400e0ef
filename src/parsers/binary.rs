use std::fs;
use std::path::Path;

use crate::data::{Dataset, Sample};
use crate::error::{CnnError, Result};
use crate::math::Tensor;
use crate::numeric::{NumericPolicy, Scalar};
use crate::parsers::{select_range, DatasetOptions};

/// Reads fixed-size records of one label byte followed by
/// `width * height * depth` pixel bytes, one full channel plane after another
/// (the CIFAR-10 binary layout).
pub fn parse_labelled_images<P: NumericPolicy>(path: &Path, options: &DatasetOptions) -> Result<Dataset<P>> {
    let bytes = fs::read(path)?;
    parse_records(&bytes, options)
}

pub fn parse_records<P: NumericPolicy>(bytes: &[u8], options: &DatasetOptions) -> Result<Dataset<P>> {
    let dims = options.input_dims;
    let record_len = 1 + dims.size();
    if bytes.len() % record_len != 0 {
        return Err(CnnError::Data(format!(
            "binary dataset of {} bytes is not a whole number of {}-byte records",
            bytes.len(),
            record_len
        )));
    }
    let total = bytes.len() / record_len;
    select_range(total, options.offset, options.count)
        .map(|i| {
            let record = &bytes[i * record_len..(i + 1) * record_len];
            let data = record[1..]
                .iter()
                .map(|&px| P::Forward::from_f64_lossy(px as f64 / 255.0))
                .collect();
            Sample::one_hot(Tensor::from_vec(dims, data)?, record[0] as usize, options.output_size)
        })
        .collect()
}
