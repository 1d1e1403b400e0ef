use std::fs;
use std::path::Path;

use crate::data::{Dataset, Sample};
use crate::error::{CnnError, Result};
use crate::numeric::NumericPolicy;
use crate::parsers::image_file::load_image;
use crate::parsers::{select_range, DatasetOptions};

/// Reads a text list of `image-path label` lines.
///
/// Image paths are relative to the directory of the list file; blank lines
/// are ignored and do not count towards `offset` or `count`.
pub fn parse_labelled_images<P: NumericPolicy>(list_path: &Path, options: &DatasetOptions) -> Result<Dataset<P>> {
    let text = fs::read_to_string(list_path)?;
    let base = list_path.parent().unwrap_or_else(|| Path::new(""));
    let entries: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let range = select_range(entries.len(), options.offset, options.count);
    entries[range]
        .iter()
        .map(|&(line_no, line)| {
            let (image, label) = line
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| malformed(list_path, line_no, "expected '<image> <label>'"))?;
            let label: usize = label
                .parse()
                .map_err(|_| malformed(list_path, line_no, "label is not a non-negative integer"))?;
            let input = load_image(&base.join(image.trim_end()), options.input_dims, options.grayscale)?;
            Sample::one_hot(input, label, options.output_size)
        })
        .collect()
}

fn malformed(path: &Path, line: usize, reason: &str) -> CnnError {
    CnnError::Data(format!("{}:{}: {}", path.display(), line, reason))
}
