use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CnnError, Result};

/// Shape of a 3-D tensor: `width × height × depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Dimensions {
    /// Validated constructor; every component must be at least 1.
    pub fn new(width: usize, height: usize, depth: usize) -> Result<Dimensions> {
        let dims = Dimensions { width, height, depth };
        dims.validate()?;
        Ok(dims)
    }

    /// A `n × 1 × 1` shape, as produced by fully-connected layers.
    pub fn flat(n: usize) -> Result<Dimensions> {
        Dimensions::new(n, 1, 1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(CnnError::Configuration(format!(
                "dimensions must be at least 1 in every direction, got {}",
                self
            )));
        }
        Ok(())
    }

    /// Number of scalars in a tensor of this shape.
    pub fn size(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Flat offset of `(x, y, z)`; planes are stored depth-major.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    /// Number of scalars in one depth plane.
    pub fn plane(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}
