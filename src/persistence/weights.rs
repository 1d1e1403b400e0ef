//! Binary weight blob.
//!
//! ```text
//! bytes 0-3:  b"TCNW"
//! bytes 4-7:  format version, little-endian u32
//! bytes 8-15: number of buffers, little-endian u64
//! then per buffer:
//!   u64 value count, followed by that many little-endian f64 values
//! ```
//! Values are stored as `f64` whatever the weight type, so a blob written
//! under one numeric policy loads under any other.

use std::io::{Read, Write};

use crate::error::{CnnError, Result};
use crate::layers::WeightBuffer;
use crate::numeric::{NumericPolicy, Scalar};

pub const MAGIC: &[u8; 4] = b"TCNW";
pub const VERSION: u32 = 1;

pub fn write_weights<P: NumericPolicy, W: Write>(buffers: &[&WeightBuffer<P>], mut out: W) -> Result<()> {
    out.write_all(MAGIC)?;
    out.write_all(&VERSION.to_le_bytes())?;
    out.write_all(&(buffers.len() as u64).to_le_bytes())?;
    for buffer in buffers {
        out.write_all(&(buffer.len() as u64).to_le_bytes())?;
        for &v in buffer.values() {
            out.write_all(&v.to_f64_lossy().to_le_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Fills `buffers` from a blob, which must describe exactly these buffers.
pub fn read_weights<P: NumericPolicy, R: Read>(buffers: &mut [&mut WeightBuffer<P>], mut input: R) -> Result<()> {
    let mut magic = [0u8; 4];
    read_exact(&mut input, &mut magic)?;
    if &magic != MAGIC {
        return Err(CnnError::Persistence("weight file has no TCNW header".into()));
    }
    let version = u32::from_le_bytes(read_array(&mut input)?);
    if version != VERSION {
        return Err(CnnError::Persistence(format!(
            "unsupported weight file version {} (expected {})",
            version, VERSION
        )));
    }
    let count = u64::from_le_bytes(read_array(&mut input)?) as usize;
    if count != buffers.len() {
        return Err(CnnError::Persistence(format!(
            "weight file holds {} buffers, network has {}",
            count,
            buffers.len()
        )));
    }
    for (i, buffer) in buffers.iter_mut().enumerate() {
        let len = u64::from_le_bytes(read_array(&mut input)?) as usize;
        if len != buffer.len() {
            return Err(CnnError::Persistence(format!(
                "weight buffer {} holds {} values, layer expects {}",
                i,
                len,
                buffer.len()
            )));
        }
        for v in buffer.values_mut() {
            *v = P::Weight::from_f64_lossy(f64::from_le_bytes(read_array(&mut input)?));
        }
    }
    let mut trailing = [0u8; 1];
    if input.read(&mut trailing)? != 0 {
        return Err(CnnError::Persistence("weight file has trailing data".into()));
    }
    Ok(())
}

fn read_exact<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => CnnError::Persistence("weight file is truncated".into()),
        _ => CnnError::Io(e),
    })
}

fn read_array<R: Read, const N: usize>(input: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    read_exact(input, &mut buf)?;
    Ok(buf)
}
