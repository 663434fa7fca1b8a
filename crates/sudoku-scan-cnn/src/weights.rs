//! Binary weight persistence.
//!
//! Layout: a 4-byte little-endian magic, then the raw f32 parameter
//! streams in snapshot order (conv1 w, conv1 b, conv2 w, conv2 b, fc1 w,
//! fc1 b, fc2 w, fc2 b). All values are written little-endian with
//! explicit byte conversion; no native-endian reads.

use std::fs;
use std::path::Path;

use log::info;

use crate::model::DigitCnn;

/// Magic tag ("CNNW" read as a big-endian word).
pub const WEIGHTS_MAGIC: u32 = 0x434E_4E57;

#[derive(thiserror::Error, Debug)]
pub enum WeightsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("bad weights magic: expected {expected:#010x}, got {got:#010x}")]
    BadMagic { expected: u32, got: u32 },
    #[error("weights file holds {got} parameters, model needs {expected}")]
    BadLength { expected: usize, got: usize },
}

/// Serialize the model's parameters to `path`.
pub fn save_weights(model: &DigitCnn, path: impl AsRef<Path>) -> Result<(), WeightsError> {
    let snapshot = model.snapshot();
    let mut raw = Vec::with_capacity(4 + snapshot.len() * 4);
    raw.extend_from_slice(&WEIGHTS_MAGIC.to_le_bytes());
    for v in &snapshot {
        raw.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path.as_ref(), raw)?;
    info!(
        "saved {} parameters to {}",
        snapshot.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Deserialize parameters from `path` into `model`.
///
/// The whole file is validated before any parameter is written, so a
/// failed load leaves the model untouched.
pub fn load_weights(model: &mut DigitCnn, path: impl AsRef<Path>) -> Result<(), WeightsError> {
    let raw = fs::read(path.as_ref())?;
    if raw.len() < 4 {
        return Err(WeightsError::BadMagic {
            expected: WEIGHTS_MAGIC,
            got: 0,
        });
    }

    let magic = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    if magic != WEIGHTS_MAGIC {
        return Err(WeightsError::BadMagic {
            expected: WEIGHTS_MAGIC,
            got: magic,
        });
    }

    let body = &raw[4..];
    let expected = DigitCnn::parameter_count();
    if body.len() != expected * 4 {
        return Err(WeightsError::BadLength {
            expected,
            got: body.len() / 4,
        });
    }

    let flat: Vec<f32> = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    model.restore(&flat);
    info!(
        "loaded {} parameters from {}",
        expected,
        path.as_ref().display()
    );
    Ok(())
}
