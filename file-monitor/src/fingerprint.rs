//! Content fingerprints.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{MonitorError, Result};

/// Stream a file through SHA-256 and return the lowercase hex digest.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let to_error = |source| MonitorError::Fingerprint {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(to_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(to_error)?;

    Ok(format!("{:x}", hasher.finalize()))
}
