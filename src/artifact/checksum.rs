//! SHA-256 checksums for nest images.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{BreederError, Result};

/// Separator used by `sha256sum` between the hash and the file name.
const SHA256_SEPARATOR: &str = "  ";

/// Hex-encoded SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let f = File::open(path).map_err(|e| BreederError::io(path, e))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1024 * 1024];
    loop {
        let n = r.read(&mut buf).map_err(|e| BreederError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Path of the checksum sidecar for `image`.
pub fn checksum_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Write `<image>.sha256` in `sha256sum -c` format and return its path.
pub fn write_checksum(image: &Path) -> Result<PathBuf> {
    let hash = sha256_file(image)?;
    let filename = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let path = checksum_path(image);
    fs::write(&path, format!("{hash}{SHA256_SEPARATOR}{filename}\n"))
        .map_err(|e| BreederError::io(&path, e))?;
    Ok(path)
}
