//! Hashing helpers for cache keys and build reports.

use std::fs;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Truncated SHA-256 over NUL-separated parts, as lowercase hex.
///
/// The separator keeps `("ab", "c")` and `("a", "bc")` distinct.
pub fn hash_parts(parts: &[&str], len: usize) -> String {
  let mut hasher = Sha256::new();
  for (i, part) in parts.iter().enumerate() {
    if i > 0 {
      hasher.update([0u8]);
    }
    hasher.update(part.as_bytes());
  }
  let mut full = hex::encode(hasher.finalize());
  full.truncate(len);
  full
}

/// Full SHA-256 of a file's contents.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(hex::encode(hasher.finalize()))
}
