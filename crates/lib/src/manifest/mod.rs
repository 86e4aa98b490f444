//! The extended tool manifest (`gotool.mod`).
//!
//! The manifest uses go.mod syntax with one extension in the `require` path
//! field, recording the commands each module provides:
//!
//! ```text
//! require (
//!     github.com/mitchellh/gox v1.0.1
//!     github.com/ktr0731/evans@ev v0.8.0
//!     honnef.co/go/tools:/cmd/staticcheck,/cmd/structlayout@sl v0.4.6
//! )
//! ```
//!
//! The resolver never sees this form. [`canonicalize`] strips it before staging
//! and [`merge`] restores it from the resolver's output afterwards.

mod format;
mod merge;
mod parse;
mod types;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use format::{canonicalize, format, format_path_field, render_references, tool_references};
pub use merge::{Merged, merge};
pub use parse::is_valid_output_name;
pub use types::*;

/// Errors reading or interpreting a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("{} not found", path.display())]
  NotFound { path: PathBuf },

  #[error("{} already exists", path.display())]
  AlreadyExists { path: PathBuf },

  #[error("malformed manifest at line {line}: {message}")]
  Format { line: usize, message: String },

  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },
}

/// A parsed manifest together with its plain resolver form.
#[derive(Debug, Clone)]
pub struct Parsed {
  pub manifest: Manifest,
  pub canonical: String,
}

/// Parse extended manifest text.
pub fn parse_str(text: &str) -> Result<Parsed, ManifestError> {
  let manifest = parse::parse_manifest(text)?;
  let canonical = canonicalize(&manifest);
  Ok(Parsed { manifest, canonical })
}

/// Read and parse the manifest at `path`.
pub fn parse_file(path: &Path) -> Result<Parsed, ManifestError> {
  let text = fs::read_to_string(path).map_err(|e| match e.kind() {
    std::io::ErrorKind::NotFound => ManifestError::NotFound {
      path: path.to_path_buf(),
    },
    _ => ManifestError::Read {
      path: path.to_path_buf(),
      source: e,
    },
  })?;
  parse_str(&text)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn parse_file_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = parse_file(&dir.path().join("gotool.mod")).unwrap_err();
    assert!(matches!(err, ManifestError::NotFound { .. }));
  }

  #[test]
  fn parse_file_reads_manifest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gotool.mod");
    fs::write(&path, "module tools\n\nrequire github.com/mitchellh/gox v1.0.1\n").unwrap();

    let parsed = parse_file(&path).unwrap();
    assert_eq!(parsed.manifest.tools().count(), 1);
    assert_eq!(
      parsed.canonical,
      "module tools\n\nrequire (\n\tgithub.com/mitchellh/gox v1.0.1\n)\n"
    );
  }

  #[test]
  fn format_errors_display_line() {
    let err = parse_str("require a.example/b: v1\n").unwrap_err();
    assert!(err.to_string().starts_with("malformed manifest at line 1"));
  }
}
