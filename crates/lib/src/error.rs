//! Crate-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::execute::ExecuteError;
use crate::manifest::ManifestError;
use crate::resolver::ResolverError;

/// Errors returned by toolmod operations.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Resolver(#[from] ResolverError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error("failed to locate project root: {message}")]
  ProjectRoot { message: String },

  #[error("{path} is not declared in the manifest")]
  ToolNotFound { path: String },

  #[error("tool name {name} is already used by {path}")]
  DuplicateToolName { name: String, path: String },

  #[error("invalid tool path: {path}")]
  InvalidToolPath { path: String },

  #[error("invalid tool name {name:?}")]
  InvalidToolName { name: String },

  #[error("tool {name} has no pinned version")]
  Unpinned { name: String },

  #[error("{action} {}: {source}", path.display())]
  Io {
    action: &'static str,
    path: PathBuf,
    source: std::io::Error,
  },
}

impl Error {
  pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Error::Io {
      action,
      path: path.into(),
      source,
    }
  }

  /// True when the error, through any wrapping, stems from cancellation.
  pub fn is_cancelled(&self) -> bool {
    match self {
      Error::Resolver(e) => e.is_cancelled(),
      Error::Cache(e) => e.is_cancelled(),
      Error::Execute(e) => e.is_cancelled(),
      _ => false,
    }
  }

  /// True when the project has no manifest yet.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::Manifest(ManifestError::NotFound { .. }))
  }
}
