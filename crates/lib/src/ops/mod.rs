//! High-level operations behind each command.
//!
//! Every operation opens one workspace transaction against a [`Project`],
//! does its work in the scratch directory, and lets the transaction commit
//! or discard.

mod build;
mod clean;
mod exec;
mod get;
mod init;
mod list;
mod remove;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::cache::ToolCache;
use crate::consts::{DEFAULT_OUTPUT_DIR, ENV_OUTPUT};
use crate::execute::ExecuteConfig;
use crate::manifest::Tool;
use crate::platform::paths::tool_cache_dir;
use crate::resolver::{Go, GoResolver};
use crate::workspace::{Workspace, WorkspaceOptions};

pub use build::{BuildOptions, BuildReport, BuiltTool, build};
pub use clean::{CleanReport, clean};
pub use exec::{ResolvedTool, resolve_tool};
pub use get::{GetOptions, GetReport, GetSpec, get};
pub use init::{InitReport, init};
pub use list::list;
pub use remove::{RemoveReport, remove};

/// Everything an operation needs to reach the project, the resolver and the cache.
#[derive(Debug, Clone)]
pub struct Project {
  /// Explicit project root. `None` uses the enclosing git work tree.
  pub source_path: Option<PathBuf>,
  pub go: Go,
  pub cache_root: PathBuf,
  pub execute: ExecuteConfig,
}

impl Project {
  pub fn new(source_path: Option<PathBuf>, go: Go, cache_root: PathBuf) -> Self {
    Self {
      source_path,
      go,
      cache_root,
      execute: ExecuteConfig::default(),
    }
  }

  /// Resolver and cache locations from the environment.
  pub fn from_env(source_path: Option<PathBuf>) -> Self {
    Self::new(
      source_path,
      Go::new(Arc::new(GoResolver::from_env())),
      tool_cache_dir(),
    )
  }

  pub fn with_parallelism(mut self, parallelism: usize) -> Self {
    self.execute.parallelism = parallelism;
    self
  }

  pub(crate) fn workspace(&self, no_copy: bool, read_only: bool) -> Workspace {
    Workspace::new(WorkspaceOptions {
      source_path: self.source_path.clone(),
      no_copy,
      read_only,
    })
  }

  pub(crate) fn cache(&self) -> Arc<ToolCache> {
    Arc::new(ToolCache::new(self.cache_root.clone(), self.go.clone()))
  }
}

/// A declared tool, as reported by `list` and `get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
  pub name: String,
  pub import_path: String,
  pub module_path: String,
  pub version: String,
}

impl From<Tool<'_>> for ToolInfo {
  fn from(tool: Tool<'_>) -> Self {
    Self {
      name: tool.name(),
      import_path: tool.import_path(),
      module_path: tool.module_path().to_string(),
      version: tool.version().to_string(),
    }
  }
}

/// Where built tools go: `explicit`, else `$TOOLMOD_OUTPUT`, else `<root>/_tools`.
///
/// Relative environment values resolve against the project root.
pub fn resolve_output_dir(root: &Path, explicit: Option<&Path>) -> PathBuf {
  if let Some(dir) = explicit {
    return std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
  }
  match std::env::var_os(ENV_OUTPUT) {
    Some(dir) if !dir.is_empty() => root.join(dir),
    _ => root.join(DEFAULT_OUTPUT_DIR),
  }
}
