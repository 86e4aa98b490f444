//! Locate a tool binary for execution.

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::cache::CacheKey;
use crate::error::Error;
use crate::execute::Cancellation;

use super::Project;

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTool {
  pub name: String,
  pub import_path: String,
  pub version: String,
  /// Cached binary. Stays valid after the transaction ends.
  pub path: PathBuf,
}

/// Find the tool named `name` and return its cached binary, building it if needed.
///
/// The caller runs the binary once this returns, outside any transaction.
pub async fn resolve_tool(project: &Project, name: &str, cancel: &Cancellation) -> Result<ResolvedTool, Error> {
  let tx = project.workspace(false, true).begin().await?;
  let tool = tx
    .manifest()
    .find_tool_by_name(name)
    .ok_or_else(|| Error::ToolNotFound { path: name.to_string() })?;
  if tool.version().is_empty() {
    return Err(Error::Unpinned { name: name.to_string() });
  }
  let import_path = tool.import_path();
  let version = tool.version().to_string();

  let cache = project.cache();
  let path = match cache.lookup(&CacheKey::new(&import_path, &version)) {
    Some(path) => path,
    None => {
      debug!(tool = %import_path, "not cached, preparing build");
      cache.prepare(tx.scratch_dir(), cancel).await?;
      cache.get(tx.scratch_dir(), &import_path, &version, cancel).await?
    }
  };

  Ok(ResolvedTool {
    name: name.to_string(),
    import_path,
    version,
    path,
  })
}
