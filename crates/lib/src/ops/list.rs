//! List declared tools.

use crate::error::Error;

use super::{Project, ToolInfo};

/// Tools declared in the manifest, optionally restricted to `filters`.
///
/// A filter matches a tool's module path, import path or output name.
pub async fn list(project: &Project, filters: &[String]) -> Result<Vec<ToolInfo>, Error> {
  let tx = project.workspace(false, true).begin().await?;
  let tools = tx
    .manifest()
    .tools()
    .map(ToolInfo::from)
    .filter(|t| {
      filters.is_empty()
        || filters
          .iter()
          .any(|f| *f == t.module_path || *f == t.import_path || *f == t.name)
    })
    .collect();
  Ok(tools)
}
