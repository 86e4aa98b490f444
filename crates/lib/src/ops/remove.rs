//! Remove tools from the manifest.

use serde::Serialize;
use tracing::info;

use crate::error::Error;
use crate::execute::Cancellation;

use super::Project;

#[derive(Debug, Clone, Serialize)]
pub struct RemoveReport {
  /// Import paths of the removed entrypoints.
  pub removed: Vec<String>,
  pub dropped: Vec<String>,
}

/// Remove each path: a module path drops the whole requirement, an import
/// path drops a single entrypoint.
///
/// Fails without writing if any path matches nothing.
pub async fn remove(project: &Project, paths: &[String], cancel: &Cancellation) -> Result<RemoveReport, Error> {
  let mut tx = project.workspace(false, false).begin().await?;

  let mut removed = Vec::new();
  for path in paths {
    let manifest = tx.manifest_mut();
    if let Some(req) = manifest.remove_requirement(path) {
      removed.extend(req.sorted_entrypoints().iter().map(|e| e.import_path(&req.module_path)));
    } else if manifest.remove_tool(path).is_some() {
      removed.push(path.clone());
    } else {
      return Err(Error::ToolNotFound { path: path.clone() });
    }
  }

  tx.write_references()?;
  project.go.mod_tidy(tx.scratch_dir(), cancel).await?;
  let report = tx.commit()?;
  info!(removed = ?removed, "tools removed");

  Ok(RemoveReport {
    removed,
    dropped: report.dropped,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::testing::Fixture;
  use crate::util::testutil::FakeRegistry;

  const MANIFEST: &str = "module tools\n\nrequire (\n\thonnef.co/go/tools:/cmd/staticcheck,/cmd/structlayout@sl v0.4.6\n\tgithub.com/mitchellh/gox v1.0.1\n)\n";

  fn registry() -> FakeRegistry {
    FakeRegistry::new()
      .module("honnef.co/go/tools", "v0.4.6")
      .module("github.com/mitchellh/gox", "v1.0.1")
  }

  #[tokio::test]
  async fn removes_single_entrypoint() {
    let fx = Fixture::new(Some(MANIFEST), registry());
    let report = remove(
      &fx.project,
      &["honnef.co/go/tools/cmd/structlayout".to_string()],
      &Cancellation::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.removed, vec!["honnef.co/go/tools/cmd/structlayout"]);
    assert_eq!(
      fx.manifest_text(),
      "module tools\n\nrequire (\n\thonnef.co/go/tools:/cmd/staticcheck v0.4.6\n\tgithub.com/mitchellh/gox v1.0.1\n)\n"
    );
  }

  #[tokio::test]
  async fn removes_whole_module() {
    let fx = Fixture::new(Some(MANIFEST), registry());
    let report = remove(&fx.project, &["honnef.co/go/tools".to_string()], &Cancellation::new())
      .await
      .unwrap();

    assert_eq!(report.removed.len(), 2);
    assert_eq!(
      fx.manifest_text(),
      "module tools\n\nrequire (\n\tgithub.com/mitchellh/gox v1.0.1\n)\n"
    );
    assert_eq!(fx.resolver.calls("mod tidy"), 1);
  }

  #[tokio::test]
  async fn unknown_path_fails_without_writing() {
    let fx = Fixture::new(Some(MANIFEST), registry());
    let err = remove(&fx.project, &["example.com/none".to_string()], &Cancellation::new())
      .await
      .unwrap_err();

    assert!(matches!(err, Error::ToolNotFound { .. }));
    assert_eq!(fx.manifest_text(), MANIFEST);
    assert_eq!(fx.resolver.calls("mod tidy"), 0);
  }
}
