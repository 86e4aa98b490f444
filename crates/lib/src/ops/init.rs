//! Create `gotool.mod` for a project.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::consts::DEFAULT_MODULE_NAME;
use crate::error::Error;
use crate::execute::Cancellation;
use crate::manifest::ManifestError;

use super::Project;

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
  pub manifest_path: PathBuf,
}

/// Initialize an empty manifest at the project root.
///
/// Fails with [`ManifestError::AlreadyExists`] when one is already present.
pub async fn init(project: &Project, cancel: &Cancellation) -> Result<InitReport, Error> {
  let tx = project.workspace(true, false).begin().await?;
  let manifest_path = tx.manifest_path();
  if manifest_path.exists() {
    return Err(ManifestError::AlreadyExists { path: manifest_path }.into());
  }

  project
    .go
    .mod_init(tx.scratch_dir(), DEFAULT_MODULE_NAME, cancel)
    .await?;
  tx.commit()?;

  info!(path = ?manifest_path, "initialized manifest");
  Ok(InitReport { manifest_path })
}
