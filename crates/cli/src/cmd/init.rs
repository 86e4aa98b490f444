//! Implementation of the `toolmod init` command.

use std::path::PathBuf;

use anyhow::Result;

use toolmod_lib::ops::{Project, init};

use crate::output::{print_stat, print_success};

/// Create an empty `gotool.mod` in the project root.
///
/// # Errors
///
/// Fails if the manifest already exists or the resolver cannot initialize a module.
pub fn cmd_init(project: Option<PathBuf>) -> Result<()> {
  let project = Project::from_env(project);
  let report = super::block_on(|cancel| async move { init(&project, &cancel).await })?;

  print_success("Initialized tool manifest");
  print_stat("Manifest", &report.manifest_path.display().to_string());
  Ok(())
}
