//! Implementation of the `toolmod remove` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use toolmod_lib::ops::{Project, remove};

use crate::output::{print_change, print_success, print_warning};

pub fn cmd_remove(project: Option<PathBuf>, paths: &[String]) -> Result<()> {
  let project = Project::from_env(project);
  let report = super::block_on(|cancel| async move { remove(&project, paths, &cancel).await })
    .context("Remove failed")?;

  print_success(&format!("Removed {} tool(s)", report.removed.len()));
  for path in &report.removed {
    print_change(false, path);
  }
  for module in &report.dropped {
    print_warning(&format!("{module} was dropped by go and removed from gotool.mod"));
  }
  Ok(())
}
