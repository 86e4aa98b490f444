//! Implementation of the `toolmod clean` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use toolmod_lib::ops::{Project, clean};

use crate::output::{OutputFormat, format_bytes, print_json, print_stat, print_success};

pub fn cmd_clean(project: Option<PathBuf>, output: OutputFormat) -> Result<()> {
  let project = Project::from_env(project);
  let report = clean(&project).context("Failed to clear the build cache")?;

  if output.is_json() {
    return print_json(&report);
  }
  print_success("Build cache cleared");
  print_stat("Location", &report.cache_root.display().to_string());
  print_stat("Space freed", &format_bytes(report.bytes_freed));
  Ok(())
}
