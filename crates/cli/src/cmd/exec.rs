//! Implementation of the `toolmod exec` command.
//!
//! The tool is resolved (and built on a cache miss) first; the process is
//! started only after the manifest transaction has ended.

use std::path::PathBuf;
use std::process::{Command, ExitCode};

use anyhow::{Context, Result};
use tracing::debug;

use toolmod_lib::ops::{Project, resolve_tool};

pub fn cmd_exec(project: Option<PathBuf>, name: &str, args: &[String]) -> Result<ExitCode> {
  let project = Project::from_env(project);
  let tool = super::block_on(|cancel| async move { resolve_tool(&project, name, &cancel).await })?;
  debug!(tool = %tool.import_path, version = %tool.version, path = ?tool.path, "exec");

  let mut command = Command::new(&tool.path);
  command.args(args);
  run(command, &tool.name)
}

#[cfg(unix)]
fn run(mut command: Command, name: &str) -> Result<ExitCode> {
  use std::os::unix::process::CommandExt;

  // Only returns on failure.
  let err = command.arg0(name).exec();
  Err(err).with_context(|| format!("Failed to execute {name}"))
}

#[cfg(not(unix))]
fn run(mut command: Command, name: &str) -> Result<ExitCode> {
  let status = command.status().with_context(|| format!("Failed to execute {name}"))?;
  let code = status.code().unwrap_or(1);
  Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
