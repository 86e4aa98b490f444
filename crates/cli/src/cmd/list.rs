//! Implementation of the `toolmod list` command.

use std::path::PathBuf;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use toolmod_lib::ops::{Project, list};

use crate::output::{OutputFormat, print_info, print_json};

pub fn cmd_list(project: Option<PathBuf>, filters: &[String], output: OutputFormat) -> Result<()> {
  let project = Project::from_env(project);
  let tools = super::block_on(|_| async move { list(&project, filters).await })?;

  if output.is_json() {
    return print_json(&tools);
  }
  if tools.is_empty() {
    print_info("No tools declared");
    return Ok(());
  }

  let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
  for tool in &tools {
    let version = if tool.version.is_empty() { "(unpinned)" } else { tool.version.as_str() };
    println!(
      "{:<width$}  {} {}",
      tool.name,
      tool.import_path,
      version.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
  Ok(())
}
