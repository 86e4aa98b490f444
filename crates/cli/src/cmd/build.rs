//! Implementation of the `toolmod build` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use toolmod_lib::ops::{BuildOptions, Project, build};

use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_success, symbols, truncate_hash};

pub fn cmd_build(project: Option<PathBuf>, tools: Vec<String>, dir: Option<PathBuf>, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let options = BuildOptions { output_dir: dir, tools };
  let project = Project::from_env(project);
  let report =
    super::block_on(|cancel| async move { build(&project, &options, &cancel).await }).context("Build failed")?;

  if output.is_json() {
    return print_json(&report);
  }

  if report.built.is_empty() {
    print_info("No tools declared");
    return Ok(());
  }

  print_success(&format!("Built {} tool(s)", report.built.len()));
  for tool in &report.built {
    println!(
      "  {} {} {} {}",
      tool.name,
      symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      tool.path.display(),
      truncate_hash(&tool.sha256).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
  print_stat("Duration", &format_duration(start.elapsed()));
  Ok(())
}
