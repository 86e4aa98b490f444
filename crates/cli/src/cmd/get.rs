//! Implementation of the `toolmod get` command.
//!
//! Records tools in `gotool.mod` and, unless `--no-build` is given, builds
//! them into the output directory.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use toolmod_lib::ops::{GetOptions, GetSpec, Project, get};

use crate::output::{print_change, print_info, print_stat, print_success, print_warning};

pub fn cmd_get(
  project: Option<PathBuf>,
  specs: &[String],
  update: bool,
  name: Option<String>,
  dir: Option<PathBuf>,
  no_build: bool,
) -> Result<()> {
  if specs.is_empty() && !update {
    bail!("no tools given; pass importpath[@version] or -u to upgrade all");
  }
  if name.is_some() && specs.len() != 1 {
    bail!("--name needs exactly one tool");
  }

  let mut parsed = Vec::with_capacity(specs.len());
  for spec in specs {
    let mut spec = GetSpec::parse(spec)?;
    if let Some(name) = &name {
      spec = spec.with_output_name(name.clone());
    }
    parsed.push(spec);
  }

  let options = GetOptions {
    update,
    build: !no_build,
    output_dir: dir,
  };
  let project = Project::from_env(project);
  let report = super::block_on(|cancel| async move { get(&project, &parsed, &options, &cancel).await })
    .context("Get failed")?;

  if report.tools.is_empty() {
    print_info("No tools to update");
    return Ok(());
  }

  print_success(&format!("Recorded {} tool(s)", report.tools.len()));
  for tool in &report.tools {
    print_change(true, &format!("{} ({}@{})", tool.name, tool.import_path, tool.version));
  }
  for module in &report.dropped {
    print_warning(&format!("{module} was dropped by go and removed from gotool.mod"));
  }
  if let Some(build) = &report.build {
    print_stat("Built", &build.built.len().to_string());
    print_stat("Output", &build.output_dir.display().to_string());
  }

  Ok(())
}
