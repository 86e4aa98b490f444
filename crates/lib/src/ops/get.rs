//! Add or upgrade tools.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Error;
use crate::execute::{Cancellation, Orchestrator};
use crate::manifest::{ROOT_SUB_PATH, ToolEntry, is_valid_output_name};

use super::build::{BuildOptions, BuildReport, build};
use super::{Project, ToolInfo};

/// One `importpath[@version]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSpec {
  pub import_path: String,
  pub version: Option<String>,
  pub output_name: Option<String>,
}

impl GetSpec {
  pub fn parse(spec: &str) -> Result<Self, Error> {
    let invalid = || Error::InvalidToolPath { path: spec.to_string() };
    let (path, version) = match spec.split_once('@') {
      Some((_, "")) => return Err(invalid()),
      Some((path, version)) => (path, Some(version.to_string())),
      None => (spec, None),
    };
    let valid = !path.is_empty()
      && !path.starts_with('/')
      && !path.ends_with('/')
      && path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '/' | '+'));
    if !valid {
      return Err(invalid());
    }
    Ok(Self {
      import_path: path.to_string(),
      version,
      output_name: None,
    })
  }

  pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
    self.output_name = Some(name.into());
    self
  }

  fn resolver_arg(&self) -> String {
    match &self.version {
      Some(version) => format!("{}@{}", self.import_path, version),
      None => self.import_path.clone(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
  /// Upgrade to the newest versions. With no specs, upgrades every declared tool.
  pub update: bool,
  /// Build fetched tools afterwards.
  pub build: bool,
  pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetReport {
  pub tools: Vec<ToolInfo>,
  /// Tool modules the resolver dropped while fetching.
  pub dropped: Vec<String>,
  pub build: Option<BuildReport>,
}

/// Fetch `specs` with the resolver and record them in the manifest.
pub async fn get(
  project: &Project,
  specs: &[GetSpec],
  options: &GetOptions,
  cancel: &Cancellation,
) -> Result<GetReport, Error> {
  if let Some(name) = specs
    .iter()
    .filter_map(|s| s.output_name.as_deref())
    .find(|n| !is_valid_output_name(n))
  {
    return Err(Error::InvalidToolName { name: name.to_string() });
  }

  let mut tx = project.workspace(false, false).begin().await?;

  let specs: Vec<GetSpec> = if specs.is_empty() && options.update {
    tx.manifest()
      .tools()
      .map(|t| GetSpec {
        import_path: t.import_path(),
        version: None,
        output_name: t.entry.output_name.clone(),
      })
      .collect()
  } else {
    specs.to_vec()
  };
  if specs.is_empty() {
    return Ok(GetReport {
      tools: Vec::new(),
      dropped: Vec::new(),
      build: None,
    });
  }

  let extra: Vec<String> = specs.iter().map(|s| s.import_path.clone()).collect();
  tx.write_references_with(&extra)?;

  let mut args: Vec<String> = Vec::new();
  if options.update {
    args.push("-u".to_string());
  }
  args.extend(specs.iter().map(GetSpec::resolver_arg));
  project.go.get(tx.scratch_dir(), &args, cancel).await?;

  let mut orchestrator = Orchestrator::new(cancel, &project.execute);
  for spec in &specs {
    let go = project.go.clone();
    let scratch = tx.scratch_dir().to_path_buf();
    let import_path = spec.import_path.clone();
    orchestrator.spawn(spec.import_path.clone(), move |token| async move {
      Ok(go.module_of(&scratch, &import_path, &token).await?)
    });
  }
  let modules = orchestrator.wait().await?;

  let mut fetched = Vec::with_capacity(specs.len());
  for (spec, (_, (module, version))) in specs.iter().zip(modules) {
    let sub_path = match spec.import_path.strip_prefix(module.as_str()) {
      Some("") => ROOT_SUB_PATH.to_string(),
      Some(sub) if sub.starts_with('/') => sub.to_string(),
      _ => {
        return Err(Error::InvalidToolPath {
          path: spec.import_path.clone(),
        });
      }
    };
    // An unnamed re-fetch keeps the rename already on record.
    let output_name = spec.output_name.clone().or_else(|| {
      tx.manifest()
        .requirement(&module)
        .and_then(|r| r.entry(&sub_path))
        .and_then(|e| e.output_name.clone())
    });
    let entry = ToolEntry { sub_path, output_name };

    let name = entry.name(&module);
    if let Some(other) = tx.manifest().find_tool_by_name(&name)
      && other.import_path() != spec.import_path
    {
      return Err(Error::DuplicateToolName {
        name,
        path: other.import_path(),
      });
    }

    debug!(tool = %spec.import_path, module = %module, version = %version, "resolved");
    tx.manifest_mut().insert_tool(&module, &version, entry);
    fetched.push(spec.import_path.clone());
  }

  tx.write_references()?;
  project.go.mod_tidy(tx.scratch_dir(), cancel).await?;
  let report = tx.commit()?;
  info!(count = fetched.len(), "tools recorded");

  let after = project.workspace(false, true).begin().await?;
  let tools: Vec<ToolInfo> = after
    .manifest()
    .tools()
    .map(ToolInfo::from)
    .filter(|t| fetched.contains(&t.import_path))
    .collect();
  drop(after);

  let build_report = if options.build && !tools.is_empty() {
    let build_options = BuildOptions {
      output_dir: options.output_dir.clone(),
      tools: tools.iter().map(|t| t.import_path.clone()).collect(),
    };
    Some(build(project, &build_options, cancel).await?)
  } else {
    None
  };

  Ok(GetReport {
    tools,
    dropped: report.dropped,
    build: build_report,
  })
}
