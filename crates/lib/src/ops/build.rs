//! Build declared tools into the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::CacheKey;
use crate::error::Error;
use crate::execute::{Cancellation, Orchestrator};
use crate::util::hash::hash_file;

use super::{Project, ToolInfo, resolve_output_dir};

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
  /// Output directory. See [`resolve_output_dir`].
  pub output_dir: Option<PathBuf>,
  /// Restrict to these tools (output name or import path). Empty builds all.
  pub tools: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuiltTool {
  pub name: String,
  pub import_path: String,
  pub version: String,
  pub path: PathBuf,
  pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  pub output_dir: PathBuf,
  pub built: Vec<BuiltTool>,
}

/// Build every selected tool through the cache, one task per tool.
pub async fn build(project: &Project, options: &BuildOptions, cancel: &Cancellation) -> Result<BuildReport, Error> {
  let tx = project.workspace(false, true).begin().await?;
  let output_dir = resolve_output_dir(tx.project_root(), options.output_dir.as_deref());

  let mut selected: Vec<ToolInfo> = Vec::new();
  for tool in tx.manifest().tools().map(ToolInfo::from) {
    let wanted = options.tools.is_empty() || options.tools.iter().any(|t| *t == tool.name || *t == tool.import_path);
    if !wanted {
      continue;
    }
    if tool.version.is_empty() {
      return Err(Error::Unpinned { name: tool.name });
    }
    selected.push(tool);
  }
  if let Some(missing) = options
    .tools
    .iter()
    .find(|t| !selected.iter().any(|s| s.name == **t || s.import_path == **t))
  {
    return Err(Error::ToolNotFound { path: missing.clone() });
  }

  if selected.is_empty() {
    debug!("no tools to build");
    return Ok(BuildReport {
      output_dir,
      built: Vec::new(),
    });
  }

  fs::create_dir_all(&output_dir).map_err(|e| Error::io("create", &output_dir, e))?;

  let cache = project.cache();
  let misses = selected
    .iter()
    .filter(|t| cache.lookup(&CacheKey::new(&t.import_path, &t.version)).is_none())
    .count();
  if misses > 0 {
    cache.prepare(tx.scratch_dir(), cancel).await?;
  }

  info!(count = selected.len(), misses, output_dir = ?output_dir, "building tools");
  let mut orchestrator = Orchestrator::new(cancel, &project.execute);
  for tool in selected {
    let cache = cache.clone();
    let scratch = tx.scratch_dir().to_path_buf();
    let dest = output_dir.join(format!("{}{}", tool.name, std::env::consts::EXE_SUFFIX));
    orchestrator.spawn(tool.import_path.clone(), move |token| async move {
      let cached = cache.get(&scratch, &tool.import_path, &tool.version, &token).await?;
      install(&cached, &dest)?;
      let sha256 = hash_file(&dest).map_err(|e| Error::io("hash", &dest, e))?;
      debug!(tool = %tool.import_path, dest = ?dest, "installed");
      Ok(BuiltTool {
        name: tool.name,
        import_path: tool.import_path,
        version: tool.version,
        path: dest,
        sha256,
      })
    });
  }

  let built = orchestrator.wait().await?.into_iter().map(|(_, built)| built).collect();
  Ok(BuildReport { output_dir, built })
}

/// Copy `src` to `dest` keeping its mode, replacing `dest` by rename.
fn install(src: &Path, dest: &Path) -> Result<(), Error> {
  let file_name = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
  let staging = dest.with_file_name(format!(".{file_name}.tmp"));
  fs::copy(src, &staging).map_err(|e| Error::io("copy", src, e))?;
  fs::rename(&staging, dest).map_err(|e| {
    let _ = fs::remove_file(&staging);
    Error::io("install", dest, e)
  })
}
