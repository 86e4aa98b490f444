//! Remove every cached tool binary.

use std::path::PathBuf;

use serde::Serialize;

use crate::cache;
use crate::error::Error;

use super::Project;

#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
  pub cache_root: PathBuf,
  pub bytes_freed: u64,
}

pub fn clean(project: &Project) -> Result<CleanReport, Error> {
  let bytes_freed = cache::clear_dir(&project.cache_root)?;
  Ok(CleanReport {
    cache_root: project.cache_root.clone(),
    bytes_freed,
  })
}
