//! Content-keyed cache of built tool binaries.
//!
//! Each `(tool path, version)` pair maps to one flat file under the cache root.
//! Entries are written once by renaming a finished build into place and are
//! never modified afterwards, so a path returned by [`ToolCache::get`] stays
//! valid until [`ToolCache::clear`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::CACHE_KEY_HASH_LEN;
use crate::execute::Cancellation;
use crate::platform::paths::tool_cache_dir;
use crate::resolver::{Go, ResolverError};
use crate::util::hash::hash_parts;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("module downloads have not been prepared; call prepare before building")]
  NotPrepared,

  #[error(transparent)]
  Resolver(#[from] ResolverError),

  #[error("failed to {action} {}: {source}", path.display())]
  Io {
    action: &'static str,
    path: PathBuf,
    source: io::Error,
  },
}

impl CacheError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, CacheError::Resolver(e) if e.is_cancelled())
  }

  fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
    CacheError::Io {
      action,
      path: path.to_path_buf(),
      source,
    }
  }
}

/// File name of a cached tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  /// Derive the key for `path` at `version`.
  ///
  /// # Panics
  ///
  /// Panics if either argument is empty.
  pub fn new(path: &str, version: &str) -> Self {
    assert!(!path.is_empty(), "cache key requires a tool path");
    assert!(!version.is_empty(), "cache key requires a version");
    Self(format!(
      "{}-{}-{}{}",
      sanitize(path),
      sanitize(version),
      hash_parts(&[path, version], CACHE_KEY_HASH_LEN),
      std::env::consts::EXE_SUFFIX
    ))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for CacheKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

fn sanitize(s: &str) -> String {
  s.chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '-' })
    .collect()
}

/// Signals that a key has no entry yet.
struct Miss;

pub struct ToolCache {
  root: PathBuf,
  go: Go,
  prepared: OnceCell<()>,
  locks: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for ToolCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ToolCache")
      .field("root", &self.root)
      .field("prepared", &self.is_prepared())
      .finish()
  }
}

impl ToolCache {
  pub fn new(root: impl Into<PathBuf>, go: Go) -> Self {
    Self {
      root: root.into(),
      go,
      prepared: OnceCell::new(),
      locks: Mutex::new(HashMap::new()),
    }
  }

  /// Cache at the default location.
  pub fn from_env(go: Go) -> Self {
    Self::new(tool_cache_dir(), go)
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn is_prepared(&self) -> bool {
    self.prepared.initialized()
  }

  /// Download every module required by the manifest in `dir`.
  ///
  /// Runs at most once per cache instance, also under concurrent callers. A
  /// failed attempt may be retried.
  pub async fn prepare(&self, dir: &Path, cancel: &Cancellation) -> Result<(), CacheError> {
    self
      .prepared
      .get_or_try_init(|| async {
        info!(dir = ?dir, "downloading modules");
        self.go.mod_download(dir, cancel).await?;
        Ok::<(), CacheError>(())
      })
      .await?;
    Ok(())
  }

  fn find(&self, key: &CacheKey) -> Result<PathBuf, Miss> {
    let path = self.root.join(key.as_str());
    if path.is_file() { Ok(path) } else { Err(Miss) }
  }

  /// Path of the cached binary, if present.
  pub fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
    self.find(key).ok()
  }

  fn key_lock(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = match self.locks.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    locks.entry(key.clone()).or_default().clone()
  }

  /// Return the cached binary for `path@version`, building it on a miss.
  ///
  /// Hits never touch the resolver. Misses require a prior [`prepare`](Self::prepare).
  pub async fn get(
    &self,
    dir: &Path,
    path: &str,
    version: &str,
    cancel: &Cancellation,
  ) -> Result<PathBuf, CacheError> {
    let key = CacheKey::new(path, version);
    if let Ok(hit) = self.find(&key) {
      debug!(tool = %path, version = %version, "cache hit");
      return Ok(hit);
    }
    if !self.is_prepared() {
      return Err(CacheError::NotPrepared);
    }

    let lock = self.key_lock(&key);
    let _guard = lock.lock().await;
    if let Ok(hit) = self.find(&key) {
      debug!(tool = %path, version = %version, "cache hit after wait");
      return Ok(hit);
    }

    self.build(dir, &key, path, version, cancel).await
  }

  async fn build(
    &self,
    dir: &Path,
    key: &CacheKey,
    path: &str,
    version: &str,
    cancel: &Cancellation,
  ) -> Result<PathBuf, CacheError> {
    fs::create_dir_all(&self.root).map_err(|e| CacheError::io("create", &self.root, e))?;
    let staging = tempfile::Builder::new()
      .prefix(".build-")
      .tempdir_in(&self.root)
      .map_err(|e| CacheError::io("create staging directory in", &self.root, e))?;
    let output = staging.path().join(key.as_str());

    info!(tool = %path, version = %version, "building tool");
    self.go.build(dir, &output, path, cancel).await?;

    let dest = self.root.join(key.as_str());
    fs::rename(&output, &dest).map_err(|e| CacheError::io("move build into", &dest, e))?;
    debug!(tool = %path, dest = ?dest, "cached tool");
    Ok(dest)
  }

  /// Remove every cached binary. Returns the number of bytes freed.
  pub fn clear(&self) -> Result<u64, CacheError> {
    clear_dir(&self.root)
  }
}

fn dir_size(path: &Path) -> u64 {
  WalkDir::new(path)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .filter_map(|e| e.metadata().ok())
    .map(|m| m.len())
    .sum()
}

/// Remove a cache root recursively. A missing root frees nothing.
pub fn clear_dir(root: &Path) -> Result<u64, CacheError> {
  if !root.exists() {
    debug!(path = ?root, "cache already empty");
    return Ok(0);
  }
  let freed = dir_size(root);
  match fs::remove_dir_all(root) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
    Err(e) => return Err(CacheError::io("remove", root, e)),
  }
  info!(path = ?root, bytes_freed = freed, "cache cleared");
  Ok(freed)
}
