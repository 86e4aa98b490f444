//! Transactional staging of the manifest for resolver commands.
//!
//! A [`Transaction`] owns a scratch directory holding the plain `go.mod`, the
//! checksum file and the tool reference source. Resolver commands run there
//! with the scratch directory passed explicitly as their working directory.
//! [`Transaction::commit`] folds the resolver's result back into `gotool.mod`
//! with a single atomic write. Dropping a transaction without committing
//! discards the scratch directory and leaves the project untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::consts::{
  APP_NAME, CHECKSUM_FILENAME, MANIFEST_FILENAME, REFERENCES_FILENAME, RESOLVER_CHECKSUM, RESOLVER_MANIFEST,
};
use crate::error::Error;
use crate::manifest::{self, Manifest, ManifestError, render_references};

/// How a [`Workspace`] stages and commits.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
  /// Project root. When unset, the enclosing git work tree is used.
  pub source_path: Option<PathBuf>,
  /// Skip staging the existing manifest into the scratch directory.
  pub no_copy: bool,
  /// Never write back to the project.
  pub read_only: bool,
}

/// Outcome of a commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommitReport {
  /// Whether `gotool.mod` was written.
  pub written: bool,
  pub manifest_path: PathBuf,
  /// Tool modules the resolver no longer required.
  pub dropped: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
  options: WorkspaceOptions,
}

impl Workspace {
  pub fn new(options: WorkspaceOptions) -> Self {
    Self { options }
  }

  pub fn options(&self) -> &WorkspaceOptions {
    &self.options
  }

  /// Resolve the project root as an absolute path.
  pub async fn project_root(&self) -> Result<PathBuf, Error> {
    match &self.options.source_path {
      Some(path) => dunce::canonicalize(path).map_err(|e| Error::ProjectRoot {
        message: format!("{}: {e}", path.display()),
      }),
      None => git_toplevel().await,
    }
  }

  /// Begin a transaction: create the scratch directory and stage the manifest.
  pub async fn begin(&self) -> Result<Transaction, Error> {
    let root = self.project_root().await?;
    let scratch = tempfile::Builder::new()
      .prefix(&format!("{APP_NAME}-"))
      .tempdir()
      .map_err(|e| Error::io("create scratch directory in", std::env::temp_dir(), e))?;
    debug!(root = ?root, scratch = ?scratch.path(), "transaction started");

    let mut tx = Transaction {
      root,
      scratch,
      manifest: Manifest::default(),
      read_only: self.options.read_only,
    };
    if !self.options.no_copy {
      tx.stage()?;
    }
    Ok(tx)
  }

  /// Run `f` inside a transaction and commit if it succeeds.
  ///
  /// The scratch directory is removed on every path out of this function.
  pub async fn run<T, F>(&self, f: F) -> Result<T, Error>
  where
    F: AsyncFnOnce(&mut Transaction) -> Result<T, Error>,
  {
    let mut tx = self.begin().await?;
    let value = f(&mut tx).await?;
    tx.commit()?;
    Ok(value)
  }
}

async fn git_toplevel() -> Result<PathBuf, Error> {
  let output = Command::new("git")
    .args(["rev-parse", "--show-toplevel"])
    .output()
    .await
    .map_err(|e| Error::ProjectRoot {
      message: format!("failed to run git: {e}"),
    })?;
  if !output.status.success() {
    return Err(Error::ProjectRoot {
      message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }
  let top = String::from_utf8_lossy(&output.stdout).trim().to_string();
  dunce::canonicalize(&top).map_err(|e| Error::ProjectRoot {
    message: format!("{top}: {e}"),
  })
}

/// A staged manifest and its scratch directory.
#[derive(Debug)]
pub struct Transaction {
  root: PathBuf,
  scratch: TempDir,
  manifest: Manifest,
  read_only: bool,
}

impl Transaction {
  pub fn project_root(&self) -> &Path {
    &self.root
  }

  /// Working directory for every resolver call of this transaction.
  pub fn scratch_dir(&self) -> &Path {
    self.scratch.path()
  }

  pub fn manifest(&self) -> &Manifest {
    &self.manifest
  }

  pub fn manifest_mut(&mut self) -> &mut Manifest {
    &mut self.manifest
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.root.join(MANIFEST_FILENAME)
  }

  fn stage(&mut self) -> Result<(), Error> {
    let parsed = manifest::parse_file(&self.manifest_path())?;
    self.manifest = parsed.manifest;

    let go_mod = self.scratch.path().join(RESOLVER_MANIFEST);
    fs::write(&go_mod, parsed.canonical).map_err(|e| Error::io("write", &go_mod, e))?;
    self.write_references()?;

    let sum = self.root.join(CHECKSUM_FILENAME);
    if sum.is_file() {
      let dest = self.scratch.path().join(RESOLVER_CHECKSUM);
      fs::copy(&sum, &dest).map_err(|e| Error::io("copy", &sum, e))?;
    }
    debug!(tools = self.manifest.tools().count(), "manifest staged");
    Ok(())
  }

  /// Regenerate the reference source from the current manifest.
  pub fn write_references(&self) -> Result<(), Error> {
    self.write_references_with(&[])
  }

  /// Regenerate the reference source, also importing `extra` paths.
  pub fn write_references_with(&self, extra: &[String]) -> Result<(), Error> {
    let mut paths: Vec<String> = self.manifest.tools().map(|t| t.import_path()).collect();
    paths.extend(extra.iter().cloned());
    let path = self.scratch.path().join(REFERENCES_FILENAME);
    fs::write(&path, render_references(paths.iter().map(String::as_str))).map_err(|e| Error::io("write", &path, e))
  }

  /// Merge the scratch `go.mod` back into the project manifest.
  ///
  /// Read-only transactions end without writing.
  pub fn commit(self) -> Result<CommitReport, Error> {
    let manifest_path = self.manifest_path();
    if self.read_only {
      return Ok(CommitReport {
        written: false,
        manifest_path,
        dropped: Vec::new(),
      });
    }

    let go_mod = self.scratch.path().join(RESOLVER_MANIFEST);
    let text = fs::read_to_string(&go_mod).map_err(|source| ManifestError::Read {
      path: go_mod.clone(),
      source,
    })?;
    let merged = manifest::merge(&text, &self.manifest)?;
    let formatted = manifest::format(&merged.manifest);
    // Never persist a manifest that would not read back.
    manifest::parse_str(&formatted)?;

    let sum = self.scratch.path().join(RESOLVER_CHECKSUM);
    if sum.is_file() {
      let contents = fs::read(&sum).map_err(|e| Error::io("read", &sum, e))?;
      write_atomic(&self.root, &self.root.join(CHECKSUM_FILENAME), &contents)?;
    }
    write_atomic(&self.root, &manifest_path, formatted.as_bytes())?;

    let dropped: Vec<String> = merged.dropped.into_iter().map(|r| r.module_path).collect();
    if !dropped.is_empty() {
      warn!(modules = ?dropped, "tools removed by the resolver");
    }
    info!(path = ?manifest_path, "manifest written");
    Ok(CommitReport {
      written: true,
      manifest_path,
      dropped,
    })
  }
}

/// Replace `dest` with `contents` via a temp file in `dir` and a rename.
fn write_atomic(dir: &Path, dest: &Path, contents: &[u8]) -> Result<(), Error> {
  let mut tmp = tempfile::Builder::new()
    .prefix(&format!(".{APP_NAME}-"))
    .tempfile_in(dir)
    .map_err(|e| Error::io("create temp file in", dir, e))?;
  tmp.write_all(contents).map_err(|e| Error::io("write", tmp.path().to_path_buf(), e))?;

  let permissions = match fs::metadata(dest) {
    Ok(meta) => Some(meta.permissions()),
    Err(_) => default_permissions(),
  };
  if let Some(permissions) = permissions {
    fs::set_permissions(tmp.path(), permissions).map_err(|e| Error::io("set permissions on", tmp.path().to_path_buf(), e))?;
  }

  tmp.persist(dest).map_err(|e| Error::io("replace", dest, e.error))?;
  Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
  use std::os::unix::fs::PermissionsExt;
  Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
  None
}
