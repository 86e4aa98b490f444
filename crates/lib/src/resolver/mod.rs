//! The external package resolver (the `go` command).
//!
//! Every invocation is a [`Request`] carrying its working directory and
//! deadline explicitly. The process working directory of toolmod itself is
//! never changed. [`Go`] wraps a [`Resolver`] with typed subcommands.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::consts::{
  ENV_GO, TIMEOUT_BUILD, TIMEOUT_DOWNLOAD, TIMEOUT_GET, TIMEOUT_INIT, TIMEOUT_LIST, TIMEOUT_TIDY,
};
use crate::execute::Cancellation;

/// Errors from a resolver invocation.
#[derive(Debug, Error)]
pub enum ResolverError {
  #[error("command '{command}' timed out after {}s", timeout.as_secs())]
  TimedOut { command: String, timeout: Duration },

  #[error("command cancelled")]
  Cancelled,

  #[error("failed to execute '{command}' (exit code {code:?}): {stderr}")]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to start {program}: {source}")]
  Spawn { program: String, source: std::io::Error },

  #[error("unexpected output from '{command}': {output}")]
  UnexpectedOutput { command: String, output: String },
}

impl ResolverError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, ResolverError::Cancelled)
  }
}

/// One resolver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  /// Working directory, always the scratch directory of a transaction.
  pub dir: PathBuf,
  pub args: Vec<String>,
  pub timeout: Duration,
}

impl Request {
  pub fn new<I, S>(dir: &Path, args: I, timeout: Duration) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      dir: dir.to_path_buf(),
      args: args.into_iter().map(Into::into).collect(),
      timeout,
    }
  }

  /// Subcommand words, e.g. `"mod tidy"` or `"build"`.
  pub fn subcommand(&self) -> String {
    match self.args.first().map(String::as_str) {
      Some("mod") => self.args.iter().take(2).cloned().collect::<Vec<_>>().join(" "),
      Some(first) => first.to_string(),
      None => String::new(),
    }
  }
}

/// Runs resolver commands. Implementations return captured stdout.
#[async_trait]
pub trait Resolver: Send + Sync {
  async fn execute(&self, request: &Request, cancel: &Cancellation) -> Result<String, ResolverError>;
}

/// Resolver backed by a `go` executable.
#[derive(Debug, Clone)]
pub struct GoResolver {
  program: PathBuf,
}

impl GoResolver {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
    }
  }

  /// Use `$TOOLMOD_GO`, falling back to `go` on `PATH`.
  pub fn from_env() -> Self {
    match std::env::var_os(ENV_GO) {
      Some(program) if !program.is_empty() => Self::new(program),
      _ => Self::new("go"),
    }
  }

  pub fn program(&self) -> &Path {
    &self.program
  }
}

impl Default for GoResolver {
  fn default() -> Self {
    Self::from_env()
  }
}

#[async_trait]
impl Resolver for GoResolver {
  async fn execute(&self, request: &Request, cancel: &Cancellation) -> Result<String, ResolverError> {
    if cancel.is_cancelled() {
      return Err(ResolverError::Cancelled);
    }

    let command_line = format!("{} {}", self.program.display(), request.args.join(" "));
    debug!(command = %command_line, dir = ?request.dir, "running resolver");

    let mut command = Command::new(&self.program);
    command
      .args(&request.args)
      .current_dir(&request.dir)
      .env("GO111MODULE", "on")
      .env("GOFLAGS", "-mod=mod")
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    let child = command.spawn().map_err(|source| ResolverError::Spawn {
      program: self.program.display().to_string(),
      source,
    })?;

    // Dropping the child on cancel or timeout kills the process.
    let output = tokio::select! {
      waited = tokio::time::timeout(request.timeout, child.wait_with_output()) => match waited {
        Ok(result) => result.map_err(|source| ResolverError::Spawn {
          program: self.program.display().to_string(),
          source,
        })?,
        Err(_) => {
          return Err(ResolverError::TimedOut {
            command: command_line,
            timeout: request.timeout,
          });
        }
      },
      _ = cancel.cancelled() => return Err(ResolverError::Cancelled),
    };

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
      debug!(command = %command_line, stderr = %stderr, "resolver failed");
      return Err(ResolverError::Failed {
        command: command_line,
        code: output.status.code(),
        stderr,
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

/// Typed `go` subcommands.
#[derive(Clone)]
pub struct Go {
  resolver: Arc<dyn Resolver>,
}

impl std::fmt::Debug for Go {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Go").finish_non_exhaustive()
  }
}

impl Go {
  pub fn new(resolver: Arc<dyn Resolver>) -> Self {
    Self { resolver }
  }

  pub async fn run(&self, request: Request, cancel: &Cancellation) -> Result<String, ResolverError> {
    self.resolver.execute(&request, cancel).await
  }

  /// `go get <args>`.
  pub async fn get(&self, dir: &Path, args: &[String], cancel: &Cancellation) -> Result<(), ResolverError> {
    info!(args = ?args, "go get");
    let argv = std::iter::once("get".to_string()).chain(args.iter().cloned());
    self.run(Request::new(dir, argv, TIMEOUT_GET), cancel).await?;
    Ok(())
  }

  /// `go build -o <output> <import_path>`.
  pub async fn build(
    &self,
    dir: &Path,
    output: &Path,
    import_path: &str,
    cancel: &Cancellation,
  ) -> Result<(), ResolverError> {
    let args = [
      "build".to_string(),
      "-o".to_string(),
      output.display().to_string(),
      import_path.to_string(),
    ];
    self.run(Request::new(dir, args, TIMEOUT_BUILD), cancel).await?;
    Ok(())
  }

  pub async fn mod_tidy(&self, dir: &Path, cancel: &Cancellation) -> Result<(), ResolverError> {
    self.run(Request::new(dir, ["mod", "tidy"], TIMEOUT_TIDY), cancel).await?;
    Ok(())
  }

  pub async fn mod_download(&self, dir: &Path, cancel: &Cancellation) -> Result<(), ResolverError> {
    self
      .run(Request::new(dir, ["mod", "download"], TIMEOUT_DOWNLOAD), cancel)
      .await?;
    Ok(())
  }

  pub async fn mod_init(&self, dir: &Path, module: &str, cancel: &Cancellation) -> Result<(), ResolverError> {
    self
      .run(Request::new(dir, ["mod", "init", module], TIMEOUT_INIT), cancel)
      .await?;
    Ok(())
  }

  /// `go list <args>`, returning stdout.
  pub async fn list(&self, dir: &Path, args: &[String], cancel: &Cancellation) -> Result<String, ResolverError> {
    let argv = std::iter::once("list".to_string()).chain(args.iter().cloned());
    self.run(Request::new(dir, argv, TIMEOUT_LIST), cancel).await
  }

  /// Module path and version providing `import_path`.
  pub async fn module_of(
    &self,
    dir: &Path,
    import_path: &str,
    cancel: &Cancellation,
  ) -> Result<(String, String), ResolverError> {
    let args = [
      "-f".to_string(),
      "{{with .Module}}{{.Path}} {{.Version}}{{end}}".to_string(),
      import_path.to_string(),
    ];
    let out = self.list(dir, &args, cancel).await?;
    let mut fields = out.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
      (Some(path), Some(version), None) => Ok((path.to_string(), version.to_string())),
      _ => Err(ResolverError::UnexpectedOutput {
        command: format!("go list {}", args.join(" ")),
        output: out,
      }),
    }
  }
}
