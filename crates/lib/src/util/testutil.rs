//! Test utilities for toolmod-lib.
//!
//! [`MockResolver`] stands in for the `go` command: it records every request
//! and imitates the few side effects operations rely on.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::execute::Cancellation;
use crate::resolver::{Request, Resolver, ResolverError};

type Handler = Box<dyn Fn(&Request) -> Option<Result<String, ResolverError>> + Send + Sync>;

/// Recording resolver.
///
/// Default behavior per subcommand:
/// - `build -o <out> <pkg>` writes an executable script at `<out>` printing `<pkg>`
/// - `mod init <name>` writes `go.mod` declaring `<name>`
/// - anything else succeeds with empty output
///
/// A handler returning `Some` overrides the default.
pub struct MockResolver {
  requests: Mutex<Vec<Request>>,
  handler: Option<Handler>,
  delay: Option<Duration>,
}

impl Default for MockResolver {
  fn default() -> Self {
    Self::new()
  }
}

impl MockResolver {
  pub fn new() -> Self {
    Self {
      requests: Mutex::new(Vec::new()),
      handler: None,
      delay: None,
    }
  }

  pub fn with_handler<F>(mut self, handler: F) -> Self
  where
    F: Fn(&Request) -> Option<Result<String, ResolverError>> + Send + Sync + 'static,
  {
    self.handler = Some(Box::new(handler));
    self
  }

  /// Sleep before answering, honoring cancellation.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn requests(&self) -> Vec<Request> {
    self.requests.lock().unwrap().clone()
  }

  /// Number of recorded requests for a subcommand such as `"build"` or `"mod download"`.
  pub fn calls(&self, subcommand: &str) -> usize {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.subcommand() == subcommand)
      .count()
  }
}

/// Write an executable shell script that prints `text`.
pub fn write_fake_binary(path: &Path, text: &str) -> std::io::Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, format!("#!/bin/sh\necho {text}\n"))?;
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
  }
  Ok(())
}

fn default_response(request: &Request) -> Result<String, ResolverError> {
  let args: Vec<&str> = request.args.iter().map(String::as_str).collect();
  match args.as_slice() {
    ["build", "-o", out, pkg] => {
      let out = PathBuf::from(out);
      let out = if out.is_absolute() { out } else { request.dir.join(out) };
      write_fake_binary(&out, pkg).map_err(|e| ResolverError::Failed {
        command: args.join(" "),
        code: None,
        stderr: e.to_string(),
      })?;
      Ok(String::new())
    }
    ["mod", "init", name] => {
      std::fs::write(request.dir.join("go.mod"), format!("module {name}\n")).map_err(|e| ResolverError::Failed {
        command: args.join(" "),
        code: None,
        stderr: e.to_string(),
      })?;
      Ok(String::new())
    }
    _ => Ok(String::new()),
  }
}

#[async_trait]
impl Resolver for MockResolver {
  async fn execute(&self, request: &Request, cancel: &Cancellation) -> Result<String, ResolverError> {
    self.requests.lock().unwrap().push(request.clone());

    if let Some(delay) = self.delay {
      tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = cancel.cancelled() => return Err(ResolverError::Cancelled),
      }
    }
    if cancel.is_cancelled() {
      return Err(ResolverError::Cancelled);
    }

    if let Some(handler) = &self.handler
      && let Some(response) = handler(request)
    {
      return response;
    }
    default_response(request)
  }
}

/// A tiny module registry behind a [`MockResolver`].
///
/// Understands `get`, `list -f` and `mod tidy` well enough to drive the
/// operations end to end: requirements live in the scratch `go.mod`, and each
/// registered module has one "latest" version.
#[derive(Debug, Clone, Default)]
pub struct FakeRegistry {
  modules: Vec<(String, String)>,
}

impl FakeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn module(mut self, path: &str, latest: &str) -> Self {
    self.modules.push((path.to_string(), latest.to_string()));
    self
  }

  fn providing(&self, import_path: &str) -> Option<&(String, String)> {
    self
      .modules
      .iter()
      .filter(|(m, _)| import_path == m || import_path.starts_with(&format!("{m}/")))
      .max_by_key(|(m, _)| m.len())
  }

  pub fn into_resolver(self) -> MockResolver {
    MockResolver::new().with_handler(move |req| self.handle(req))
  }

  fn handle(&self, req: &Request) -> Option<Result<String, ResolverError>> {
    match req.subcommand().as_str() {
      "get" => Some(self.get(req)),
      "list" => Some(self.list(req)),
      "mod tidy" => Some(self.tidy(req)),
      _ => None,
    }
  }

  fn not_found(req: &Request, path: &str) -> ResolverError {
    ResolverError::Failed {
      command: format!("go {}", req.args.join(" ")),
      code: Some(1),
      stderr: format!("go: cannot find module providing package {path}\n"),
    }
  }

  fn get(&self, req: &Request) -> Result<String, ResolverError> {
    let upgrade = req.args.iter().any(|a| a == "-u");
    let mut required = read_requirements(&req.dir);
    for arg in req.args.iter().skip(1).filter(|a| !a.starts_with('-')) {
      let (path, version) = match arg.split_once('@') {
        Some((p, v)) => (p, Some(v)),
        None => (arg.as_str(), None),
      };
      let (module, latest) = self.providing(path).ok_or_else(|| Self::not_found(req, path))?;
      let version = match (version, required.iter().find(|(m, _)| m == module)) {
        (Some(v), _) if v != "latest" => v.to_string(),
        (None, Some((_, current))) if !upgrade => current.clone(),
        _ => latest.clone(),
      };
      required.retain(|(m, _)| m != module);
      required.push((module.clone(), version));
    }
    write_requirements(&req.dir, &required);
    Ok(String::new())
  }

  fn list(&self, req: &Request) -> Result<String, ResolverError> {
    let path = req.args.last().cloned().unwrap_or_default();
    let (module, _) = self.providing(&path).ok_or_else(|| Self::not_found(req, &path))?;
    let required = read_requirements(&req.dir);
    let (_, version) = required
      .iter()
      .find(|(m, _)| m == module)
      .ok_or_else(|| Self::not_found(req, &path))?;
    Ok(format!("{module} {version}\n"))
  }

  fn tidy(&self, req: &Request) -> Result<String, ResolverError> {
    let imports: Vec<String> = std::fs::read_to_string(req.dir.join("tools.go"))
      .unwrap_or_default()
      .lines()
      .filter_map(|l| l.trim().strip_prefix("_ \"").and_then(|r| r.strip_suffix('"')).map(str::to_string))
      .collect();
    let mut required = read_requirements(&req.dir);
    required.retain(|(m, _)| imports.iter().any(|i| self.providing(i).is_some_and(|(p, _)| p == m)));
    write_requirements(&req.dir, &required);
    Ok(String::new())
  }
}

fn read_requirements(dir: &Path) -> Vec<(String, String)> {
  let text = std::fs::read_to_string(dir.join("go.mod")).unwrap_or_default();
  let parsed = crate::manifest::parse_str(&text).expect("scratch go.mod should parse");
  let mut required: Vec<(String, String)> = parsed
    .manifest
    .requirements
    .into_iter()
    .map(|r| (r.module_path, r.version))
    .collect();
  required.extend(parsed.manifest.dependencies.into_iter().map(|d| (d.path, d.version)));
  required
}

fn write_requirements(dir: &Path, required: &[(String, String)]) {
  let mut text = String::from("module tools\n");
  if !required.is_empty() {
    text.push_str("\nrequire (\n");
    for (m, v) in required {
      text.push_str(&format!("\t{m} {v}\n"));
    }
    text.push_str(")\n");
  }
  std::fs::write(dir.join("go.mod"), text).expect("write scratch go.mod");
}
