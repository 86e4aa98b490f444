//! Manifest types for toolmod.
//!
//! A [`Manifest`] is the in-memory form of `gotool.mod`. Each
//! [`ModuleRequirement`] names one resolver module and the tool entrypoints
//! built from it; everything else the resolver records (indirect modules,
//! `replace`/`exclude` directives) is carried along untouched so a round trip
//! through the resolver loses nothing.

use serde::Serialize;

/// Sub-path denoting the module root.
pub const ROOT_SUB_PATH: &str = "/";

/// One buildable command inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolEntry {
  /// `/` for the module root, otherwise a `/`-prefixed import path relative to the module.
  pub sub_path: String,
  /// Binary name override. When `None` the name is derived from the import path.
  pub output_name: Option<String>,
}

impl ToolEntry {
  pub fn root() -> Self {
    Self::new(ROOT_SUB_PATH)
  }

  pub fn new(sub_path: impl Into<String>) -> Self {
    Self {
      sub_path: sub_path.into(),
      output_name: None,
    }
  }

  pub fn renamed(sub_path: impl Into<String>, output_name: impl Into<String>) -> Self {
    Self {
      sub_path: sub_path.into(),
      output_name: Some(output_name.into()),
    }
  }

  pub fn is_root(&self) -> bool {
    self.sub_path == ROOT_SUB_PATH
  }

  /// Full import path of this entrypoint within `module_path`.
  pub fn import_path(&self, module_path: &str) -> String {
    if self.is_root() {
      module_path.to_string()
    } else {
      format!("{}{}", module_path, self.sub_path)
    }
  }

  /// Binary name: the explicit output name, or the name `go install` would pick.
  pub fn name(&self, module_path: &str) -> String {
    match &self.output_name {
      Some(name) => name.clone(),
      None => default_binary_name(&self.import_path(module_path)),
    }
  }
}

/// Derive a binary name from an import path.
///
/// Uses the last path element, skipping a trailing major-version element
/// (`example.com/tool/v2` builds `tool`).
pub fn default_binary_name(import_path: &str) -> String {
  let mut elems = import_path.rsplit('/');
  let last = elems.next().unwrap_or(import_path);
  if is_major_version(last)
    && let Some(prev) = elems.next()
  {
    return prev.to_string();
  }
  last.to_string()
}

fn is_major_version(elem: &str) -> bool {
  let Some(digits) = elem.strip_prefix('v') else {
    return false;
  };
  !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && digits != "0" && digits != "1"
}

/// A dependency module exposing one or more tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRequirement {
  pub module_path: String,
  /// Resolver version token. Empty means unconstrained.
  pub version: String,
  pub entrypoints: Vec<ToolEntry>,
}

impl ModuleRequirement {
  pub fn new(module_path: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      module_path: module_path.into(),
      version: version.into(),
      entrypoints: Vec::new(),
    }
  }

  pub fn with_entry(mut self, entry: ToolEntry) -> Self {
    self.upsert_entry(entry);
    self
  }

  pub fn entry(&self, sub_path: &str) -> Option<&ToolEntry> {
    self.entrypoints.iter().find(|e| e.sub_path == sub_path)
  }

  /// Insert an entrypoint, replacing the output name of an existing one with
  /// the same sub-path.
  pub fn upsert_entry(&mut self, entry: ToolEntry) {
    match self.entrypoints.iter_mut().find(|e| e.sub_path == entry.sub_path) {
      Some(existing) => existing.output_name = entry.output_name,
      None => self.entrypoints.push(entry),
    }
  }

  pub fn remove_entry(&mut self, sub_path: &str) -> Option<ToolEntry> {
    let idx = self.entrypoints.iter().position(|e| e.sub_path == sub_path)?;
    Some(self.entrypoints.remove(idx))
  }

  /// Entrypoints in serialization order: shortest sub-path first, ties lexicographic.
  pub fn sorted_entrypoints(&self) -> Vec<&ToolEntry> {
    let mut entries: Vec<&ToolEntry> = self.entrypoints.iter().collect();
    entries.sort_by(|a, b| {
      a.sub_path
        .len()
        .cmp(&b.sub_path.len())
        .then_with(|| a.sub_path.cmp(&b.sub_path))
    });
    entries
  }
}

/// A requirement the resolver tracks that is not a declared tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
  pub path: String,
  pub version: String,
  pub indirect: bool,
}

/// Any other go.mod directive (`replace`, `exclude`, `retract`, ...), one entry per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
  pub keyword: String,
  pub args: Vec<String>,
}

/// Borrowed view of one tool: an entrypoint together with its requirement.
#[derive(Debug, Clone, Copy)]
pub struct Tool<'a> {
  pub requirement: &'a ModuleRequirement,
  pub entry: &'a ToolEntry,
}

impl Tool<'_> {
  pub fn import_path(&self) -> String {
    self.entry.import_path(&self.requirement.module_path)
  }

  pub fn name(&self) -> String {
    self.entry.name(&self.requirement.module_path)
  }

  pub fn module_path(&self) -> &str {
    &self.requirement.module_path
  }

  pub fn version(&self) -> &str {
    &self.requirement.version
  }
}

/// The parsed extended manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
  pub module: Option<String>,
  pub go: Option<String>,
  pub requirements: Vec<ModuleRequirement>,
  pub dependencies: Vec<Dependency>,
  pub directives: Vec<Directive>,
}

impl Manifest {
  pub fn requirement(&self, module_path: &str) -> Option<&ModuleRequirement> {
    self.requirements.iter().find(|r| r.module_path == module_path)
  }

  pub fn requirement_mut(&mut self, module_path: &str) -> Option<&mut ModuleRequirement> {
    self.requirements.iter_mut().find(|r| r.module_path == module_path)
  }

  /// Add an entrypoint to `module_path`, creating the requirement if needed.
  ///
  /// A non-empty `version` replaces the recorded one. A passthrough dependency
  /// on the same module is promoted to a tool requirement.
  pub fn insert_tool(&mut self, module_path: &str, version: &str, entry: ToolEntry) {
    self.dependencies.retain(|d| d.path != module_path);
    match self.requirement_mut(module_path) {
      Some(req) => {
        if !version.is_empty() {
          req.version = version.to_string();
        }
        req.upsert_entry(entry);
      }
      None => {
        self
          .requirements
          .push(ModuleRequirement::new(module_path, version).with_entry(entry));
      }
    }
  }

  pub fn remove_requirement(&mut self, module_path: &str) -> Option<ModuleRequirement> {
    let idx = self.requirements.iter().position(|r| r.module_path == module_path)?;
    Some(self.requirements.remove(idx))
  }

  /// Remove the entrypoint whose import path is `import_path`.
  ///
  /// A requirement left without entrypoints is removed as well.
  pub fn remove_tool(&mut self, import_path: &str) -> Option<ToolEntry> {
    let (req_idx, sub_path) = self.requirements.iter().enumerate().find_map(|(idx, req)| {
      req
        .entrypoints
        .iter()
        .find(|e| e.import_path(&req.module_path) == import_path)
        .map(|e| (idx, e.sub_path.clone()))
    })?;
    let removed = self.requirements[req_idx].remove_entry(&sub_path);
    if self.requirements[req_idx].entrypoints.is_empty() {
      self.requirements.remove(req_idx);
    }
    removed
  }

  /// Every tool in serialization order.
  pub fn tools(&self) -> impl Iterator<Item = Tool<'_>> {
    self.requirements.iter().flat_map(|requirement| {
      requirement
        .sorted_entrypoints()
        .into_iter()
        .map(move |entry| Tool { requirement, entry })
    })
  }

  pub fn find_tool(&self, import_path: &str) -> Option<Tool<'_>> {
    self.tools().find(|t| t.import_path() == import_path)
  }

  pub fn find_tool_by_name(&self, name: &str) -> Option<Tool<'_>> {
    self.tools().find(|t| t.name() == name)
  }

  pub fn is_empty(&self) -> bool {
    self.requirements.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn root_entry_uses_module_base_name() {
    let entry = ToolEntry::root();
    assert_eq!(entry.import_path("github.com/mitchellh/gox"), "github.com/mitchellh/gox");
    assert_eq!(entry.name("github.com/mitchellh/gox"), "gox");
  }

  #[test]
  fn sub_entry_uses_sub_path_base_name() {
    let entry = ToolEntry::new("/cmd/staticcheck");
    assert_eq!(entry.import_path("honnef.co/go/tools"), "honnef.co/go/tools/cmd/staticcheck");
    assert_eq!(entry.name("honnef.co/go/tools"), "staticcheck");
  }

  #[test]
  fn rename_overrides_derived_name() {
    let entry = ToolEntry::renamed("/", "ev");
    assert_eq!(entry.name("github.com/ktr0731/evans"), "ev");
  }

  #[test]
  fn major_version_suffix_is_skipped() {
    assert_eq!(default_binary_name("example.com/tool/v2"), "tool");
    assert_eq!(default_binary_name("example.com/tool/v1"), "v1");
    assert_eq!(default_binary_name("example.com/tool/vx"), "vx");
    assert_eq!(default_binary_name("tool"), "tool");
  }

  #[test]
  fn entrypoints_sort_shortest_first() {
    let req = ModuleRequirement::new("m", "v1.0.0")
      .with_entry(ToolEntry::new("/cmd/zz"))
      .with_entry(ToolEntry::new("/cmd/b"))
      .with_entry(ToolEntry::root())
      .with_entry(ToolEntry::new("/cmd/a"));
    let order: Vec<&str> = req.sorted_entrypoints().iter().map(|e| e.sub_path.as_str()).collect();
    assert_eq!(order, vec!["/", "/cmd/a", "/cmd/b", "/cmd/zz"]);
  }

  #[test]
  fn upsert_replaces_output_name() {
    let mut req = ModuleRequirement::new("m", "").with_entry(ToolEntry::new("/cmd/a"));
    req.upsert_entry(ToolEntry::renamed("/cmd/a", "alpha"));
    assert_eq!(req.entrypoints.len(), 1);
    assert_eq!(req.entrypoints[0].output_name.as_deref(), Some("alpha"));
  }

  #[test]
  fn insert_tool_creates_and_extends_requirements() {
    let mut manifest = Manifest::default();
    manifest.insert_tool("example.com/kit", "v1.0.0", ToolEntry::new("/cmd/a"));
    manifest.insert_tool("example.com/kit", "", ToolEntry::new("/cmd/b"));
    manifest.insert_tool("example.com/other", "v0.1.0", ToolEntry::root());

    assert_eq!(manifest.requirements.len(), 2);
    let kit = manifest.requirement("example.com/kit").unwrap();
    assert_eq!(kit.version, "v1.0.0");
    assert_eq!(kit.entrypoints.len(), 2);
  }

  #[test]
  fn insert_tool_promotes_dependency() {
    let mut manifest = Manifest::default();
    manifest.dependencies.push(Dependency {
      path: "example.com/kit".to_string(),
      version: "v1.0.0".to_string(),
      indirect: true,
    });
    manifest.insert_tool("example.com/kit", "v1.0.0", ToolEntry::root());
    assert!(manifest.dependencies.is_empty());
    assert!(manifest.requirement("example.com/kit").is_some());
  }

  #[test]
  fn remove_tool_drops_empty_requirement() {
    let mut manifest = Manifest::default();
    manifest.insert_tool("example.com/kit", "v1.0.0", ToolEntry::new("/cmd/a"));
    manifest.insert_tool("example.com/kit", "v1.0.0", ToolEntry::new("/cmd/b"));

    assert!(manifest.remove_tool("example.com/kit/cmd/a").is_some());
    assert!(manifest.requirement("example.com/kit").is_some());
    assert!(manifest.remove_tool("example.com/kit/cmd/b").is_some());
    assert!(manifest.requirement("example.com/kit").is_none());
    assert!(manifest.remove_tool("example.com/kit/cmd/b").is_none());
  }

  #[test]
  fn find_tool_by_name_matches_renames() {
    let mut manifest = Manifest::default();
    manifest.insert_tool("github.com/ktr0731/evans", "v0.8.0", ToolEntry::renamed("/", "ev"));
    let tool = manifest.find_tool_by_name("ev").unwrap();
    assert_eq!(tool.import_path(), "github.com/ktr0731/evans");
    assert_eq!(tool.version(), "v0.8.0");
    assert!(manifest.find_tool_by_name("evans").is_none());
  }
}
