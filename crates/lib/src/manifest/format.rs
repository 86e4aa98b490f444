//! Serialization of manifests.
//!
//! [`format`] writes the extended manifest, [`canonicalize`] the plain form
//! handed to the resolver, and [`tool_references`] the synthetic Go source that
//! imports every declared tool.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::consts::{APP_NAME, DEFAULT_MODULE_NAME};

use super::types::{Dependency, Directive, Manifest, ModuleRequirement};

/// Extended path field: `mod`, `mod@name`, or `mod:/a,/b@name`.
pub fn format_path_field(req: &ModuleRequirement) -> String {
  let entries = req.sorted_entrypoints();
  if let [only] = entries.as_slice()
    && only.is_root()
  {
    return match &only.output_name {
      Some(name) => format!("{}@{}", req.module_path, name),
      None => req.module_path.clone(),
    };
  }

  let items: Vec<String> = entries
    .iter()
    .map(|e| match &e.output_name {
      Some(name) => format!("{}@{}", e.sub_path, name),
      None => e.sub_path.clone(),
    })
    .collect();
  format!("{}:{}", req.module_path, items.join(","))
}

fn quote(token: &str) -> String {
  let needs_quotes =
    token.is_empty() || token.contains(|c: char| c.is_whitespace() || matches!(c, '"' | '(' | ')' | '`')) || token.contains("//");
  if !needs_quotes {
    return token.to_string();
  }
  let mut out = String::with_capacity(token.len() + 2);
  out.push('"');
  for c in token.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

fn write_header(out: &mut String, module: &str, go: Option<&str>) {
  let _ = writeln!(out, "module {}", quote(module));
  if let Some(go) = go {
    let _ = write!(out, "\ngo {}\n", quote(go));
  }
}

fn write_require_block(out: &mut String, lines: &[String]) {
  if lines.is_empty() {
    return;
  }
  out.push_str("\nrequire (\n");
  for line in lines {
    let _ = writeln!(out, "\t{line}");
  }
  out.push_str(")\n");
}

fn dependency_line(dep: &Dependency) -> String {
  let mut line = format!("{} {}", quote(&dep.path), quote(&dep.version));
  if dep.indirect {
    line.push_str(" // indirect");
  }
  line
}

fn write_directives(out: &mut String, directives: &[Directive]) {
  if directives.is_empty() {
    return;
  }
  out.push('\n');
  for d in directives {
    let args: Vec<String> = d.args.iter().map(|a| quote(a)).collect();
    let _ = writeln!(out, "{} {}", d.keyword, args.join(" "));
  }
}

/// Canonical extended manifest text.
pub fn format(manifest: &Manifest) -> String {
  let mut out = String::new();
  write_header(
    &mut out,
    manifest.module.as_deref().unwrap_or(DEFAULT_MODULE_NAME),
    manifest.go.as_deref(),
  );

  let tools: Vec<String> = manifest
    .requirements
    .iter()
    .filter(|r| !r.entrypoints.is_empty())
    .map(|r| {
      let field = quote(&format_path_field(r));
      if r.version.is_empty() {
        field
      } else {
        format!("{} {}", field, quote(&r.version))
      }
    })
    .collect();
  write_require_block(&mut out, &tools);

  let deps: Vec<String> = manifest.dependencies.iter().map(dependency_line).collect();
  write_require_block(&mut out, &deps);

  write_directives(&mut out, &manifest.directives);
  out
}

/// Plain go.mod text the resolver understands.
///
/// Requirements without a version are left for the resolver to add.
pub fn canonicalize(manifest: &Manifest) -> String {
  let mut out = String::new();
  write_header(
    &mut out,
    manifest.module.as_deref().unwrap_or(DEFAULT_MODULE_NAME),
    manifest.go.as_deref(),
  );

  let mut lines: Vec<String> = manifest
    .requirements
    .iter()
    .filter(|r| !r.version.is_empty())
    .map(|r| format!("{} {}", quote(&r.module_path), quote(&r.version)))
    .collect();
  lines.extend(manifest.dependencies.iter().map(dependency_line));
  write_require_block(&mut out, &lines);

  write_directives(&mut out, &manifest.directives);
  out
}

/// Go source importing each path, hidden behind the `tools` build tag.
pub fn render_references<'a>(import_paths: impl IntoIterator<Item = &'a str>) -> String {
  let mut seen = HashSet::new();
  let imports: Vec<&str> = import_paths.into_iter().filter(|p| seen.insert(*p)).collect();

  let mut out = format!("// Code generated by {APP_NAME}. DO NOT EDIT.\n\n//go:build tools\n\npackage tools\n");
  if imports.is_empty() {
    return out;
  }
  out.push_str("\nimport (\n");
  for path in imports {
    let _ = writeln!(out, "\t_ \"{path}\"");
  }
  out.push_str(")\n");
  out
}

/// Reference source for every tool declared in `manifest`.
pub fn tool_references(manifest: &Manifest) -> String {
  let paths: Vec<String> = manifest.tools().map(|t| t.import_path()).collect();
  render_references(paths.iter().map(String::as_str))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::types::ToolEntry;
  use crate::manifest::{parse_str, Dependency};

  fn sample() -> Manifest {
    let mut manifest = Manifest {
      go: Some("1.21".to_string()),
      ..Default::default()
    };
    manifest.insert_tool("host.example/toolkit", "v1.2.3", ToolEntry::new("/cmd/a"));
    manifest.insert_tool("host.example/toolkit", "v1.2.3", ToolEntry::renamed("/cmd/b", "b2"));
    manifest.insert_tool("github.com/ktr0731/evans", "v0.8.0", ToolEntry::renamed("/", "ev"));
    manifest.insert_tool("github.com/mitchellh/gox", "", ToolEntry::root());
    manifest.dependencies.push(Dependency {
      path: "golang.org/x/sys".to_string(),
      version: "v0.15.0".to_string(),
      indirect: true,
    });
    manifest
  }

  #[test]
  fn path_field_forms() {
    let manifest = sample();
    assert_eq!(
      format_path_field(&manifest.requirements[0]),
      "host.example/toolkit:/cmd/a,/cmd/b@b2"
    );
    assert_eq!(format_path_field(&manifest.requirements[1]), "github.com/ktr0731/evans@ev");
    assert_eq!(format_path_field(&manifest.requirements[2]), "github.com/mitchellh/gox");
  }

  #[test]
  fn root_is_written_first_in_lists() {
    let req = ModuleRequirement::new("m.example/x", "v1.0.0")
      .with_entry(ToolEntry::new("/cmd/y"))
      .with_entry(ToolEntry::root());
    assert_eq!(format_path_field(&req), "m.example/x:/,/cmd/y");
  }

  #[test]
  fn format_layout() {
    let text = format(&sample());
    assert_eq!(
      text,
      "module tools\n\ngo 1.21\n\nrequire (\n\thost.example/toolkit:/cmd/a,/cmd/b@b2 v1.2.3\n\tgithub.com/ktr0731/evans@ev v0.8.0\n\tgithub.com/mitchellh/gox\n)\n\nrequire (\n\tgolang.org/x/sys v0.15.0 // indirect\n)\n"
    );
  }

  #[test]
  fn format_is_idempotent() {
    let text = format(&sample());
    let reparsed = parse_str(&text).unwrap();
    assert_eq!(reparsed.manifest, sample_with_module());
    assert_eq!(format(&reparsed.manifest), text);
  }

  fn sample_with_module() -> Manifest {
    let mut manifest = sample();
    manifest.module = Some("tools".to_string());
    manifest
  }

  #[test]
  fn canonical_strips_extended_syntax() {
    let text = canonicalize(&sample());
    assert_eq!(
      text,
      "module tools\n\ngo 1.21\n\nrequire (\n\thost.example/toolkit v1.2.3\n\tgithub.com/ktr0731/evans v0.8.0\n\tgolang.org/x/sys v0.15.0 // indirect\n)\n"
    );
    let requires: Vec<&str> = text.lines().filter(|l| l.starts_with('\t')).collect();
    assert!(requires.iter().all(|l| !l.contains(':') && !l.contains('@')));
  }

  #[test]
  fn canonical_of_empty_manifest_has_default_module() {
    assert_eq!(canonicalize(&Manifest::default()), "module tools\n");
  }

  #[test]
  fn directives_round_trip() {
    let text = "module tools\n\nrequire (\n\tgithub.com/a/b v1.0.0\n)\n\nreplace github.com/a/b => \"../my dir\"\nexclude github.com/c/d v0.1.0\n";
    let parsed = parse_str(text).unwrap();
    assert_eq!(format(&parsed.manifest), text);
    assert!(parsed.canonical.ends_with("replace github.com/a/b => \"../my dir\"\nexclude github.com/c/d v0.1.0\n"));
  }

  #[test]
  fn references_import_every_tool() {
    let text = tool_references(&sample());
    assert_eq!(
      text,
      "// Code generated by toolmod. DO NOT EDIT.\n\n//go:build tools\n\npackage tools\n\nimport (\n\t_ \"host.example/toolkit/cmd/a\"\n\t_ \"host.example/toolkit/cmd/b\"\n\t_ \"github.com/ktr0731/evans\"\n\t_ \"github.com/mitchellh/gox\"\n)\n"
    );
  }

  #[test]
  fn references_without_tools_have_no_imports() {
    let text = tool_references(&Manifest::default());
    assert!(text.contains("package tools"));
    assert!(!text.contains("import"));
  }

  #[test]
  fn references_dedupe() {
    let text = render_references(["a.example/x", "a.example/x"]);
    assert_eq!(text.matches("a.example/x").count(), 1);
  }
}
