//! Folding resolver output back into the extended manifest.

use std::collections::HashMap;

use tracing::warn;

use super::ManifestError;
use super::parse::parse_document;
use super::types::{Dependency, Manifest, ModuleRequirement};

/// Result of [`merge`].
#[derive(Debug, Clone)]
pub struct Merged {
  pub manifest: Manifest,
  /// Tool requirements the resolver no longer lists.
  pub dropped: Vec<ModuleRequirement>,
}

/// Combine the resolver's plain manifest with the tool metadata of `manifest`.
///
/// The resolver is authoritative for the module and go directives, every
/// version, and all other directives. Declared requirements keep their
/// entrypoints and order. Modules the resolver added are recorded as indirect
/// dependencies, since only tool modules are imported directly.
pub fn merge(resolver_text: &str, manifest: &Manifest) -> Result<Merged, ManifestError> {
  let doc = parse_document(resolver_text)?;

  let mut versions: HashMap<&str, &str> = HashMap::with_capacity(doc.requires.len());
  for raw in &doc.requires {
    if raw.path_field.contains(':') || raw.path_field.contains('@') {
      return Err(ManifestError::Format {
        line: raw.line,
        message: format!("unexpected extended syntax in resolver output: {}", raw.path_field),
      });
    }
    let Some(version) = raw.version.as_deref() else {
      return Err(ManifestError::Format {
        line: raw.line,
        message: format!("resolver requirement {} has no version", raw.path_field),
      });
    };
    versions.insert(raw.path_field.as_str(), version);
  }

  let mut merged = Manifest {
    module: doc.module.clone(),
    go: doc.go.clone(),
    directives: doc.directives.clone(),
    ..Default::default()
  };
  let mut dropped = Vec::new();

  for req in &manifest.requirements {
    match versions.get(req.module_path.as_str()) {
      Some(version) => merged.requirements.push(ModuleRequirement {
        module_path: req.module_path.clone(),
        version: version.to_string(),
        entrypoints: req.entrypoints.clone(),
      }),
      None => {
        warn!(module = %req.module_path, "resolver dropped tool requirement");
        dropped.push(req.clone());
      }
    }
  }

  for raw in &doc.requires {
    if manifest.requirement(&raw.path_field).is_some() {
      continue;
    }
    merged.dependencies.push(Dependency {
      path: raw.path_field.clone(),
      version: raw.version.clone().unwrap_or_default(),
      indirect: true,
    });
  }

  Ok(Merged {
    manifest: merged,
    dropped,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::types::ToolEntry;
  use crate::manifest::{canonicalize, format, parse_str};
  use tracing_test::traced_test;

  fn declared() -> Manifest {
    parse_str("module tools\n\nrequire (\n\thost.example/toolkit:/cmd/a,/cmd/b@b2 v1.0.0\n\tgithub.com/ktr0731/evans@ev\n)\n")
      .unwrap()
      .manifest
  }

  #[test]
  fn resolver_versions_win_and_metadata_survives() {
    let resolver = "module tools\n\ngo 1.21\n\nrequire (\n\tgithub.com/ktr0731/evans v0.8.0\n\thost.example/toolkit v1.1.0\n\tgolang.org/x/sys v0.15.0 // indirect\n)\n";
    let merged = merge(resolver, &declared()).unwrap();

    assert!(merged.dropped.is_empty());
    let m = &merged.manifest;
    assert_eq!(m.go.as_deref(), Some("1.21"));
    assert_eq!(m.requirements[0].module_path, "host.example/toolkit");
    assert_eq!(m.requirements[0].version, "v1.1.0");
    assert_eq!(m.requirements[0].entry("/cmd/b"), Some(&ToolEntry::renamed("/cmd/b", "b2")));
    assert_eq!(m.requirements[1].version, "v0.8.0");
    assert_eq!(m.requirements[1].entrypoints, vec![ToolEntry::renamed("/", "ev")]);
    assert_eq!(m.dependencies.len(), 1);
    assert_eq!(m.dependencies[0].path, "golang.org/x/sys");
  }

  #[test]
  #[traced_test]
  fn missing_requirement_is_dropped_and_logged() {
    let resolver = "module tools\n\nrequire host.example/toolkit v1.0.0\n";
    let merged = merge(resolver, &declared()).unwrap();

    assert_eq!(merged.manifest.requirements.len(), 1);
    assert_eq!(merged.dropped.len(), 1);
    assert_eq!(merged.dropped[0].module_path, "github.com/ktr0731/evans");
    assert!(logs_contain("resolver dropped tool requirement"));
  }

  #[test]
  fn unknown_direct_requirement_becomes_indirect_dependency() {
    let resolver = "module tools\n\nrequire (\n\thost.example/toolkit v1.0.0\n\tgithub.com/ktr0731/evans v0.8.0\n\tgithub.com/other/lib v1.0.0\n)\n";
    let merged = merge(resolver, &declared()).unwrap();
    let text = format(&merged.manifest);
    let reparsed = parse_str(&text).unwrap().manifest;
    assert_eq!(reparsed, merged.manifest);
  }

  #[test]
  fn repeated_cycles_are_stable() {
    let resolver = "module tools\n\ngo 1.21\n\nrequire (\n\thost.example/toolkit v1.1.0\n\tgithub.com/ktr0731/evans v0.8.0\n\tgolang.org/x/sys v0.15.0 // indirect\n)\n\nreplace golang.org/x/sys => ../sys\n";
    let first = format(&merge(resolver, &declared()).unwrap().manifest);

    let parsed = parse_str(&first).unwrap();
    let second = format(&merge(&parsed.canonical, &parsed.manifest).unwrap().manifest);
    assert_eq!(first, second);
    assert_eq!(canonicalize(&parsed.manifest), parsed.canonical);
  }

  #[test]
  fn extended_syntax_in_resolver_output_is_rejected() {
    let err = merge("module tools\nrequire a.example/b@x v1\n", &declared()).unwrap_err();
    assert!(matches!(err, ManifestError::Format { line: 2, .. }));
  }
}
