//! Lexing and parsing of go.mod-syntax text.
//!
//! The same document parser reads both the extended manifest and the plain
//! manifest the resolver writes; only the interpretation of `require` path
//! fields differs.

use std::collections::HashSet;

use super::ManifestError;
use super::types::{Dependency, Directive, Manifest, ModuleRequirement, ROOT_SUB_PATH, ToolEntry};

const KNOWN_DIRECTIVES: &[&str] = &[
  "module", "go", "toolchain", "godebug", "require", "exclude", "replace", "retract", "tool", "ignore",
];

/// One `require` line before path-field interpretation.
#[derive(Debug, Clone)]
pub(crate) struct RawRequire {
  pub line: usize,
  pub path_field: String,
  pub version: Option<String>,
  pub indirect: bool,
}

/// Directive-level view of a go.mod file.
#[derive(Debug, Default)]
pub(crate) struct Document {
  pub module: Option<String>,
  pub go: Option<String>,
  pub requires: Vec<RawRequire>,
  pub directives: Vec<Directive>,
}

struct Line {
  tokens: Vec<String>,
  comment: Option<String>,
}

fn format_err(line: usize, message: impl Into<String>) -> ManifestError {
  ManifestError::Format {
    line,
    message: message.into(),
  }
}

fn lex_line(raw: &str, number: usize) -> Result<Line, ManifestError> {
  let mut tokens = Vec::new();
  let mut comment = None;
  let mut chars = raw.char_indices().peekable();

  while let Some(&(idx, c)) = chars.peek() {
    match c {
      c if c.is_whitespace() => {
        chars.next();
      }
      '/' if raw[idx..].starts_with("//") => {
        comment = Some(raw[idx + 2..].trim().to_string());
        break;
      }
      '(' | ')' => {
        chars.next();
        tokens.push(c.to_string());
      }
      '"' => {
        chars.next();
        let mut token = String::new();
        let mut closed = false;
        while let Some((_, c)) = chars.next() {
          match c {
            '"' => {
              closed = true;
              break;
            }
            '\\' => match chars.next() {
              Some((_, 'n')) => token.push('\n'),
              Some((_, 't')) => token.push('\t'),
              Some((_, escaped)) => token.push(escaped),
              None => break,
            },
            c => token.push(c),
          }
        }
        if !closed {
          return Err(format_err(number, "unterminated quoted string"));
        }
        tokens.push(token);
      }
      '`' => {
        chars.next();
        let rest = &raw[idx + 1..];
        let Some(end) = rest.find('`') else {
          return Err(format_err(number, "unterminated raw string"));
        };
        tokens.push(rest[..end].to_string());
        // Skip past the closing backtick.
        while let Some(&(pos, _)) = chars.peek() {
          if pos > idx + end + 1 {
            break;
          }
          chars.next();
        }
      }
      _ => {
        let start = idx;
        let mut end = raw.len();
        while let Some(&(pos, c)) = chars.peek() {
          if c.is_whitespace() || c == '(' || c == ')' || c == '"' || raw[pos..].starts_with("//") {
            end = pos;
            break;
          }
          chars.next();
        }
        tokens.push(raw[start..end].to_string());
      }
    }
  }

  Ok(Line { tokens, comment })
}

fn is_indirect(comment: Option<&str>) -> bool {
  match comment {
    Some(c) => c == "indirect" || c.starts_with("indirect;"),
    None => false,
  }
}

impl Document {
  fn apply(&mut self, keyword: &str, args: Vec<String>, comment: Option<&str>, line: usize) -> Result<(), ManifestError> {
    if args.is_empty() {
      return Err(format_err(line, format!("missing arguments for {keyword}")));
    }
    match keyword {
      "module" => {
        if self.module.is_some() {
          return Err(format_err(line, "repeated module directive"));
        }
        if args.len() != 1 {
          return Err(format_err(line, "module directive takes one argument"));
        }
        self.module = args.into_iter().next();
      }
      "go" => {
        if self.go.is_some() {
          return Err(format_err(line, "repeated go directive"));
        }
        if args.len() != 1 {
          return Err(format_err(line, "go directive takes one argument"));
        }
        self.go = args.into_iter().next();
      }
      "require" => {
        if args.len() > 2 {
          return Err(format_err(line, "require takes a path and an optional version"));
        }
        let mut args = args.into_iter();
        let path_field = args.next().unwrap_or_default();
        self.requires.push(RawRequire {
          line,
          path_field,
          version: args.next(),
          indirect: is_indirect(comment),
        });
      }
      other => {
        if !KNOWN_DIRECTIVES.contains(&other) {
          return Err(format_err(line, format!("unknown directive: {other}")));
        }
        self.directives.push(Directive {
          keyword: other.to_string(),
          args,
        });
      }
    }
    Ok(())
  }
}

/// Parse go.mod-syntax text into directives.
pub(crate) fn parse_document(text: &str) -> Result<Document, ManifestError> {
  let mut doc = Document::default();
  let mut block: Option<(String, usize)> = None;

  for (idx, raw) in text.lines().enumerate() {
    let number = idx + 1;
    let Line { mut tokens, comment } = lex_line(raw, number)?;
    if tokens.is_empty() {
      continue;
    }

    if let Some((keyword, _)) = &block {
      if tokens.len() == 1 && tokens[0] == ")" {
        block = None;
        continue;
      }
      if tokens.iter().any(|t| t == "(" || t == ")") {
        return Err(format_err(number, "unexpected parenthesis inside block"));
      }
      let keyword = keyword.clone();
      doc.apply(&keyword, tokens, comment.as_deref(), number)?;
      continue;
    }

    let keyword = tokens.remove(0);
    if keyword == "(" || keyword == ")" {
      return Err(format_err(number, "unexpected parenthesis"));
    }
    match tokens.as_slice() {
      [open] if open == "(" => {
        if keyword == "module" || keyword == "go" {
          return Err(format_err(number, format!("{keyword} directive cannot open a block")));
        }
        block = Some((keyword, number));
      }
      [open, close] if open == "(" && close == ")" => {}
      _ => doc.apply(&keyword, tokens, comment.as_deref(), number)?,
    }
  }

  if let Some((keyword, start)) = block {
    return Err(format_err(start, format!("unterminated {keyword} block")));
  }
  Ok(doc)
}

fn is_path_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '/' | '+')
}

/// Whether `name` can follow `@` in a path field and read back unchanged.
pub fn is_valid_output_name(name: &str) -> bool {
  !name.is_empty()
    && name
      .chars()
      .all(|c| !c.is_whitespace() && !c.is_control() && !matches!(c, ',' | ':' | '@' | '/' | '\\' | '"' | '`'))
}

fn validate_module_path(path: &str, line: usize) -> Result<(), ManifestError> {
  if path.is_empty() {
    return Err(format_err(line, "empty module path"));
  }
  if let Some(c) = path.chars().find(|&c| !is_path_char(c)) {
    return Err(format_err(line, format!("invalid character {c:?} in module path {path}")));
  }
  if path.starts_with('/') || path.ends_with('/') || path.contains("//") {
    return Err(format_err(line, format!("malformed module path {path}")));
  }
  Ok(())
}

fn validate_sub_path(sub: &str, line: usize) -> Result<(), ManifestError> {
  if !sub.starts_with('/') {
    return Err(format_err(line, format!("entrypoint {sub} must start with '/'")));
  }
  if sub == ROOT_SUB_PATH {
    return Ok(());
  }
  if let Some(c) = sub.chars().find(|&c| !is_path_char(c)) {
    return Err(format_err(line, format!("invalid character {c:?} in entrypoint {sub}")));
  }
  if sub.ends_with('/') || sub.contains("//") {
    return Err(format_err(line, format!("malformed entrypoint {sub}")));
  }
  Ok(())
}

/// Split an optional `@name` suffix.
fn split_rename(item: &str, line: usize) -> Result<(&str, Option<String>), ManifestError> {
  match item.split_once('@') {
    Some((_, "")) => Err(format_err(line, format!("empty output name in {item}"))),
    Some((_, name)) if !is_valid_output_name(name) => {
      Err(format_err(line, format!("invalid output name in {item}")))
    }
    Some((head, name)) => Ok((head, Some(name.to_string()))),
    None => Ok((item, None)),
  }
}

/// Interpret an extended path field into a module path and its entrypoints.
pub(crate) fn parse_path_field(field: &str, line: usize) -> Result<(String, Vec<ToolEntry>), ManifestError> {
  let Some((module, list)) = field.split_once(':') else {
    let (module, name) = split_rename(field, line)?;
    validate_module_path(module, line)?;
    let entry = ToolEntry {
      sub_path: ROOT_SUB_PATH.to_string(),
      output_name: name,
    };
    return Ok((module.to_string(), vec![entry]));
  };

  validate_module_path(module, line)?;
  if list.is_empty() {
    return Err(format_err(line, format!("empty entrypoint list for {module}")));
  }

  let mut seen = HashSet::new();
  let mut entries = Vec::new();
  for item in list.split(',') {
    if item.is_empty() {
      return Err(format_err(line, format!("empty entrypoint in {field}")));
    }
    let (sub, name) = split_rename(item, line)?;
    validate_sub_path(sub, line)?;
    if !seen.insert(sub.to_string()) {
      return Err(format_err(line, format!("duplicate entrypoint {sub} for {module}")));
    }
    entries.push(ToolEntry {
      sub_path: sub.to_string(),
      output_name: name,
    });
  }
  Ok((module.to_string(), entries))
}

/// Build a [`Manifest`] from extended manifest text.
pub(crate) fn parse_manifest(text: &str) -> Result<Manifest, ManifestError> {
  let doc = parse_document(text)?;
  let mut manifest = Manifest {
    module: doc.module,
    go: doc.go,
    directives: doc.directives,
    ..Default::default()
  };

  let mut modules = HashSet::new();
  for raw in doc.requires {
    if raw.indirect {
      if raw.path_field.contains(':') || raw.path_field.contains('@') {
        return Err(format_err(raw.line, "extended syntax on an indirect requirement"));
      }
      validate_module_path(&raw.path_field, raw.line)?;
      let Some(version) = raw.version else {
        return Err(format_err(raw.line, "indirect requirement without a version"));
      };
      if !modules.insert(raw.path_field.clone()) {
        return Err(format_err(raw.line, format!("duplicate module {}", raw.path_field)));
      }
      manifest.dependencies.push(Dependency {
        path: raw.path_field,
        version,
        indirect: true,
      });
      continue;
    }

    let (module_path, entrypoints) = parse_path_field(&raw.path_field, raw.line)?;
    if !modules.insert(module_path.clone()) {
      return Err(format_err(raw.line, format!("duplicate module {module_path}")));
    }
    manifest.requirements.push(ModuleRequirement {
      module_path,
      version: raw.version.unwrap_or_default(),
      entrypoints,
    });
  }

  Ok(manifest)
}
