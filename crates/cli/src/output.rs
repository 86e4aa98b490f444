//! Terminal output for toolmod commands.
//!
//! Status lines go through [`Status`]: success and info to stdout, warnings
//! and errors to stderr so `--output json` stays parseable.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{AnsiColors, OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const PLUS: &str = "+";
  pub const MINUS: &str = "-";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
  Success,
  Info,
  Hint,
  Warning,
  Error,
  Added,
  Removed,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Success => symbols::SUCCESS,
      Status::Info | Status::Hint => symbols::INFO,
      Status::Warning => symbols::WARNING,
      Status::Error => symbols::ERROR,
      Status::Added => symbols::PLUS,
      Status::Removed => symbols::MINUS,
    }
  }

  fn color(self) -> AnsiColors {
    match self {
      Status::Success | Status::Added => AnsiColors::Green,
      Status::Info | Status::Hint => AnsiColors::Blue,
      Status::Warning => AnsiColors::Yellow,
      Status::Error | Status::Removed => AnsiColors::Red,
    }
  }

  fn stream(self) -> Stream {
    match self {
      Status::Hint | Status::Warning | Status::Error => Stream::Stderr,
      _ => Stream::Stdout,
    }
  }

  /// Whether the message text is colored too, not just the symbol.
  fn tints_message(self) -> bool {
    matches!(self, Status::Warning | Status::Error)
  }

  fn indent(self) -> &'static str {
    match self {
      Status::Added | Status::Removed => "  ",
      _ => "",
    }
  }
}

fn emit(status: Status, message: &str) {
  let stream = status.stream();
  let color = status.color();
  let symbol_text = status.symbol();
  let symbol = symbol_text.if_supports_color(stream, |s| s.color(color));
  let line = if status.tints_message() {
    format!(
      "{}{} {}",
      status.indent(),
      symbol,
      message.if_supports_color(stream, |s| s.color(color))
    )
  } else {
    format!("{}{} {}", status.indent(), symbol, message)
  };
  match stream {
    Stream::Stderr => eprintln!("{line}"),
    _ => println!("{line}"),
  }
}

pub fn print_success(message: &str) {
  emit(Status::Success, message);
}

pub fn print_error(message: &str) {
  emit(Status::Error, message);
}

pub fn print_warning(message: &str) {
  emit(Status::Warning, message);
}

pub fn print_info(message: &str) {
  emit(Status::Info, message);
}

/// Follow-up advice after an error.
pub fn print_hint(message: &str) {
  emit(Status::Hint, message);
}

/// A `+`/`-` line for a tool added to or removed from the manifest.
pub fn print_change(added: bool, message: &str) {
  emit(if added { Status::Added } else { Status::Removed }, message);
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}

/// Leading characters of a sha256, enough to tell binaries apart.
pub fn truncate_hash(hash: &str) -> &str {
  hash.get(..12).unwrap_or(hash)
}

pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];
  if bytes < 1024 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit + 1 < UNITS.len() {
    value /= 1024.0;
    unit += 1;
  }
  format!("{value:.1} {}", UNITS[unit])
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  match secs {
    60.. => format!("{}m {}s", secs / 60, secs % 60),
    1.. => format!("{}.{:02}s", secs, duration.subsec_millis() / 10),
    0 => format!("{}ms", duration.subsec_millis()),
  }
}
