//! Types for orchestrated execution.

use thiserror::Error;

use crate::error::Error;

/// Errors from orchestrated task execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A task failed. Carries the tool it was working on.
  #[error("{tool}: {source}")]
  Task { tool: String, source: Box<Error> },

  /// The task panicked or was aborted.
  #[error("task for {tool} did not complete: {message}")]
  Panicked { tool: String, message: String },

  /// The caller cancelled the run.
  #[error("cancelled")]
  Cancelled,
}

impl ExecuteError {
  pub fn is_cancelled(&self) -> bool {
    match self {
      ExecuteError::Cancelled => true,
      ExecuteError::Task { source, .. } => source.is_cancelled(),
      ExecuteError::Panicked { .. } => false,
    }
  }

  /// Tool identity of a failed task.
  pub fn tool(&self) -> Option<&str> {
    match self {
      ExecuteError::Task { tool, .. } | ExecuteError::Panicked { tool, .. } => Some(tool),
      ExecuteError::Cancelled => None,
    }
  }
}

/// Tuning for an [`Orchestrator`](super::Orchestrator).
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of tasks running at once.
  pub parallelism: usize,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
    }
  }
}
