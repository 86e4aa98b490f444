//! Parallel per-tool execution.
//!
//! An [`Orchestrator`] runs one task per tool under a shared
//! [`Cancellation`]. The first failing task cancels the token so its siblings
//! stop early, and [`Orchestrator::wait`] reports that failure tagged with the
//! tool it belonged to.

pub mod cancel;
mod types;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::Error;

pub use cancel::Cancellation;
pub use types::{ExecuteConfig, ExecuteError};

type TaskOutput<T> = (usize, String, Result<T, Error>);

/// Fans out independent tool tasks.
pub struct Orchestrator<T> {
  parent: Cancellation,
  token: Cancellation,
  semaphore: Arc<Semaphore>,
  tasks: JoinSet<TaskOutput<T>>,
  names: HashMap<tokio::task::Id, String>,
  next_index: usize,
}

impl<T: Send + 'static> Orchestrator<T> {
  /// Create an orchestrator whose token is a child of `parent`.
  pub fn new(parent: &Cancellation, config: &ExecuteConfig) -> Self {
    Self {
      parent: parent.clone(),
      token: parent.child(),
      semaphore: Arc::new(Semaphore::new(config.parallelism.max(1))),
      tasks: JoinSet::new(),
      names: HashMap::new(),
      next_index: 0,
    }
  }

  /// Token shared by every task.
  pub fn token(&self) -> &Cancellation {
    &self.token
  }

  /// Spawn a task for `tool`. `f` receives the shared token.
  pub fn spawn<F, Fut>(&mut self, tool: impl Into<String>, f: F)
  where
    F: FnOnce(Cancellation) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
  {
    let tool = tool.into();
    let index = self.next_index;
    self.next_index += 1;

    let token = self.token.clone();
    let semaphore = self.semaphore.clone();
    let task_tool = tool.clone();

    let handle = self.tasks.spawn(async move {
      let permit = tokio::select! {
        permit = semaphore.acquire_owned() => permit,
        _ = token.cancelled() => {
          return (index, task_tool, Err(Error::Execute(ExecuteError::Cancelled)));
        }
      };
      let Ok(_permit) = permit else {
        return (index, task_tool, Err(Error::Execute(ExecuteError::Cancelled)));
      };
      debug!(tool = %task_tool, "task started");
      let result = f(token).await;
      (index, task_tool, result)
    });
    self.names.insert(handle.id(), tool);
  }

  /// Wait for every task.
  ///
  /// Returns successful results in spawn order. A cancelled parent takes
  /// priority over task failures.
  pub async fn wait(mut self) -> Result<Vec<(String, T)>, ExecuteError> {
    let mut first: Option<ExecuteError> = None;
    let mut results = Vec::new();

    while let Some(joined) = self.tasks.join_next().await {
      let failure = match joined {
        Ok((index, tool, Ok(value))) => {
          results.push((index, tool, value));
          continue;
        }
        Ok((_, tool, Err(e))) => ExecuteError::Task {
          tool,
          source: Box::new(e),
        },
        Err(e) => {
          let tool = self.names.get(&e.id()).cloned().unwrap_or_default();
          error!(tool = %tool, error = %e, "task panicked");
          ExecuteError::Panicked {
            tool,
            message: e.to_string(),
          }
        }
      };

      if first.is_none() {
        debug!(tool = ?failure.tool(), "task failed, cancelling siblings");
        self.token.cancel();
        first = Some(failure);
      }
    }

    if self.parent.is_cancelled() {
      return Err(ExecuteError::Cancelled);
    }
    if let Some(err) = first {
      return Err(err);
    }

    results.sort_by_key(|(index, _, _)| *index);
    Ok(results.into_iter().map(|(_, tool, value)| (tool, value)).collect())
  }
}
