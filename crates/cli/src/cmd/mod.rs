mod build;
mod clean;
mod exec;
mod get;
mod init;
mod list;
mod remove;

use std::future::Future;

use anyhow::{Context, Result};
use tracing::warn;

use toolmod_lib::execute::Cancellation;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use exec::cmd_exec;
pub use get::cmd_get;
pub use init::cmd_init;
pub use list::cmd_list;
pub use remove::cmd_remove;

/// Drive one library operation on a fresh runtime.
///
/// Ctrl-C cancels the token handed to `op`; the operation then unwinds
/// through its own cleanup and returns a cancellation error.
fn block_on<T, F, Fut>(op: F) -> Result<T>
where
  F: FnOnce(Cancellation) -> Fut,
  Fut: Future<Output = Result<T, toolmod_lib::Error>>,
{
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async move {
    let cancel = Cancellation::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupted, cancelling");
        watcher.cancel();
      }
    });
    Ok(op(cancel).await?)
  })
}
