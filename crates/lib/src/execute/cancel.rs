//! Hierarchical cancellation.
//!
//! A [`Cancellation`] can be checked synchronously or awaited. Children
//! derived with [`Cancellation::child`] are cancelled together with their
//! parent, while cancelling a child leaves the parent untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
  cancelled: AtomicBool,
  notify: Notify,
  children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
  fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::SeqCst) {
      return;
    }
    self.notify.notify_waiters();
    let children = match self.children.lock() {
      Ok(mut guard) => std::mem::take(&mut *guard),
      Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };
    for child in children.iter().filter_map(Weak::upgrade) {
      child.cancel();
    }
  }
}

/// Cancellation token shared between tasks.
#[derive(Clone, Default)]
pub struct Cancellation {
  inner: Arc<Inner>,
}

impl std::fmt::Debug for Cancellation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Cancellation")
      .field("cancelled", &self.is_cancelled())
      .finish()
  }
}

impl Cancellation {
  pub fn new() -> Self {
    Self::default()
  }

  /// Signal cancellation to this token and every descendant.
  pub fn cancel(&self) {
    self.inner.cancel();
  }

  pub fn is_cancelled(&self) -> bool {
    self.inner.cancelled.load(Ordering::SeqCst)
  }

  /// Derive a token cancelled whenever `self` is.
  pub fn child(&self) -> Cancellation {
    let child = Cancellation::new();
    {
      let mut children = match self.inner.children.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
      };
      // Checked under the lock so a concurrent cancel cannot miss this child.
      if !self.is_cancelled() {
        children.retain(|w| w.strong_count() > 0);
        children.push(Arc::downgrade(&child.inner));
        return child;
      }
    }
    child.cancel();
    child
  }

  /// Resolve once the token is cancelled.
  pub async fn cancelled(&self) {
    loop {
      let notified = self.inner.notify.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();
      if self.is_cancelled() {
        return;
      }
      notified.await;
    }
  }
}
