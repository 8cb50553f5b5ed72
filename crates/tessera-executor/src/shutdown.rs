//! Run-once finalizer.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Action = Box<dyn FnOnce() + Send>;

/// A finalizer that runs at most once, however many clones call [`fire`].
///
/// [`fire`]: ShutdownHook::fire
#[derive(Clone, Default)]
pub struct ShutdownHook {
  action: Arc<Mutex<Option<Action>>>,
  fired: Arc<AtomicBool>,
}

impl ShutdownHook {
  pub fn new<F>(action: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Self {
      action: Arc::new(Mutex::new(Some(Box::new(action)))),
      fired: Arc::new(AtomicBool::new(false)),
    }
  }

  /// A hook with nothing to run.
  pub fn noop() -> Self {
    Self::default()
  }

  /// Run the action. Returns `true` only for the call that ran it.
  pub fn fire(&self) -> bool {
    if self.fired.swap(true, Ordering::SeqCst) {
      return false;
    }

    let action = self
      .action
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .take();
    if let Some(action) = action {
      action();
    }
    true
  }

  pub fn has_fired(&self) -> bool {
    self.fired.load(Ordering::SeqCst)
  }
}

impl fmt::Debug for ShutdownHook {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShutdownHook")
      .field("fired", &self.has_fired())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use super::*;

  #[test]
  fn test_fires_once_across_clones() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let hook = ShutdownHook::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });
    let other = hook.clone();

    assert!(hook.fire());
    assert!(!other.fire());
    assert!(!hook.fire());
    assert!(other.has_fired());
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_noop_hook() {
    let hook = ShutdownHook::noop();
    assert!(!hook.has_fired());
    assert!(hook.fire());
    assert!(hook.has_fired());
  }

  #[test]
  fn test_concurrent_fire() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let hook = ShutdownHook::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });

    let threads: Vec<_> = (0..8)
      .map(|_| {
        let hook = hook.clone();
        std::thread::spawn(move || hook.fire())
      })
      .collect();
    let winners = threads
      .into_iter()
      .map(|t| t.join().unwrap())
      .filter(|ran| *ran)
      .count();

    assert_eq!(winners, 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}
