//! Change notification for whoever renders the manager's state.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::warn;

/// Receives a signal after every state change. Implementations re-read
/// whatever they need from the manager; no state is pushed.
pub trait StateObserver: Send + Sync {
    fn state_changed(&self);
}

impl<F> StateObserver for F
where
    F: Fn() + Send + Sync,
{
    fn state_changed(&self) {
        self()
    }
}

/// Notify every observer independently.
///
/// Inside a tokio runtime each observer runs on its own task, so a slow or
/// panicking observer neither blocks the caller nor stops the others.
/// Without a runtime observers run inline with panics caught.
pub(crate) fn dispatch(observers: &[Arc<dyn StateObserver>]) {
    let handle = tokio::runtime::Handle::try_current().ok();

    for observer in observers {
        let observer = Arc::clone(observer);
        match &handle {
            Some(handle) => {
                handle.spawn(async move {
                    if catch_unwind(AssertUnwindSafe(|| observer.state_changed())).is_err() {
                        warn!("state observer panicked");
                    }
                });
            }
            None => {
                if catch_unwind(AssertUnwindSafe(|| observer.state_changed())).is_err() {
                    warn!("state observer panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn failing_observer() {
        panic!("observer failure");
    }

    #[test]
    fn test_panicking_observer_does_not_stop_others() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let observers: Vec<Arc<dyn StateObserver>> = vec![
            Arc::new(failing_observer),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ];

        dispatch(&observers);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
