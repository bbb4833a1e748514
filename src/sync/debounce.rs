use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cancellable scheduled task. `schedule` replaces any pending task, so the
/// wrapped work runs only after a full quiet period with no re-scheduling.
pub struct Debouncer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        let mut pending = self.pending.lock().expect("debounce lock");
        if let Some(old) = pending.replace(handle) {
            old.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(old) = self.pending.lock().expect("debounce lock").take() {
            old.abort();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
