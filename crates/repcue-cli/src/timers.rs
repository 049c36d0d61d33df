//! Tokio-backed timer driver for the reminder watcher.

use std::collections::HashMap;
use std::time::Duration;

use repcue_core::clock::{TimerDriver, TimerHandle};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Sleeps one task per timer and sends the handle back when it elapses.
///
/// Must be used from within a tokio runtime.
pub struct TokioTimers {
    fired: UnboundedSender<TimerHandle>,
    next_handle: u64,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioTimers {
    pub fn new(fired: UnboundedSender<TimerHandle>) -> Self {
        Self {
            fired,
            next_handle: 0,
            tasks: HashMap::new(),
        }
    }
}

impl TimerDriver for TokioTimers {
    fn set_timer(&mut self, delay: Duration) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());
        self.next_handle += 1;
        let handle = TimerHandle::new(self.next_handle);
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(handle);
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn clear_timer(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn delivers_elapsed_handles() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TokioTimers::new(tx);
        let late = timers.set_timer(Duration::from_secs(60));
        let soon = timers.set_timer(Duration::from_secs(5));

        assert_eq!(rx.recv().await, Some(soon));
        assert_eq!(rx.recv().await, Some(late));
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TokioTimers::new(tx);
        let cleared = timers.set_timer(Duration::from_secs(5));
        let kept = timers.set_timer(Duration::from_secs(10));
        timers.clear_timer(cleared);

        assert_eq!(rx.recv().await, Some(kept));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());
    }
}
