//! Stop detection for blocking moves.
//!
//! A [`StopSignal`] is a one-shot latch armed just before a positioner is
//! commanded and set when that positioner reports `DeviceStopped`. The
//! [`StopTracker`] keeps the most recent signal per positioner name.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One-shot stop latch.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    /// New, unset signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latch and wake every waiter.
    pub fn set(&self) {
        *self.stopped.lock() = true;
        self.cond.notify_all();
    }

    /// Whether the latch is set.
    pub fn is_set(&self) -> bool {
        *self.stopped.lock()
    }

    /// Block until set or until `timeout` elapses. Returns whether it was set.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.cond.wait_while_for(&mut stopped, |s| !*s, timeout);
        }
        *stopped
    }
}

/// Latest stop signal per positioner name.
#[derive(Debug, Default)]
pub struct StopTracker {
    signals: Mutex<HashMap<String, Arc<StopSignal>>>,
}

impl StopTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh, unset signal for `name`, replacing any earlier one.
    pub fn arm(&self, name: &str) -> Arc<StopSignal> {
        let signal = Arc::new(StopSignal::new());
        self.signals
            .lock()
            .insert(name.to_string(), Arc::clone(&signal));
        signal
    }

    /// Forget the signal of `name`.
    pub fn disarm(&self, name: &str) {
        self.signals.lock().remove(name);
    }

    /// Set the signal of `name`. Returns `false` if none was armed.
    pub fn notify_stopped(&self, name: &str) -> bool {
        let signal = self.signals.lock().get(name).cloned();
        match signal {
            Some(signal) => {
                signal.set();
                true
            }
            None => false,
        }
    }

    /// Every signal ever armed, ordered by name.
    pub fn snapshot(&self) -> Vec<(String, Arc<StopSignal>)> {
        let mut all: Vec<_> = self
            .signals
            .lock()
            .iter()
            .map(|(name, signal)| (name.clone(), Arc::clone(signal)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_signal_set_before_wait() {
        let signal = StopSignal::new();
        signal.set();
        assert!(signal.wait(Duration::from_millis(1)));
    }

    #[test]
    fn test_signal_times_out() {
        let signal = StopSignal::new();
        assert!(!signal.wait(Duration::from_millis(10)));
        assert!(!signal.is_set());
    }

    #[test]
    fn test_signal_set_from_other_thread() {
        let signal = Arc::new(StopSignal::new());
        let setter = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set();
        });
        assert!(signal.wait(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_arm_replaces_previous() {
        let tracker = StopTracker::new();
        let first = tracker.arm("piezo");
        let second = tracker.arm("piezo");
        assert!(tracker.notify_stopped("piezo"));
        assert!(second.is_set());
        assert!(!first.is_set());
        assert_eq!(tracker.snapshot().len(), 1);
    }

    #[test]
    fn test_notify_unknown() {
        let tracker = StopTracker::new();
        assert!(!tracker.notify_stopped("nobody"));
        tracker.arm("x");
        tracker.disarm("x");
        assert!(tracker.snapshot().is_empty());
    }
}
