use parking_lot::{Condvar, Mutex};

/// Fork-join barrier: a counter of outstanding tasks that callers can block on.
///
/// The counter is raised once per dispatched task (or set up front with
/// [`CompletionLatch::new`]) and lowered by each task when it finishes. Waiters
/// park on a condition variable instead of spinning.
#[derive(Debug, Default)]
pub struct CompletionLatch {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    /// Register `n` more outstanding tasks.
    pub fn add(&self, n: usize) {
        *self.remaining.lock() += n;
    }

    /// Mark one task as finished, waking waiters when the count hits zero.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        debug_assert!(*remaining > 0, "latch counted below zero");
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.released.notify_all();
        }
    }

    /// Block until every registered task has counted down.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.released.wait(&mut remaining);
        }
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_latch_does_not_block() {
        let latch = CompletionLatch::new(0);
        latch.wait();
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn test_wait_releases_after_all_count_down() {
        let latch = Arc::new(CompletionLatch::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || latch.count_down())
            })
            .collect();
        latch.wait();
        assert_eq!(latch.remaining(), 0);
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_add_extends_count() {
        let latch = CompletionLatch::new(1);
        latch.add(2);
        assert_eq!(latch.remaining(), 3);
        latch.count_down();
        latch.count_down();
        latch.count_down();
        latch.wait();
    }
}
