//! Two-phase index lifecycle.
//!
//! An index starts in the Building phase, where a mutable builder accepts
//! records. Sealing consumes the builder exactly once, under the write lock,
//! and publishes an immutable serving view behind an `Arc`. Searches clone the
//! `Arc` and release the lock before scanning, so queries never hold the gate.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{IndexError, Result};

enum Phase<B, S> {
    Building(B),
    Serving(Arc<S>),
}

pub(crate) struct Lifecycle<B, S> {
    phase: RwLock<Phase<B, S>>,
}

impl<B, S> Lifecycle<B, S> {
    pub(crate) fn new(builder: B) -> Self {
        Self {
            phase: RwLock::new(Phase::Building(builder)),
        }
    }

    /// Run `f` against the builder, or fail with [`IndexError::Sealed`].
    pub(crate) fn mutate<T>(&self, f: impl FnOnce(&mut B) -> Result<T>) -> Result<T> {
        match &mut *self.phase.write() {
            Phase::Building(builder) => f(builder),
            Phase::Serving(_) => Err(IndexError::Sealed),
        }
    }

    /// The serving view, if the index has been sealed.
    pub(crate) fn serving(&self) -> Option<Arc<S>> {
        match &*self.phase.read() {
            Phase::Serving(view) => Some(Arc::clone(view)),
            Phase::Building(_) => None,
        }
    }

    pub(crate) fn is_serving(&self) -> bool {
        matches!(&*self.phase.read(), Phase::Serving(_))
    }

    /// Transition to Serving. `finish` runs at most once per lifecycle; later
    /// and concurrent callers receive the view it produced.
    ///
    /// `finish` only borrows the builder. The phase changes after it returns,
    /// so a panicking `finish` leaves the index Building with its records.
    pub(crate) fn seal(&self, finish: impl FnOnce(&mut B) -> S) -> Arc<S> {
        if let Some(view) = self.serving() {
            return view;
        }

        let mut phase = self.phase.write();
        let view = match &mut *phase {
            Phase::Serving(view) => return Arc::clone(view),
            Phase::Building(builder) => Arc::new(finish(builder)),
        };
        *phase = Phase::Serving(Arc::clone(&view));
        view
    }

    /// Read a value from whichever phase is current.
    pub(crate) fn inspect<T>(
        &self,
        building: impl FnOnce(&B) -> T,
        serving: impl FnOnce(&S) -> T,
    ) -> T {
        match &*self.phase.read() {
            Phase::Building(builder) => building(builder),
            Phase::Serving(view) => serving(view),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_mutate_then_seal() {
        let gate: Lifecycle<Vec<u32>, u32> = Lifecycle::new(Vec::new());
        gate.mutate(|b| {
            b.push(3);
            b.push(4);
            Ok(())
        })
        .unwrap();
        assert!(!gate.is_serving());
        assert_eq!(gate.inspect(|b| b.len() as u32, |s| *s), 2);

        let view = gate.seal(|b| b.iter().sum());
        assert_eq!(*view, 7);
        assert!(gate.is_serving());
        assert_eq!(gate.inspect(|b| b.len() as u32, |s| *s), 7);
    }

    #[test]
    fn test_mutate_after_seal_is_rejected() {
        let gate: Lifecycle<Vec<u32>, usize> = Lifecycle::new(Vec::new());
        gate.seal(|b| b.len());
        let err = gate.mutate(|b| {
            b.push(1);
            Ok(())
        });
        assert!(matches!(err, Err(IndexError::Sealed)));
    }

    #[test]
    fn test_panicking_seal_keeps_builder() {
        let gate: Lifecycle<Vec<u32>, usize> = Lifecycle::new(vec![1, 2, 3]);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            gate.seal(|_| panic!("finish failed"));
        }));
        assert!(outcome.is_err());
        assert!(!gate.is_serving());
        assert_eq!(gate.inspect(Vec::len, |s| *s), 3);

        gate.mutate(|b| {
            b.push(4);
            Ok(())
        })
        .unwrap();
        assert_eq!(*gate.seal(|b| std::mem::take(b).len()), 4);
        assert!(gate.is_serving());
    }

    #[test]
    fn test_concurrent_seal_runs_once() {
        let gate: Arc<Lifecycle<Vec<u32>, usize>> = Arc::new(Lifecycle::new(vec![1, 2, 3]));
        let runs = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let runs = Arc::clone(&runs);
                thread::spawn(move || {
                    *gate.seal(|b| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        b.len()
                    })
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 3);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
