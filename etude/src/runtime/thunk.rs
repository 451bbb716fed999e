// Single-assignment memoized cell

use std::fmt;
use std::sync::Mutex;

use once_cell::sync::OnceCell;

/// A value computed at most once across possibly-concurrent observers.
///
/// The first `force` runs the producer under the cell's initialization lock
/// and drops it; every later `force` is a plain read with no further
/// synchronization.
pub struct Thunk<T> {
    cell: OnceCell<T>,
    producer: Mutex<Option<Box<dyn FnOnce() -> T + Send>>>,
}

impl<T> Thunk<T> {
    pub fn new<F>(producer: F) -> Thunk<T>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Thunk {
            cell: OnceCell::new(),
            producer: Mutex::new(Some(Box::new(producer))),
        }
    }

    /// A cell that is already computed.
    pub fn ready(value: T) -> Thunk<T> {
        let cell = OnceCell::new();
        let _ = cell.set(value);
        Thunk {
            cell,
            producer: Mutex::new(None),
        }
    }

    pub fn force(&self) -> &T {
        self.cell.get_or_init(|| {
            let mut guard = match self.producer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match guard.take() {
                Some(producer) => producer(),
                // get_or_init runs its closure exactly once, and only that
                // run consumes the producer
                None => unreachable!("thunk producer already consumed"),
            }
        })
    }

    /// Whether the value has been computed yet.
    pub fn is_forced(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for Thunk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Thunk").field(value).finish(),
            None => f.write_str("Thunk(<pending>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn computes_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let thunk = Thunk::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            7usize
        });
        assert!(!thunk.is_forced());
        assert_eq!(*thunk.force(), 7);
        assert_eq!(*thunk.force(), 7);
        assert!(thunk.is_forced());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ready_skips_the_producer() {
        let thunk = Thunk::ready("done");
        assert!(thunk.is_forced());
        assert_eq!(*thunk.force(), "done");
    }

    #[test]
    fn concurrent_force_runs_the_producer_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let thunk = Arc::new(Thunk::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            42i64
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = thunk.clone();
                std::thread::spawn(move || *shared.force())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread"), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
