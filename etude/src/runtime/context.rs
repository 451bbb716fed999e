// Process-wide evaluation context and the single-threaded fast-path flag

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lazy_static::lazy_static;

lazy_static! {
    static ref GLOBAL: Context = Context::new();
}

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// the context this thread most recently announced itself to
    static LAST_ENTERED: Cell<usize> = const { Cell::new(usize::MAX) };
}

/// Cross-call evaluation state; one per process in normal use. Owns the
/// assumption that only a single thread has ever evaluated, which gates an
/// uncontended slot-kind promotion path.
///
/// The assumption transitions one way: it starts true and is invalidated
/// the first time a second thread enters. Nothing ever sets it back.
#[derive(Debug)]
pub struct Context {
    id: usize,
    single_threaded: AtomicBool,
    arrivals: AtomicUsize,
}

impl Context {
    pub fn new() -> Context {
        Context {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            single_threaded: AtomicBool::new(true),
            arrivals: AtomicUsize::new(0),
        }
    }

    /// The process-wide context every evaluator uses unless handed another.
    pub fn global() -> &'static Context {
        &GLOBAL
    }

    /// Records this thread entering the evaluator. A thread is counted on
    /// its first entry (and again if it visited another context in
    /// between, which can only retire the fast path early, never keep it
    /// alive too long).
    pub fn enter(&self) {
        LAST_ENTERED.with(|last| {
            if last.get() == self.id {
                return;
            }
            last.set(self.id);
            let seen = self.arrivals.fetch_add(1, Ordering::AcqRel) + 1;
            if seen > 1 && self.single_threaded.swap(false, Ordering::AcqRel) {
                log::debug!("second thread entered the evaluator; unboxed fast path disabled");
            }
        });
    }

    pub fn single_threaded(&self) -> bool {
        self.single_threaded.load(Ordering::Acquire)
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}
