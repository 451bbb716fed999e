// Fault and control-signal types for the evaluator
//
// Three outcomes never conflate: genuine faults (`EvalError`), stuck-ness
// (`Signal::Stuck`, recoverable by treating the result as symbolic), and
// speculation misses (`Unexpected::Mismatch`, resolved inside the evaluator
// by retrying generically).

use crate::runtime::neutral::Stuck;
use crate::runtime::values::Value;
use crate::types::Type;

/// Genuine faults: fatal to the current call, reported to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("arity mismatch: expected at most {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: Type, actual: Value },

    #[error("value {0} is not callable")]
    NotCallable(Value),

    #[error("slot `{name}` read before any write")]
    UnsetSlot { name: String },

    #[error("call depth limit {limit} exceeded")]
    DepthLimit { limit: usize },

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Why an `execute` step produced no value: the computation is stuck on a
/// symbolic sub-term, or a fault occurred. Composite nodes catch `Stuck`
/// and re-wrap it one term layer deeper; faults pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Stuck(Stuck),
    Fault(EvalError),
}

impl From<Stuck> for Signal {
    fn from(stuck: Stuck) -> Signal {
        Signal::Stuck(stuck)
    }
}

impl From<EvalError> for Signal {
    fn from(fault: EvalError) -> Signal {
        Signal::Fault(fault)
    }
}

/// Outcome of one evaluation step.
pub type Outcome<T = Value> = Result<T, Signal>;

/// Why a typed fast path produced no primitive. `Mismatch` carries the
/// already-computed value so the caller retries generically without
/// re-evaluating (side effects run once).
#[derive(Debug, Clone, PartialEq)]
pub enum Unexpected {
    /// speculation miss: the value exists but has another shape
    Mismatch(Value),
    Stuck(Stuck),
    Fault(EvalError),
}

impl From<Signal> for Unexpected {
    fn from(signal: Signal) -> Unexpected {
        match signal {
            Signal::Stuck(stuck) => Unexpected::Stuck(stuck),
            Signal::Fault(fault) => Unexpected::Fault(fault),
        }
    }
}

impl From<Stuck> for Unexpected {
    fn from(stuck: Stuck) -> Unexpected {
        Unexpected::Stuck(stuck)
    }
}

impl From<EvalError> for Unexpected {
    fn from(fault: EvalError) -> Unexpected {
        Unexpected::Fault(fault)
    }
}
