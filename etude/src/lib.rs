// etude - evaluation core of a small call-by-value functional language
//
// An expression-tree interpreter with closures, partial and over-
// application, speculative per-slot value representations, and stuck-term
// propagation (normalization-by-evaluation): when a sub-computation cannot
// reduce concretely, evaluation continues structurally around it and the
// call yields a symbolic value instead of failing.

pub mod expr;
pub mod runtime;
pub mod types;

// Re-export the working surface so hosts can depend on the crate root.
pub use expr::{CaptureStep, Code, Expr, LambdaExpr};
pub use runtime::{
    foreign_call, make_closure, Atom, Builtin, CallableBody, Closure, Context, EvalError,
    EvalResult, Evaluator, Frame, FrameDescriptor, MaterializedFrame, Neutral, Outcome, Signal,
    SlotId, Stuck, SymbolicValue, Thunk, Unexpected, Value,
};
pub use types::{SlotKind, Type};
