// Runtime - evaluation machinery: frames, values, neutral terms, dispatch

pub mod builtins;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod foreign;
pub mod frame;
pub mod neutral;
pub mod thunk;
pub mod values;

pub use builtins::Builtin;
pub use context::Context;
pub use error::{EvalError, EvalResult, Outcome, Signal, Unexpected};
pub use evaluator::Evaluator;
pub use foreign::{foreign_call, make_closure};
pub use frame::{Frame, FrameDescriptor, MaterializedFrame, SlotId};
pub use neutral::{Atom, Neutral, Stuck, SymbolicValue};
pub use thunk::Thunk;
pub use values::{CallableBody, Closure, Value};
