// Expression tree - the immutable nodes the evaluator walks

use std::sync::Arc;

use crate::runtime::builtins::Builtin;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::frame::{FrameDescriptor, SlotId};
use crate::runtime::values::Value;
use crate::types::Type;

/// One step of a preamble or capture plan: evaluate `expr` against a source
/// frame and store the outcome into `slot` of the frame under construction,
/// following the slot write protocol.
#[derive(Debug, Clone)]
pub struct CaptureStep {
    pub slot: SlotId,
    pub expr: Expr,
}

impl CaptureStep {
    pub fn new(slot: SlotId, expr: Expr) -> CaptureStep {
        CaptureStep { slot, expr }
    }

    /// Step storing positional call argument `index` into `slot`.
    pub fn from_arg(slot: SlotId, index: usize) -> CaptureStep {
        CaptureStep::new(slot, Expr::Arg(index))
    }

    /// Step copying slot `source` of the source frame into `slot`.
    pub fn from_var(slot: SlotId, source: SlotId) -> CaptureStep {
        CaptureStep::new(slot, Expr::Var(source))
    }
}

/// Executable body of one function: the layout of its local frame, the
/// preambles that fill it, and the body expression. Shared between every
/// closure created from the same lambda.
#[derive(Debug)]
pub struct Code {
    descriptor: Arc<FrameDescriptor>,
    /// runs against the captured environment frame; empty for combinators
    env_preamble: Vec<CaptureStep>,
    /// runs against the local frame itself, reading the call arguments
    arg_preamble: Vec<CaptureStep>,
    body: Expr,
    arity: usize,
}

impl Code {
    /// Builds a code object, checking that every preamble target fits the
    /// descriptor so frames never see an out-of-range write.
    pub fn new(
        descriptor: Arc<FrameDescriptor>,
        env_preamble: Vec<CaptureStep>,
        arg_preamble: Vec<CaptureStep>,
        body: Expr,
        arity: usize,
    ) -> EvalResult<Arc<Code>> {
        if arity == 0 {
            return Err(EvalError::Internal(
                "code arity must be at least 1".to_string(),
            ));
        }
        for step in env_preamble.iter().chain(arg_preamble.iter()) {
            if step.slot.index() >= descriptor.len() {
                return Err(EvalError::Internal(format!(
                    "preamble targets slot {} but the descriptor has {} slots",
                    step.slot.index(),
                    descriptor.len()
                )));
            }
        }
        Ok(Arc::new(Code {
            descriptor,
            env_preamble,
            arg_preamble,
            body,
            arity,
        }))
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn descriptor(&self) -> &Arc<FrameDescriptor> {
        &self.descriptor
    }

    /// Whether this body expects a captured environment at call time.
    pub fn is_super_combinator(&self) -> bool {
        !self.env_preamble.is_empty()
    }

    pub(crate) fn env_preamble(&self) -> &[CaptureStep] {
        &self.env_preamble
    }

    pub(crate) fn arg_preamble(&self) -> &[CaptureStep] {
        &self.arg_preamble
    }

    pub(crate) fn body(&self) -> &Expr {
        &self.body
    }
}

/// A lambda literal: everything needed to close over the enclosing frame
/// when the node is evaluated.
#[derive(Debug, Clone)]
pub struct LambdaExpr {
    /// layout of the captured environment; `None` for combinators
    env_descriptor: Option<Arc<FrameDescriptor>>,
    /// fills the captured environment from the enclosing frame
    capture_plan: Vec<CaptureStep>,
    code: Arc<Code>,
    ty: Type,
}

impl LambdaExpr {
    /// Lambda with no free variables: nothing to capture.
    pub fn combinator(code: Arc<Code>, ty: Type) -> EvalResult<LambdaExpr> {
        if code.is_super_combinator() {
            return Err(EvalError::Internal(
                "combinator lambda over code that expects an environment".to_string(),
            ));
        }
        LambdaExpr::checked(None, Vec::new(), code, ty)
    }

    /// Lambda that captures from its enclosing frame into an environment
    /// laid out by `env_descriptor`.
    pub fn super_combinator(
        env_descriptor: Arc<FrameDescriptor>,
        capture_plan: Vec<CaptureStep>,
        code: Arc<Code>,
        ty: Type,
    ) -> EvalResult<LambdaExpr> {
        if !code.is_super_combinator() {
            return Err(EvalError::Internal(
                "environment-capturing lambda over code that never reads one".to_string(),
            ));
        }
        for step in &capture_plan {
            if step.slot.index() >= env_descriptor.len() {
                return Err(EvalError::Internal(format!(
                    "capture plan targets slot {} but the environment has {} slots",
                    step.slot.index(),
                    env_descriptor.len()
                )));
            }
        }
        LambdaExpr::checked(Some(env_descriptor), capture_plan, code, ty)
    }

    fn checked(
        env_descriptor: Option<Arc<FrameDescriptor>>,
        capture_plan: Vec<CaptureStep>,
        code: Arc<Code>,
        ty: Type,
    ) -> EvalResult<LambdaExpr> {
        if ty.arity() < code.arity() {
            return Err(EvalError::Internal(format!(
                "declared type `{ty}` is thinner than the code arity {}",
                code.arity()
            )));
        }
        Ok(LambdaExpr {
            env_descriptor,
            capture_plan,
            code,
            ty,
        })
    }

    pub fn env_descriptor(&self) -> Option<&Arc<FrameDescriptor>> {
        self.env_descriptor.as_ref()
    }

    pub fn capture_plan(&self) -> &[CaptureStep] {
        &self.capture_plan
    }

    pub fn code(&self) -> &Arc<Code> {
        &self.code
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

/// One node of the expression tree. Trees are produced by the upstream
/// checker and never change afterwards; the evaluator only reads them.
#[derive(Debug, Clone)]
pub enum Expr {
    /// the i-th positional call argument, straight from the call
    Arg(usize),
    /// a local frame slot
    Var(SlotId),
    Apply {
        rator: Box<Expr>,
        rands: Vec<Expr>,
    },
    If {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
        /// result type, carried for the stuck-conditional wrapping
        ty: Type,
    },
    Lambda(LambdaExpr),
    /// static annotation, no runtime effect
    Ascribe {
        body: Box<Expr>,
        ty: Type,
    },
    CallBuiltin {
        builtin: Builtin,
        arg: Box<Expr>,
        /// result type, carried for the stuck-argument wrapping
        ty: Type,
    },
    Lit(Value),
}

impl Expr {
    pub fn nat(n: i64) -> Expr {
        Expr::Lit(Value::Nat(n))
    }

    pub fn bool(b: bool) -> Expr {
        Expr::Lit(Value::Bool(b))
    }

    pub fn apply(rator: Expr, rands: Vec<Expr>) -> Expr {
        Expr::Apply {
            rator: Box::new(rator),
            rands,
        }
    }

    pub fn branch(condition: Expr, then: Expr, otherwise: Expr, ty: Type) -> Expr {
        Expr::If {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            ty,
        }
    }

    pub fn ascribe(body: Expr, ty: Type) -> Expr {
        Expr::Ascribe {
            body: Box::new(body),
            ty,
        }
    }

    pub fn call_builtin(builtin: Builtin, arg: Expr) -> Expr {
        let ty = builtin.result_type();
        Expr::CallBuiltin {
            builtin,
            arg: Box::new(arg),
            ty,
        }
    }
}
