// Foreign boundary - closure construction and host-side invocation

use std::sync::Arc;

use crate::expr::{CaptureStep, Code, Expr};
use crate::runtime::context::Context;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::frame::FrameDescriptor;
use crate::runtime::values::{Closure, Value};
use crate::types::Type;

/// Builds a callable closure from an arity, a plan that fills the local
/// frame from the call arguments, a body, and the declared type. The local
/// frame is sized from the highest slot the plan or the body touches.
///
/// The upstream compiler calls this once per function definition.
pub fn make_closure(
    arity: usize,
    capture_plan: Vec<CaptureStep>,
    body: Expr,
    ty: Type,
) -> EvalResult<Arc<Closure>> {
    if arity == 0 {
        return Err(EvalError::Internal(
            "closure arity must be at least 1".to_string(),
        ));
    }
    if ty.arity() < arity {
        return Err(EvalError::Internal(format!(
            "declared type `{ty}` has arity {} but the closure needs {arity}",
            ty.arity()
        )));
    }
    let descriptor = Arc::new(FrameDescriptor::sized(frame_size(&capture_plan, &body)));
    let code = Code::new(descriptor, Vec::new(), capture_plan, body, arity)?;
    Ok(Arc::new(Closure::combinator(code, ty)?))
}

/// Host entry point: validates `arguments` against the closure's type, one
/// arrow layer per argument, then dispatches through the calling
/// convention. Anything beyond the type's arrow nesting is an arity fault.
pub fn foreign_call(closure: &Closure, arguments: Vec<Value>) -> EvalResult<Value> {
    Context::global().enter();
    let declared = closure.ty();
    let depth = declared.arity();
    if arguments.len() > depth {
        log::debug!(
            "foreign call with {} arguments onto `{declared}`",
            arguments.len()
        );
        return Err(EvalError::ArityMismatch {
            expected: depth,
            actual: arguments.len(),
        });
    }
    let mut layer = declared;
    for argument in &arguments {
        let Type::Arrow { argument: expected, result } = layer else {
            return Err(EvalError::Internal(
                "arrow layers exhausted during validation".to_string(),
            ));
        };
        if let Err(fault) = expected.validate(argument) {
            log::debug!("foreign argument rejected: {fault}");
            return Err(fault);
        }
        layer = result.as_ref();
    }
    Evaluator::new().call_closure(closure, arguments)
}

/// Frame size the plan and body need: one past the highest slot the plan
/// writes or any reachable expression reads. Nested lambdas touch the
/// current frame only through their capture plans.
fn frame_size(plan: &[CaptureStep], body: &Expr) -> usize {
    let mut high = None;
    for step in plan {
        bump(&mut high, step.slot.index());
        scan(&step.expr, &mut high);
    }
    scan(body, &mut high);
    high.map_or(0, |index| index + 1)
}

fn bump(high: &mut Option<usize>, index: usize) {
    *high = Some(high.map_or(index, |current: usize| current.max(index)));
}

fn scan(expr: &Expr, high: &mut Option<usize>) {
    match expr {
        Expr::Var(slot) => bump(high, slot.index()),
        Expr::Apply { rator, rands } => {
            scan(rator, high);
            for rand in rands {
                scan(rand, high);
            }
        }
        Expr::If {
            condition,
            then,
            otherwise,
            ..
        } => {
            scan(condition, high);
            scan(then, high);
            scan(otherwise, high);
        }
        Expr::Lambda(lambda) => {
            for step in lambda.capture_plan() {
                scan(&step.expr, high);
            }
        }
        Expr::Ascribe { body, .. } => scan(body, high),
        Expr::CallBuiltin { arg, .. } => scan(arg, high),
        Expr::Arg(_) | Expr::Lit(_) => {}
    }
}
