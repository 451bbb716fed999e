// Evaluator - tree walking with speculative fast paths and stuck-term
// propagation

use std::cell::Cell;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::expr::{CaptureStep, Expr, LambdaExpr};
use crate::runtime::context::Context;
use crate::runtime::error::{EvalError, EvalResult, Outcome, Signal, Unexpected};
use crate::runtime::frame::Frame;
use crate::runtime::neutral::{Neutral, Stuck};
use crate::runtime::values::{Closure, Value};
use crate::types::Type;

const DEFAULT_MAX_DEPTH: usize = 4096;

/// Tree-walking evaluator. One instance serves one outermost call and every
/// nested call it makes; nested dispatch shares the depth guard.
#[derive(Debug)]
pub struct Evaluator {
    context: &'static Context,
    depth: Cell<usize>,
    max_depth: usize,
}

impl Evaluator {
    pub fn new() -> Evaluator {
        Evaluator::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Evaluator with a custom call-depth limit.
    pub fn with_max_depth(max_depth: usize) -> Evaluator {
        Evaluator {
            context: Context::global(),
            depth: Cell::new(0),
            max_depth,
        }
    }

    /// Evaluates `expr` against `frame`: a concrete value, a stuck signal,
    /// or a fault.
    pub fn execute(&self, expr: &Expr, frame: &Frame) -> Outcome {
        match expr {
            Expr::Arg(index) => Ok(frame.argument(*index)?.clone()),
            Expr::Var(slot) => Ok(frame.read(*slot)?),
            Expr::Lit(value) => Ok(value.clone()),
            Expr::Ascribe { body, .. } => self.execute(body, frame),
            Expr::Lambda(lambda) => Ok(Value::Closure(Arc::new(self.close_over(lambda, frame)?))),
            Expr::Apply { rator, rands } => self.execute_apply(rator, rands, frame),
            Expr::If {
                condition,
                then,
                otherwise,
                ty,
            } => self.execute_if(condition, then, otherwise, ty, frame),
            Expr::CallBuiltin { builtin, arg, ty } => match builtin.execute(self, frame, arg) {
                Err(Signal::Stuck(stuck)) => Err(Signal::Stuck(Stuck::new(
                    ty.clone(),
                    Neutral::CallBuiltin {
                        builtin: *builtin,
                        arg: stuck.term,
                    },
                ))),
                other => other,
            },
        }
    }

    /// Evaluates with stuck-ness folded into a symbolic value; only faults
    /// remain on the error channel.
    pub fn execute_any(&self, expr: &Expr, frame: &Frame) -> EvalResult {
        match self.execute(expr, frame) {
            Ok(value) => Ok(value),
            Err(Signal::Stuck(stuck)) => Ok(stuck.into_value()),
            Err(Signal::Fault(fault)) => Err(fault),
        }
    }

    /// Fast path to a machine integer. A `Mismatch` carries the computed
    /// value; the caller resolves it without re-evaluating `expr`.
    pub fn execute_nat(&self, expr: &Expr, frame: &Frame) -> Result<i64, Unexpected> {
        match expr {
            Expr::Lit(Value::Nat(n)) => Ok(*n),
            Expr::Var(slot) => match frame.read_nat(*slot) {
                Some(n) => Ok(n),
                None => expect_nat(frame.read(*slot)?),
            },
            Expr::Ascribe { body, .. } => self.execute_nat(body, frame),
            Expr::If {
                condition,
                then,
                otherwise,
                ty,
            } => match self.execute_bool(condition, frame) {
                Ok(true) => self.execute_nat(then, frame),
                Ok(false) => self.execute_nat(otherwise, frame),
                Err(Unexpected::Stuck(stuck)) => {
                    match self.stuck_if(stuck, then, otherwise, ty, frame) {
                        Ok(value) => expect_nat(value),
                        Err(signal) => Err(signal.into()),
                    }
                }
                Err(Unexpected::Mismatch(value)) => Err(bad_condition(value)),
                Err(fault @ Unexpected::Fault(_)) => Err(fault),
            },
            _ => expect_nat(self.execute(expr, frame)?),
        }
    }

    /// Fast path to a boolean, same contract as `execute_nat`.
    pub fn execute_bool(&self, expr: &Expr, frame: &Frame) -> Result<bool, Unexpected> {
        match expr {
            Expr::Lit(Value::Bool(b)) => Ok(*b),
            Expr::Var(slot) => match frame.read_bool(*slot) {
                Some(b) => Ok(b),
                None => expect_bool(frame.read(*slot)?),
            },
            Expr::Ascribe { body, .. } => self.execute_bool(body, frame),
            Expr::If {
                condition,
                then,
                otherwise,
                ty,
            } => match self.execute_bool(condition, frame) {
                Ok(true) => self.execute_bool(then, frame),
                Ok(false) => self.execute_bool(otherwise, frame),
                Err(Unexpected::Stuck(stuck)) => {
                    match self.stuck_if(stuck, then, otherwise, ty, frame) {
                        Ok(value) => expect_bool(value),
                        Err(signal) => Err(signal.into()),
                    }
                }
                Err(Unexpected::Mismatch(value)) => Err(bad_condition(value)),
                Err(fault @ Unexpected::Fault(_)) => Err(fault),
            },
            _ => expect_bool(self.execute(expr, frame)?),
        }
    }

    /// Fast path to a closure, for application operators.
    pub fn execute_closure(&self, expr: &Expr, frame: &Frame) -> Result<Arc<Closure>, Unexpected> {
        match expr {
            Expr::Lambda(lambda) => Ok(Arc::new(self.close_over(lambda, frame)?)),
            Expr::Ascribe { body, .. } => self.execute_closure(body, frame),
            _ => expect_closure(self.execute(expr, frame)?),
        }
    }

    fn execute_apply(&self, rator: &Expr, rands: &[Expr], frame: &Frame) -> Outcome {
        match self.execute_closure(rator, frame) {
            Ok(closure) => {
                let arguments = self.execute_rands(rands, frame)?;
                Ok(self.call_closure(&closure, arguments)?)
            }
            // a stuck operator does not stop the operands: they evaluate
            // eagerly and in order, their effects are observable
            Err(Unexpected::Stuck(stuck)) => {
                let arguments = self.execute_rands(rands, frame)?;
                let deeper = stuck.apply(&arguments)?;
                Err(Signal::Stuck(deeper))
            }
            Err(Unexpected::Mismatch(value)) => Err(Signal::Fault(EvalError::NotCallable(value))),
            Err(Unexpected::Fault(fault)) => Err(Signal::Fault(fault)),
        }
    }

    fn execute_rands(&self, rands: &[Expr], frame: &Frame) -> EvalResult<Vec<Value>> {
        rands
            .iter()
            .map(|rand| self.execute_any(rand, frame))
            .collect()
    }

    fn execute_if(
        &self,
        condition: &Expr,
        then: &Expr,
        otherwise: &Expr,
        ty: &Type,
        frame: &Frame,
    ) -> Outcome {
        match self.execute_bool(condition, frame) {
            Ok(true) => self.execute(then, frame),
            Ok(false) => self.execute(otherwise, frame),
            Err(Unexpected::Stuck(stuck)) => self.stuck_if(stuck, then, otherwise, ty, frame),
            Err(Unexpected::Mismatch(value)) => Err(Signal::Fault(EvalError::TypeMismatch {
                expected: Type::Bool,
                actual: value,
            })),
            Err(Unexpected::Fault(fault)) => Err(Signal::Fault(fault)),
        }
    }

    /// Conditional over a stuck condition: which branch would run is
    /// unknowable, so both evaluate, and equal concrete branch values
    /// escape stuck-ness entirely.
    fn stuck_if(
        &self,
        condition: Stuck,
        then: &Expr,
        otherwise: &Expr,
        ty: &Type,
        frame: &Frame,
    ) -> Outcome {
        let then_value = self.execute_any(then, frame)?;
        let else_value = self.execute_any(otherwise, frame)?;
        if then_value.concretely_eq(&else_value) {
            return Ok(then_value);
        }
        Err(Signal::Stuck(Stuck::new(
            ty.clone(),
            Neutral::If {
                condition: condition.term,
                then_value,
                else_value,
            },
        )))
    }

    /// Evaluates a lambda node: build the captured environment per the
    /// capture plan and wrap it with the code. The body does not run.
    fn close_over(&self, lambda: &LambdaExpr, frame: &Frame) -> EvalResult<Closure> {
        match lambda.env_descriptor() {
            None => Closure::combinator(lambda.code().clone(), lambda.ty().clone()),
            Some(descriptor) => {
                let mut env = Frame::new(descriptor.clone());
                for step in lambda.capture_plan() {
                    let value = self.step_value(step, frame)?;
                    env.write(step.slot, value)?;
                }
                Closure::super_combinator(env.materialize(), lambda.code().clone(), lambda.ty().clone())
            }
        }
    }

    /// One preamble step: the step expression evaluated against `source`,
    /// stuck-ness folded so symbolic values land in slots as ordinary
    /// values.
    fn step_value(&self, step: &CaptureStep, source: &Frame) -> EvalResult<Value> {
        self.execute_any(&step.expr, source)
    }

    /// For builtins over naturals: evaluate the argument on the typed path,
    /// treating a wrong concrete shape as a fault (the checker should have
    /// caught it) and letting stuck-ness propagate.
    pub(crate) fn nat_argument(&self, arg: &Expr, frame: &Frame) -> Result<i64, Signal> {
        match self.execute_nat(arg, frame) {
            Ok(n) => Ok(n),
            Err(Unexpected::Mismatch(value)) => Err(Signal::Fault(EvalError::TypeMismatch {
                expected: Type::Nat,
                actual: value,
            })),
            Err(Unexpected::Stuck(stuck)) => Err(Signal::Stuck(stuck)),
            Err(Unexpected::Fault(fault)) => Err(Signal::Fault(fault)),
        }
    }

    /// Dispatches `arguments` against `closure`: exact arity runs the body,
    /// under-application builds a partial application, over-application
    /// chains calls through the result until the arguments are exhausted.
    pub fn call_closure(&self, closure: &Closure, arguments: Vec<Value>) -> EvalResult<Value> {
        self.context.enter();
        let depth = self.depth.get() + 1;
        if depth > self.max_depth {
            return Err(EvalError::DepthLimit {
                limit: self.max_depth,
            });
        }
        self.depth.set(depth);
        let result = self.dispatch(closure, arguments);
        self.depth.set(self.depth.get() - 1);
        result
    }

    fn dispatch(&self, closure: &Closure, mut arguments: Vec<Value>) -> EvalResult<Value> {
        match arguments.len().cmp(&closure.arity()) {
            Ordering::Less => Ok(Value::Closure(Arc::new(closure.partial(arguments)?))),
            Ordering::Equal => self.invoke(closure, arguments),
            Ordering::Greater => {
                let rest = arguments.split_off(closure.arity());
                match self.invoke(closure, arguments)? {
                    Value::Closure(next) => self.call_closure(&next, rest),
                    Value::Symbolic(symbolic) => Ok(Value::Symbolic(symbolic.apply(&rest)?)),
                    other => Err(EvalError::NotCallable(other)),
                }
            }
        }
    }

    /// Saturated invocation: build the local frame, run the environment and
    /// argument preambles, run the body. Arguments applied earlier by
    /// partial application go in front.
    fn invoke(&self, closure: &Closure, arguments: Vec<Value>) -> EvalResult<Value> {
        let code = closure.body().code().clone();
        let mut full = Vec::with_capacity(closure.applied().len() + arguments.len());
        full.extend_from_slice(closure.applied());
        full.extend(arguments);
        debug_assert_eq!(full.len(), code.arity());

        let mut local = Frame::for_call(code.descriptor().clone(), full);
        if let Some(env) = closure.body().env() {
            for step in code.env_preamble() {
                let value = self.step_value(step, env.frame())?;
                local.write(step.slot, value)?;
            }
        }
        for step in code.arg_preamble() {
            let value = self.step_value(step, &local)?;
            local.write(step.slot, value)?;
        }
        self.execute_any(code.body(), &local)
    }
}

impl Default for Evaluator {
    fn default() -> Evaluator {
        Evaluator::new()
    }
}

fn expect_nat(value: Value) -> Result<i64, Unexpected> {
    match value {
        Value::Nat(n) => Ok(n),
        // a symbolic value in a typed position is stuck-ness, not a miss
        Value::Symbolic(symbolic) => Err(Unexpected::Stuck(symbolic.into())),
        other => Err(Unexpected::Mismatch(other)),
    }
}

fn expect_bool(value: Value) -> Result<bool, Unexpected> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Symbolic(symbolic) => Err(Unexpected::Stuck(symbolic.into())),
        other => Err(Unexpected::Mismatch(other)),
    }
}

fn expect_closure(value: Value) -> Result<Arc<Closure>, Unexpected> {
    match value {
        Value::Closure(closure) => Ok(closure),
        Value::Symbolic(symbolic) => Err(Unexpected::Stuck(symbolic.into())),
        other => Err(Unexpected::Mismatch(other)),
    }
}

fn bad_condition(value: Value) -> Unexpected {
    Unexpected::Fault(EvalError::TypeMismatch {
        expected: Type::Bool,
        actual: value,
    })
}
