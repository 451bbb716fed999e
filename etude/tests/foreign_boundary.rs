// Host-side entry: argument validation against the declared type

use std::sync::Arc;

use etude::{
    foreign_call, make_closure, CaptureStep, Closure, EvalError, Expr, SlotId, SymbolicValue,
    Type, Value,
};
use pretty_assertions::assert_eq;

fn identity(ty: Type) -> Arc<Closure> {
    make_closure(
        1,
        vec![CaptureStep::from_arg(SlotId(0), 0)],
        Expr::Var(SlotId(0)),
        ty,
    )
    .expect("closure")
}

/// first : Nat -> Bool -> Nat, returning its first argument.
fn first() -> Arc<Closure> {
    let plan = vec![
        CaptureStep::from_arg(SlotId(0), 0),
        CaptureStep::from_arg(SlotId(1), 1),
    ];
    make_closure(
        2,
        plan,
        Expr::Var(SlotId(0)),
        Type::arrow(Type::Nat, Type::arrow(Type::Bool, Type::Nat)),
    )
    .expect("closure")
}

#[test]
fn valid_arguments_dispatch() {
    let id = identity(Type::arrow(Type::Nat, Type::Nat));
    assert_eq!(foreign_call(&id, vec![Value::Nat(5)]), Ok(Value::Nat(5)));
}

#[test]
fn too_many_arguments_fault_before_dispatch() {
    let id = identity(Type::arrow(Type::Nat, Type::Nat));
    let result = foreign_call(&id, vec![Value::Nat(1), Value::Nat(2)]);
    assert_eq!(
        result,
        Err(EvalError::ArityMismatch {
            expected: 1,
            actual: 2,
        })
    );
}

#[test]
fn a_boolean_does_not_validate_against_nat() {
    let id = identity(Type::arrow(Type::Nat, Type::Nat));
    let result = foreign_call(&id, vec![Value::Bool(true)]);
    assert_eq!(
        result,
        Err(EvalError::TypeMismatch {
            expected: Type::Nat,
            actual: Value::Bool(true),
        })
    );
}

#[test]
fn negative_integers_are_not_naturals() {
    let id = identity(Type::arrow(Type::Nat, Type::Nat));
    let result = foreign_call(&id, vec![Value::Nat(-3)]);
    assert_eq!(
        result,
        Err(EvalError::TypeMismatch {
            expected: Type::Nat,
            actual: Value::Nat(-3),
        })
    );
}

#[test]
fn symbolic_arguments_are_rejected_at_the_boundary() {
    // inside the evaluator the same value flows through as a stuck term;
    // the host entry only admits concrete representatives of the type
    let id = identity(Type::arrow(Type::Nat, Type::Nat));
    let n = Value::Symbolic(SymbolicValue::atom(Type::Nat, "n"));
    assert!(matches!(
        foreign_call(&id, vec![n.clone()]),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(id.call(vec![n]), Ok(Value::Symbolic(_))));
}

#[test]
fn arrow_positions_require_matching_closures() {
    // apply2 : (Nat -> Nat) -> Nat -> Nat
    let plan = vec![
        CaptureStep::from_arg(SlotId(0), 0),
        CaptureStep::from_arg(SlotId(1), 1),
    ];
    let body = Expr::apply(Expr::Var(SlotId(0)), vec![Expr::Var(SlotId(1))]);
    let apply2 = make_closure(
        2,
        plan,
        body,
        Type::arrow(
            Type::arrow(Type::Nat, Type::Nat),
            Type::arrow(Type::Nat, Type::Nat),
        ),
    )
    .expect("closure");

    let id_nat = identity(Type::arrow(Type::Nat, Type::Nat));
    let accepted = foreign_call(
        &apply2,
        vec![Value::Closure(id_nat), Value::Nat(4)],
    );
    assert_eq!(accepted, Ok(Value::Nat(4)));

    // a closure expecting a different argument type is rejected
    let id_bool = identity(Type::arrow(Type::Bool, Type::Bool));
    let rejected = foreign_call(
        &apply2,
        vec![Value::Closure(id_bool.clone()), Value::Nat(4)],
    );
    assert_eq!(
        rejected,
        Err(EvalError::TypeMismatch {
            expected: Type::arrow(Type::Nat, Type::Nat),
            actual: Value::Closure(id_bool),
        })
    );

    // a plain value is rejected outright
    let plain = foreign_call(&apply2, vec![Value::Nat(1), Value::Nat(2)]);
    assert_eq!(
        plain,
        Err(EvalError::TypeMismatch {
            expected: Type::arrow(Type::Nat, Type::Nat),
            actual: Value::Nat(1),
        })
    );
}

#[test]
fn partial_application_validates_against_the_remaining_type() {
    let konst = first();
    let partial = match foreign_call(&konst, vec![Value::Nat(5)]) {
        Ok(Value::Closure(partial)) => partial,
        other => panic!("expected a partial application, got {other:?}"),
    };
    assert_eq!(partial.ty(), &Type::arrow(Type::Bool, Type::Nat));

    // the consumed Nat layer is gone; only Bool remains
    assert_eq!(
        foreign_call(&partial, vec![Value::Nat(1)]),
        Err(EvalError::TypeMismatch {
            expected: Type::Bool,
            actual: Value::Nat(1),
        })
    );
    assert_eq!(
        foreign_call(&partial, vec![Value::Bool(true)]),
        Ok(Value::Nat(5))
    );
}

#[test]
fn validation_precedes_evaluation() {
    // the body never looks at its second argument, yet the boundary still
    // rejects an ill-typed one
    let konst = first();
    let result = foreign_call(&konst, vec![Value::Nat(1), Value::Nat(2)]);
    assert_eq!(
        result,
        Err(EvalError::TypeMismatch {
            expected: Type::Bool,
            actual: Value::Nat(2),
        })
    );
}

#[test]
fn object_positions_accept_anything() {
    let id = identity(Type::arrow(Type::Object, Type::Object));
    assert_eq!(
        foreign_call(&id, vec![Value::Bool(false)]),
        Ok(Value::Bool(false))
    );
    assert_eq!(foreign_call(&id, vec![Value::Nat(-7)]), Ok(Value::Nat(-7)));
    let n = Value::Symbolic(SymbolicValue::atom(Type::Nat, "n"));
    assert_eq!(foreign_call(&id, vec![n.clone()]), Ok(n));
}

#[test]
fn an_empty_call_returns_a_partial_application() {
    let id = identity(Type::arrow(Type::Nat, Type::Nat));
    match foreign_call(&id, Vec::new()) {
        Ok(Value::Closure(same)) => {
            assert_eq!(same.arity(), 1);
            assert_eq!(same.call(vec![Value::Nat(8)]), Ok(Value::Nat(8)));
        }
        other => panic!("expected a closure, got {other:?}"),
    }
}
