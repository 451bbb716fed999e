// Calling convention: saturation, partial application, over-application

use std::sync::Arc;

use etude::{make_closure, CaptureStep, Closure, Expr, SlotId, Type, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Closure of arity `n` over naturals returning its `k`-th argument.
fn selector(n: usize, k: usize) -> Arc<Closure> {
    let plan = (0..n)
        .map(|i| CaptureStep::from_arg(SlotId(i), i))
        .collect();
    let mut ty = Type::Nat;
    for _ in 0..n {
        ty = Type::arrow(Type::Nat, ty);
    }
    make_closure(n, plan, Expr::Var(SlotId(k)), ty).expect("closure")
}

fn nats(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Nat).collect()
}

fn as_closure(value: Value) -> Arc<Closure> {
    match value {
        Value::Closure(closure) => closure,
        other => panic!("expected a closure, got {other}"),
    }
}

#[test]
fn saturated_call_runs_the_body() {
    assert_eq!(selector(2, 0).call(nats(&[1, 2])), Ok(Value::Nat(1)));
    assert_eq!(selector(2, 1).call(nats(&[1, 2])), Ok(Value::Nat(2)));
}

#[test]
fn under_application_builds_a_partial_application() {
    let first = selector(2, 0);
    let partial = as_closure(first.call(nats(&[1])).expect("call"));
    assert_eq!(partial.arity(), 1);
    assert_eq!(partial.ty(), &Type::arrow(Type::Nat, Type::Nat));
    assert_eq!(partial.call(nats(&[2])), Ok(Value::Nat(1)));
}

#[test]
fn staged_calls_match_the_direct_call() {
    // call([]) then .call([1]) then .call([2]) all arrive at call([1, 2])
    let first = selector(2, 0);
    let none = as_closure(first.call(Vec::new()).expect("call"));
    assert_eq!(none.arity(), 2);
    let one = as_closure(none.call(nats(&[1])).expect("call"));
    assert_eq!(one.arity(), 1);
    assert_eq!(one.call(nats(&[2])), Ok(Value::Nat(1)));
    assert_eq!(first.call(nats(&[1, 2])), Ok(Value::Nat(1)));
}

#[test]
fn partial_application_does_not_rerun_earlier_arguments() {
    // the partial application stores the already-evaluated argument; using
    // the partial twice sees the same value, not a recomputation
    let second = selector(2, 1);
    let partial = as_closure(second.call(nats(&[10])).expect("call"));
    assert_eq!(partial.call(nats(&[20])), Ok(Value::Nat(20)));
    assert_eq!(partial.call(nats(&[30])), Ok(Value::Nat(30)));
}

#[test]
fn over_application_chains_through_the_result() {
    // id : (Nat -> Nat) -> Nat -> Nat, so id(f, x) must chain into f(x)
    let id = make_closure(
        1,
        vec![CaptureStep::from_arg(SlotId(0), 0)],
        Expr::Var(SlotId(0)),
        Type::arrow(
            Type::arrow(Type::Nat, Type::Nat),
            Type::arrow(Type::Nat, Type::Nat),
        ),
    )
    .expect("closure");
    let inner = selector(1, 0);

    let direct = id.call(vec![Value::Closure(inner.clone()), Value::Nat(9)]);
    assert_eq!(direct, Ok(Value::Nat(9)));

    // the chaining law: c.call(a) == c.call(a[..n]).call(a[n..])
    let staged = as_closure(id.call(vec![Value::Closure(inner)]).expect("call"));
    assert_eq!(staged.call(nats(&[9])), Ok(Value::Nat(9)));
}

proptest! {
    #[test]
    fn partial_application_associates(
        k in 0usize..3,
        split in 0usize..=3,
        a in 0i64..100,
        b in 0i64..100,
        c in 0i64..100,
    ) {
        let closure = selector(3, k);
        let args = [a, b, c];
        let direct = closure.call(nats(&args)).expect("direct call");
        prop_assert_eq!(&direct, &Value::Nat(args[k]));

        let (front, back) = args.split_at(split);
        let staged = match closure.call(nats(front)).expect("front call") {
            Value::Closure(partial) => partial.call(nats(back)).expect("back call"),
            value => value,
        };
        prop_assert_eq!(staged, direct);
    }
}
