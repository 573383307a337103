//! Deep call chains run on the heap.

use pretty_assertions::assert_eq;
use vault_eval::{EvalMode, Interpreter, Value};
use vault_ir::{BinaryOp, ExprKind, FunctionId, Span, StmtKind, StmtRange};

use crate::common::{int, Program};

/// `sum(n) { if n == 0 { return 0 } return n + sum(n - 1) }`
fn declare_sum(program: &mut Program) -> FunctionId {
    let (n, zero) = (program.ident("n"), program.arena.int(0));
    let cond = program.arena.binary(BinaryOp::Eq, n, zero);
    let zero = program.arena.int(0);
    let base = program.ret(zero);
    let then_branch = program.arena.block([base]);
    let branch = program.arena.push_stmt(StmtKind::If {
        cond,
        then_branch,
        else_branch: StmtRange::EMPTY,
    });
    let (n, one) = (program.ident("n"), program.arena.int(1));
    let pred = program.arena.binary(BinaryOp::Sub, n, one);
    let rest = program.call("sum", vec![pred]);
    let n = program.ident("n");
    let total = program.arena.binary(BinaryOp::Add, n, rest);
    let ret = program.ret(total);
    program.function("sum", &["n"], vec![branch, ret])
}

#[test]
fn hundred_thousand_nested_calls() {
    let mut program = Program::new();
    let sum = declare_sum(&mut program);
    let (mut interpreter, _) = program.finish(&[sum]);
    let result = interpreter.call("sum", [Value::Int(100_000)]);
    assert_eq!(result.ok(), Some(Value::Int(5_000_050_000)));
    assert_eq!(interpreter.call_depth(), 0);
}

#[test]
fn mutual_recursion_between_declarations() {
    // even(n) { if n == 0 { return true } return odd(n - 1) }
    // odd(n)  { if n == 0 { return false } return even(n - 1) }
    let mut program = Program::new();
    let declare = |program: &mut Program, name: &str, other: &str, base: bool| {
        let (n, zero) = (program.ident("n"), program.arena.int(0));
        let cond = program.arena.binary(BinaryOp::Eq, n, zero);
        let literal = program.arena.bool(base);
        let ret_base = program.ret(literal);
        let then_branch = program.arena.block([ret_base]);
        let branch = program.arena.push_stmt(StmtKind::If {
            cond,
            then_branch,
            else_branch: StmtRange::EMPTY,
        });
        let (n, one) = (program.ident("n"), program.arena.int(1));
        let pred = program.arena.binary(BinaryOp::Sub, n, one);
        let call = program.call(other, vec![pred]);
        let ret = program.ret(call);
        program.function(name, &["n"], vec![branch, ret])
    };
    let odd = declare(&mut program, "odd", "even", false);
    let even = declare(&mut program, "even", "odd", true);
    let (mut interpreter, _) = program.finish(&[odd, even]);
    assert_eq!(
        interpreter.call("even", [Value::Int(20_001)]).ok(),
        Some(Value::Bool(false))
    );
    assert_eq!(
        interpreter.call("odd", [Value::Int(20_001)]).ok(),
        Some(Value::Bool(true))
    );
}

#[test]
fn closure_outlives_its_scope() {
    // make(k) { let offset = k * 2; return fun(x) { return x + offset } }
    let mut program = Program::new();
    let (x, offset) = (program.ident("x"), program.ident("offset"));
    let sum = program.arena.binary(BinaryOp::Add, x, offset);
    let ret = program.ret(sum);
    let adder = program.function("adder", &["x"], vec![ret]);
    let (k, two) = (program.ident("k"), program.arena.int(2));
    let doubled = program.arena.binary(BinaryOp::Mul, k, two);
    let bind = program.let_("offset", doubled);
    let closure = program.arena.alloc_expr(ExprKind::Function(adder), Span::DUMMY);
    let ret = program.ret(closure);
    let make = program.function("make", &["k"], vec![bind, ret]);
    let (mut interpreter, _) = program.finish(&[make]);

    let Ok(Value::Function(add_ten)) = interpreter.call("make", [Value::Int(5)]) else {
        panic!("make returns a closure");
    };
    let result = interpreter.call_function(&add_ten, [Value::Int(1)]).unwrap();
    assert_eq!(int(&result), 11);
}

#[test]
fn deep_optional_chain_is_built_and_dropped() {
    // let x = 0; let i = 0
    // while i < 300000 { x = <- Some(<- x); i = i + 1 }
    // return <- x
    const DEPTH: i64 = 300_000;
    let mut program = Program::new();
    let zero = program.arena.int(0);
    let bind_x = program.let_("x", zero);
    let zero = program.arena.int(0);
    let bind_i = program.let_("i", zero);

    let (i, limit) = (program.ident("i"), program.arena.int(DEPTH));
    let cond = program.arena.binary(BinaryOp::Lt, i, limit);
    let x = program.ident("x");
    let moved = program.arena.move_of(x);
    let wrapped = program.arena.some(moved);
    let value = program.arena.move_of(wrapped);
    let target = program.ident("x");
    let rewrap = program.arena.push_stmt(StmtKind::Assign { target, value });
    let (i, one) = (program.ident("i"), program.arena.int(1));
    let value = program.arena.binary(BinaryOp::Add, i, one);
    let target = program.ident("i");
    let count = program.arena.push_stmt(StmtKind::Assign { target, value });
    let body = program.arena.block([rewrap, count]);
    let looped = program.arena.push_stmt(StmtKind::While { cond, body });

    let x = program.ident("x");
    let moved = program.arena.move_of(x);
    let ret = program.ret(moved);
    let (_, result) = program.execute(vec![bind_x, bind_i, looped, ret]);

    let mut current = result.unwrap();
    let mut depth = 0;
    while let Value::Some(inner) = current {
        current = inner.into_value();
        depth += 1;
    }
    assert_eq!(depth, DEPTH);
    assert_eq!(current, Value::Int(0));
}

#[test]
fn test_run_depth_limit_is_reported_not_overflowed() {
    let mut program = Program::with(Interpreter::builder().mode(EvalMode::TestRun).build());
    let sum = declare_sum(&mut program);
    let (mut interpreter, _) = program.finish(&[sum]);
    let err = interpreter.call("sum", [Value::Int(10_000)]).unwrap_err();
    assert!(matches!(
        err.kind,
        vault_eval::EvalErrorKind::CallDepthExceeded { limit: 500 }
    ));
    assert_eq!(err.backtrace.map(|trace| trace.len()), Some(500));
    assert_eq!(interpreter.call_depth(), 0);
}
