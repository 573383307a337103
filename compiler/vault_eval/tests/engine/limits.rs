//! Budgets, cancellation and runtime failures abort cleanly.

use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use vault_eval::{
    CancelToken, EvalErrorKind, EvalMode, Execution, Int256, Interpreter, Progress, StepContext,
    Value,
};
use vault_ir::{BinaryOp, ExprKind, Span, StmtId, StmtKind};

use crate::common::Program;

/// `while true { }`
fn spin(program: &mut Program) -> StmtId {
    let cond = program.arena.bool(true);
    let body = program.arena.block([]);
    program.arena.push_stmt(StmtKind::While { cond, body })
}

#[test]
fn metered_loop_exhausts_its_budget() {
    let interpreter = Interpreter::builder()
        .mode(EvalMode::Metered { step_budget: 1_000 })
        .build();
    let mut program = Program::with(interpreter);
    let looped = spin(&mut program);
    let (interpreter, result) = program.execute(vec![looped]);
    assert_eq!(
        result.map_err(|err| err.kind).err(),
        Some(EvalErrorKind::StepBudgetExceeded { budget: 1_000 })
    );
    assert_eq!(interpreter.steps(), 1_001);
}

#[test]
fn budget_override_applies_to_any_mode() {
    let interpreter = Interpreter::builder().step_budget(50).build();
    let mut program = Program::with(interpreter);
    let looped = spin(&mut program);
    let (_, result) = program.execute(vec![looped]);
    assert!(matches!(
        result.map_err(|err| err.kind),
        Err(EvalErrorKind::StepBudgetExceeded { budget: 50 })
    ));
}

#[test]
fn hook_can_cancel_a_running_loop() {
    let token = CancelToken::new();
    let remote = token.clone();
    let interpreter = Interpreter::builder()
        .cancel_token(token)
        .step_hook(move |ctx: &StepContext| {
            if ctx.steps == 100 {
                remote.cancel();
            }
            Ok(())
        })
        .build();
    let mut program = Program::with(interpreter);
    let looped = spin(&mut program);
    let (interpreter, result) = program.execute(vec![looped]);
    assert_eq!(
        result.map_err(|err| err.kind).err(),
        Some(EvalErrorKind::Cancelled)
    );
    assert_eq!(interpreter.steps(), 101);
}

#[test]
fn cancellation_from_another_thread() {
    let token = CancelToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel()).join().unwrap();

    let interpreter = Interpreter::builder().cancel_token(token).build();
    let mut program = Program::with(interpreter);
    let looped = spin(&mut program);
    let (interpreter, result) = program.execute(vec![looped]);
    assert_eq!(
        result.map_err(|err| err.kind).err(),
        Some(EvalErrorKind::Cancelled)
    );
    assert_eq!(interpreter.steps(), 1);
}

#[test]
fn stepping_a_call_by_hand() {
    // add(a, b) { return a + b }
    let mut program = Program::new();
    let (a, b) = (program.ident("a"), program.ident("b"));
    let sum = program.arena.binary(BinaryOp::Add, a, b);
    let ret = program.ret(sum);
    let add = program.function("add", &["a", "b"], vec![ret]);
    let (mut interpreter, _) = program.finish(&[add]);
    let Some(Value::Function(add)) = interpreter
        .globals()
        .lookup_value(interpreter.interner().intern("add"))
    else {
        panic!("add is declared");
    };

    let trampoline = interpreter
        .invoke(&add, [Value::Int(2), Value::Int(3)], add.ty().params, Span::DUMMY)
        .unwrap();
    let mut execution: Execution = interpreter.execution(trampoline);
    let mut pending = 0;
    let result = loop {
        match execution.step(&mut interpreter).unwrap() {
            Progress::Pending => pending += 1,
            Progress::Finished(value) => break value,
        }
    };
    assert_eq!(result, Value::Int(5));
    assert!(execution.is_finished());
    assert!(pending > 0);
    assert_eq!(interpreter.call_depth(), 0);
}

#[test]
fn runtime_errors_have_spans_and_backtraces() {
    // divide(a, b) { return a / b }
    let mut program = Program::new();
    let (a, b) = (program.ident("a"), program.ident("b"));
    let quotient = program.arena.alloc_expr(
        ExprKind::Binary {
            op: BinaryOp::Div,
            left: a,
            right: b,
        },
        Span::new(20, 25),
    );
    let ret = program.ret(quotient);
    let divide = program.function("divide", &["a", "b"], vec![ret]);
    let (mut interpreter, _) = program.finish(&[divide]);

    let err = interpreter
        .call("divide", [Value::Int(1), Value::Int(0)])
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    assert_eq!(err.span, Some(Span::new(20, 25)));
    assert_eq!(err.backtrace.as_ref().map(|trace| trace.len()), Some(1));
    assert!(!err.is_fatal());
    assert_eq!(interpreter.call_depth(), 0);

    let ok = interpreter.call("divide", [Value::Int(9), Value::Int(3)]);
    assert_eq!(ok.ok(), Some(Value::Int(3)));
}

#[test]
fn int256_overflow_is_reported() {
    let mut program = Program::new();
    let (max, one) = (program.name("max"), program.name("one"));
    program
        .interpreter
        .define_global(max, Value::Int256(Int256::max_value()));
    program
        .interpreter
        .define_global(one, Value::Int256(Int256::from(1i64)));
    let (left, right) = (program.arena.ident(max), program.arena.ident(one));
    let sum = program.arena.binary(BinaryOp::Add, left, right);
    let err = program.evaluate(sum).unwrap_err();
    assert!(matches!(
        err.kind,
        EvalErrorKind::IntegerOverflow { ref operation, .. } if operation == "+"
    ));
}

#[test]
fn failed_execution_leaves_the_interpreter_usable() {
    let seen = Rc::new(Cell::new(0u64));
    let log = Rc::clone(&seen);
    let interpreter = Interpreter::builder()
        .step_hook(move |ctx: &StepContext| {
            log.set(ctx.steps);
            Ok(())
        })
        .build();
    let mut program = Program::with(interpreter);
    let nil = program.arena.nil();
    let unwrap = program.arena.alloc_expr(ExprKind::ForceUnwrap(nil), Span::DUMMY);
    let (one, two) = (program.arena.int(1), program.arena.int(2));
    let sum = program.arena.binary(BinaryOp::Add, one, two);
    let (mut interpreter, arena) = program.finish(&[]);

    let err = interpreter.evaluate(&arena, unwrap).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::ForceUnwrapNone);
    assert_eq!(interpreter.evaluate(&arena, sum).ok(), Some(Value::Int(3)));
    assert_eq!(seen.get(), interpreter.steps());
}

proptest::proptest! {
    #[test]
    fn addition_overflow_matches_checked_add(
        a in proptest::num::i64::ANY,
        b in proptest::num::i64::ANY
    ) {
        let mut program = Program::new();
        let (left, right) = (program.arena.int(a), program.arena.int(b));
        let sum = program.arena.binary(BinaryOp::Add, left, right);
        let result = program.evaluate(sum).map_err(|err| err.kind);
        match a.checked_add(b) {
            Some(expected) => {
                proptest::prop_assert_eq!(result, Ok(Value::Int(expected)));
            }
            None => {
                proptest::prop_assert!(matches!(
                    result,
                    Err(EvalErrorKind::IntegerOverflow { .. })
                ), "expected IntegerOverflow, got {:?}", result);
            }
        }
    }
}
