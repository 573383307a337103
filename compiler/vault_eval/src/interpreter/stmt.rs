//! Statement execution.
//!
//! A block runs its statements in order through [`exec_from`], which hands
//! the rest of the block to the driver as a continuation. `let` extends the
//! activation seen by the statements after it; bindings never escape their
//! block.

use std::rc::Rc;

use vault_ir::{ExprId, ExprKind, Span, StmtId, StmtKind, StmtRange};

use super::expr::{array_position, eval_expr, eval_move, eval_transfer, Context};
use super::Interpreter;
use crate::errors::{
    index_out_of_bounds, type_mismatch, undefined_variable, unreachable, EvalError, EvalResult,
};
use crate::trampoline::Trampoline;
use crate::value::Value;

/// Defer execution of `block`. Finishes with `Void` unless a `return`
/// unwinds past it.
pub(crate) fn exec_block(ctx: Context, block: StmtRange) -> Trampoline {
    let stmts: Rc<[StmtId]> = Rc::from(ctx.arena.stmt_list(block));
    Trampoline::more(move |interpreter| exec_from(interpreter, ctx, stmts, 0))
}

/// Execute `stmts[index..]`.
fn exec_from(
    interpreter: &mut Interpreter,
    ctx: Context,
    stmts: Rc<[StmtId]>,
    index: usize,
) -> EvalResult<Trampoline> {
    let Some(&id) = stmts.get(index) else {
        return Ok(Trampoline::Done(Value::Void));
    };
    interpreter.count_statement();
    let next = index.saturating_add(1);
    let stmt = ctx.arena.stmt(id);
    let span = stmt.span;

    if let StmtKind::Let { name, value } = stmt.kind {
        let scope = ctx.clone();
        return Ok(eval_transfer(ctx, value).then(move |interpreter, value| {
            exec_from(interpreter, scope.bind(name, value), stmts, next)
        }));
    }

    let current = step_stmt(&ctx, &stmt.kind, span)?;
    Ok(current.then(move |interpreter, _| exec_from(interpreter, ctx, stmts, next)))
}

/// Build the trampoline for one non-`let` statement.
fn step_stmt(ctx: &Context, kind: &StmtKind, span: Span) -> EvalResult<Trampoline> {
    match kind {
        StmtKind::Let { .. } => Err(unreachable("let is sequenced by exec_from")),
        StmtKind::Expr(expr) => Ok(eval_expr(ctx.clone(), *expr)),
        StmtKind::Return(None) => Err(EvalError::return_with(Value::Void)),
        StmtKind::Return(Some(expr)) => Ok(eval_expr(ctx.clone(), *expr)
            .then(|_, value| Err(EvalError::return_with(value)))),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let (then_branch, else_branch) = (*then_branch, *else_branch);
            let scope = ctx.clone();
            Ok(eval_expr(ctx.clone(), *cond).then(move |_, cond| {
                let taken = cond.as_bool().map_err(|err| err.with_span(span))?;
                Ok(exec_block(
                    scope,
                    if taken { then_branch } else { else_branch },
                ))
            }))
        }
        StmtKind::While { cond, body } => Ok(exec_while(ctx.clone(), *cond, *body, span)),
        StmtKind::Assign { target, value } => assign(ctx, *target, *value, span),
        StmtKind::Destroy(expr) => {
            // A destroyed variable is consumed like `destroy <-x`.
            let operand = if matches!(ctx.arena.expr(*expr).kind, ExprKind::Ident(_)) {
                eval_move(ctx.clone(), *expr)
            } else {
                eval_expr(ctx.clone(), *expr)
            };
            Ok(operand.then(move |_, value| {
                if !value.is_resource_kind() {
                    return Err(type_mismatch("Resource", value.type_name()).with_span(span));
                }
                value.set_owner(None);
                Ok(Trampoline::Done(Value::Void))
            }))
        }
    }
}

/// One iteration of `while`: test, run the body, then loop through the
/// driver.
fn exec_while(ctx: Context, cond: ExprId, body: StmtRange, span: Span) -> Trampoline {
    let scope = ctx.clone();
    eval_expr(ctx, cond).then(move |_, value| {
        if !value.as_bool().map_err(|err| err.with_span(span))? {
            return Ok(Trampoline::Done(Value::Void));
        }
        let again = scope.clone();
        Ok(exec_block(scope, body).then(move |_, _| Ok(exec_while(again, cond, body, span))))
    })
}

/// Assignment evaluates the target's sub-expressions, then the value.
fn assign(ctx: &Context, target: ExprId, value: ExprId, span: Span) -> EvalResult<Trampoline> {
    let scope = ctx.clone();
    match ctx.arena.expr(target).kind {
        ExprKind::Ident(name) => Ok(eval_transfer(ctx.clone(), value).then(
            move |interpreter, value| {
                let Some(variable) = interpreter.lookup_variable(&scope.activation, name) else {
                    return Err(
                        undefined_variable(interpreter.interner.lookup(name)).with_span(span)
                    );
                };
                variable.set(value);
                Ok(Trampoline::Done(Value::Void))
            },
        )),
        ExprKind::Field { receiver, field } => Ok(eval_expr(ctx.clone(), receiver).then(
            move |_, receiver| {
                Ok(eval_transfer(scope, value).then(move |_, value| {
                    match receiver {
                        Value::Composite(composite) => {
                            composite.set_field(field, value);
                        }
                        Value::Function(function) => function.set_member(field, value)?,
                        other => {
                            return Err(
                                type_mismatch("Composite", other.type_name()).with_span(span)
                            )
                        }
                    }
                    Ok(Trampoline::Done(Value::Void))
                }))
            },
        )),
        ExprKind::Index { receiver, index } => Ok(eval_expr(ctx.clone(), receiver).then(
            move |_, receiver| {
                let rest = scope.clone();
                Ok(eval_expr(scope, index).then(move |_, index| {
                    Ok(eval_transfer(rest, value).then(move |_, value| {
                        store_index(&receiver, index, value)
                            .map(|()| Trampoline::Done(Value::Void))
                            .map_err(|err| err.with_span(span))
                    }))
                }))
            },
        )),
        _ => Err(unreachable("invalid assignment target").with_span(span)),
    }
}

/// `receiver[index] = value`. Dictionary stores take an optional: `nil`
/// removes the entry.
fn store_index(receiver: &Value, index: Value, value: Value) -> EvalResult<()> {
    match receiver {
        Value::Array(array) => {
            let position = array_position(&index, array.len())
                .ok_or_else(|| index_out_of_bounds(&index, array.len()))?;
            array
                .set(position, value)
                .map(|_| ())
                .ok_or_else(|| index_out_of_bounds(&index, array.len()))
        }
        Value::Dictionary(dict) => dict.set(index, value),
        other => Err(type_mismatch("Array or Dictionary", other.type_name())),
    }
}
