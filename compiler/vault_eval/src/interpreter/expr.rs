//! Expression evaluation.
//!
//! Every expression is one `More` step. Sub-expressions are evaluated by
//! returning their trampolines chained with continuations, never by calling
//! back into this module on the native stack.
//!
//! # Transfer Sites
//!
//! Let initializers, assignment values, call arguments, container literal
//! elements, composite field initializers and `Some(..)` payloads go
//! through [`eval_transfer`]: `<-e` moves, anything else is copied.
//!
//! A list of transfer sites (literal elements, call arguments) spans many
//! steps. While one is open, `<-x` only reserves `x`: the value flows on but
//! the variable stays bound until the list lands, when every reserved move
//! is taken in the step that builds the destination. Aborting in between
//! drops the open lists and leaves the sources untouched.

use std::rc::Rc;

use vault_ir::{BinaryOp, CompositeKind, ExprId, ExprKind, FunctionId, Name, SharedArena, Span};

use super::operators::{evaluate_binary, evaluate_unary};
use super::Interpreter;
use crate::activation::{Activation, Binding, Variable};
use crate::errors::{
    force_unwrap_none, index_out_of_bounds, resource_moved, type_mismatch, undefined_field,
    undefined_variable, unreachable, EvalResult,
};
use crate::function::FunctionValue;
use crate::trampoline::Trampoline;
use crate::value::{Address, CompositeValue, DictionaryValue, Int256, Value};

/// Where an expression evaluates: its arena and the activation in scope.
#[derive(Clone)]
pub(crate) struct Context {
    pub(crate) arena: SharedArena,
    pub(crate) activation: Activation,
}

impl Context {
    pub(crate) fn new(arena: SharedArena, activation: Activation) -> Self {
        Self { arena, activation }
    }

    /// Same arena, `name` bound to a fresh variable holding `value`.
    #[must_use]
    pub(crate) fn bind(&self, name: Name, value: Value) -> Self {
        Self {
            arena: Rc::clone(&self.arena),
            activation: self.activation.extend(name, value),
        }
    }
}

/// Continuation receiving the values of a list of transfer sites.
pub(super) type Collected = Box<dyn FnOnce(&mut Interpreter, Vec<Value>) -> EvalResult<Trampoline>>;

/// A `<-x` made while a transfer list was open.
pub(crate) struct PendingMove {
    variable: Variable,
    name: Name,
    span: Span,
}

/// Moves reserved by the transfer list open at call depth `depth`.
pub(crate) struct TransferScope {
    depth: usize,
    moves: Vec<PendingMove>,
}

/// Where the values of a transfer list go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Landing {
    /// A container literal. Its moves join an enclosing list at the same
    /// call depth, since the container itself is still in flight.
    Container,
    /// Call arguments. Moves commit before the callee runs.
    Call,
}

/// Defer evaluation of `id`.
pub(super) fn eval_expr(ctx: Context, id: ExprId) -> Trampoline {
    Trampoline::more(move |interpreter| step_expr(interpreter, ctx, id))
}

/// Evaluate `id` at a transfer site: move if it is `<-e`, copy otherwise.
pub(super) fn eval_transfer(ctx: Context, id: ExprId) -> Trampoline {
    let (span, moved) = {
        let expr = ctx.arena.expr(id);
        match expr.kind {
            ExprKind::Move(operand) => (expr.span, Some(operand)),
            _ => (expr.span, None),
        }
    };
    if let Some(operand) = moved {
        return eval_move(ctx, operand);
    }
    eval_expr(ctx, id).then(move |_, value| {
        value
            .copy()
            .map(Trampoline::Done)
            .map_err(|err| err.with_span(span))
    })
}

/// Evaluate `<-operand`. A moved identifier is emptied in the same step,
/// or reserved if a transfer list is open.
pub(super) fn eval_move(ctx: Context, operand: ExprId) -> Trampoline {
    let (span, ident) = {
        let expr = ctx.arena.expr(operand);
        match expr.kind {
            ExprKind::Ident(name) => (expr.span, Some(name)),
            _ => (expr.span, None),
        }
    };
    let Some(name) = ident else {
        return eval_expr(ctx, operand);
    };
    Trampoline::more(move |interpreter| {
        interpreter.count_expression();
        move_variable(interpreter, &ctx.activation, name, span)
            .map(Trampoline::Done)
            .map_err(|err| err.with_span(span))
    })
}

/// Evaluate the transfer sites `ids` left to right, then hand the values to
/// `k` in the step that lands the list's moves.
fn eval_transfers(
    interpreter: &mut Interpreter,
    ctx: Context,
    ids: Rc<[ExprId]>,
    landing: Landing,
    k: Collected,
) -> EvalResult<Trampoline> {
    let depth = interpreter.call_depth();
    interpreter.transfers.push(TransferScope {
        depth,
        moves: Vec::new(),
    });
    collect_transfers(interpreter, ctx, ids, Vec::new(), landing, k)
}

/// The chain re-enters through the driver, so pending frames stay constant
/// however long the list is.
fn collect_transfers(
    interpreter: &mut Interpreter,
    ctx: Context,
    ids: Rc<[ExprId]>,
    mut acc: Vec<Value>,
    landing: Landing,
    k: Collected,
) -> EvalResult<Trampoline> {
    let Some(&id) = ids.get(acc.len()) else {
        land_transfers(interpreter, landing)?;
        return k(interpreter, acc);
    };
    let next = ctx.clone();
    Ok(eval_transfer(ctx, id).then(move |interpreter, value| {
        acc.push(value);
        collect_transfers(interpreter, next, ids, acc, landing, k)
    }))
}

/// Close the innermost transfer list.
fn land_transfers(interpreter: &mut Interpreter, landing: Landing) -> EvalResult<()> {
    let Some(scope) = interpreter.transfers.pop() else {
        return Err(unreachable("transfer list closed twice"));
    };
    let depth = scope.depth;
    if landing == Landing::Container {
        let parent = interpreter
            .transfers
            .last_mut()
            .filter(|parent| parent.depth == depth);
        if let Some(parent) = parent {
            parent.moves.extend(scope.moves);
            return Ok(());
        }
    }
    commit_moves(interpreter, scope.moves)
}

/// Take every reserved move at once. Nothing is taken if any source was
/// emptied meanwhile or reserved twice.
fn commit_moves(interpreter: &Interpreter, moves: Vec<PendingMove>) -> EvalResult<()> {
    for (i, pending) in moves.iter().enumerate() {
        let repeated = moves[..i]
            .iter()
            .any(|earlier| earlier.variable.ptr_eq(&pending.variable));
        if repeated || pending.variable.get().is_none() {
            return Err(resource_moved(interpreter.interner.lookup(pending.name))
                .with_span(pending.span));
        }
    }
    for pending in moves {
        let _ = pending.variable.take();
    }
    Ok(())
}

fn step_expr(interpreter: &mut Interpreter, ctx: Context, id: ExprId) -> EvalResult<Trampoline> {
    interpreter.count_expression();
    let expr = ctx.arena.expr(id);
    let span = expr.span;
    let result = match &expr.kind {
        ExprKind::Bool(b) => Ok(Trampoline::Done(Value::Bool(*b))),
        ExprKind::Int(n) => Ok(Trampoline::Done(Value::Int(*n))),
        ExprKind::UInt64(n) => Ok(Trampoline::Done(Value::UInt64(*n))),
        ExprKind::Int256(n) => Ok(Trampoline::Done(Value::Int256(Int256::from(*n)))),
        ExprKind::Str(name) => Ok(Trampoline::Done(Value::string(
            interpreter.interner.lookup(*name),
        ))),
        ExprKind::Nil => Ok(Trampoline::Done(Value::None)),
        ExprKind::Address(raw) => Ok(Trampoline::Done(Value::Address(Address::from_u64(*raw)))),
        ExprKind::Ident(name) => {
            read_variable(interpreter, &ctx.activation, *name).map(Trampoline::Done)
        }
        ExprKind::Move(operand) => Ok(eval_move(ctx.clone(), *operand)),
        ExprKind::Unary { op, operand } => {
            let op = *op;
            Ok(eval_expr(ctx.clone(), *operand).then(move |_, value| {
                evaluate_unary(op, value)
                    .map(Trampoline::Done)
                    .map_err(|err| err.with_span(span))
            }))
        }
        ExprKind::Binary { op, left, right } => Ok(eval_binary(&ctx, *op, *left, *right, span)),
        ExprKind::Some(inner) => Ok(eval_transfer(ctx.clone(), *inner).map(Value::some)),
        ExprKind::ForceUnwrap(inner) => Ok(eval_expr(ctx.clone(), *inner).then(move |_, value| {
            match value {
                Value::Some(inner) => Ok(Trampoline::Done(inner.into_value())),
                Value::None => Err(force_unwrap_none().with_span(span)),
                other => Err(type_mismatch("Optional", other.type_name()).with_span(span)),
            }
        })),
        ExprKind::Array(range) => {
            let ids: Rc<[ExprId]> = Rc::from(ctx.arena.expr_list(*range));
            let k: Collected = Box::new(|_, values| Ok(Trampoline::Done(Value::array(values))));
            eval_transfers(interpreter, ctx.clone(), ids, Landing::Container, k)
        }
        ExprKind::Dictionary(range) => {
            let ids: Rc<[ExprId]> = ctx
                .arena
                .entries(*range)
                .iter()
                .flat_map(|entry| [entry.key, entry.value])
                .collect();
            let k: Collected = Box::new(move |_, values| {
                let mut values = values.into_iter();
                let mut pairs = Vec::with_capacity(values.len() / 2);
                while let (Some(key), Some(value)) = (values.next(), values.next()) {
                    pairs.push((key, value));
                }
                DictionaryValue::from_entries(pairs)
                    .map(|dict| Trampoline::Done(Value::Dictionary(dict)))
                    .map_err(|err| err.with_span(span))
            });
            eval_transfers(interpreter, ctx.clone(), ids, Landing::Container, k)
        }
        ExprKind::Composite {
            type_name,
            kind,
            fields,
        } => {
            let inits = ctx.arena.fields(*fields);
            let names: Vec<Name> = inits.iter().map(|init| init.name).collect();
            let ids: Rc<[ExprId]> = inits.iter().map(|init| init.value).collect();
            let (type_name, kind) = (*type_name, *kind);
            let k: Collected = Box::new(move |_, values| {
                Ok(Trampoline::Done(construct(type_name, kind, names, values)))
            });
            eval_transfers(interpreter, ctx.clone(), ids, Landing::Container, k)
        }
        ExprKind::Field { receiver, field } => {
            let field = *field;
            Ok(eval_expr(ctx.clone(), *receiver).then(move |interpreter, value| {
                read_field(interpreter, &value, field)
                    .map(Trampoline::Done)
                    .map_err(|err| err.with_span(span))
            }))
        }
        ExprKind::Index { receiver, index } => {
            let index = *index;
            let inner = ctx.clone();
            Ok(eval_expr(ctx.clone(), *receiver).then(move |_, receiver| {
                Ok(eval_expr(inner, index).then(move |_, index| {
                    read_index(&receiver, &index)
                        .map(Trampoline::Done)
                        .map_err(|err| err.with_span(span))
                }))
            }))
        }
        ExprKind::Call {
            callee,
            args,
            arg_types,
        } => {
            let ids: Rc<[ExprId]> = Rc::from(ctx.arena.expr_list(*args));
            let arg_types = arg_types.to_vec();
            let inner = ctx.clone();
            Ok(eval_expr(ctx.clone(), *callee).then(move |interpreter, callee| {
                let k: Collected = Box::new(move |interpreter, arguments| {
                    let function = match callee {
                        Value::Function(function) => function,
                        other => {
                            return Err(type_mismatch("Function", other.type_name()).with_span(span))
                        }
                    };
                    interpreter.invoke(&function, arguments, arg_types, span)
                });
                eval_transfers(interpreter, inner, ids, Landing::Call, k)
            }))
        }
        ExprKind::Function(decl) => Ok(Trampoline::Done(close_over(&ctx, *decl))),
    };
    result.map_err(|err| err.with_span(span))
}

/// `&&`, `||` and `??` evaluate the right operand only when needed.
fn eval_binary(ctx: &Context, op: BinaryOp, left: ExprId, right: ExprId, span: Span) -> Trampoline {
    let rhs = ctx.clone();
    eval_expr(ctx.clone(), left).then(move |_, left| match op {
        BinaryOp::And | BinaryOp::Or => {
            let short = left.as_bool().map_err(|err| err.with_span(span))?;
            if short == (op == BinaryOp::Or) {
                return Ok(Trampoline::Done(Value::Bool(short)));
            }
            Ok(eval_expr(rhs, right).then(move |_, right| {
                right
                    .as_bool()
                    .map(|b| Trampoline::Done(Value::Bool(b)))
                    .map_err(|err| err.with_span(span))
            }))
        }
        BinaryOp::Coalesce => match left {
            Value::Some(inner) => Ok(Trampoline::Done(inner.into_value())),
            Value::None => Ok(eval_expr(rhs, right)),
            other => Err(type_mismatch("Optional", other.type_name()).with_span(span)),
        },
        _ => Ok(eval_expr(rhs, right).then(move |_, right| {
            evaluate_binary(op, left, right)
                .map(Trampoline::Done)
                .map_err(|err| err.with_span(span))
        })),
    })
}

fn construct(type_name: Name, kind: CompositeKind, names: Vec<Name>, values: Vec<Value>) -> Value {
    Value::Composite(CompositeValue::new(
        type_name,
        kind,
        names.into_iter().zip(values),
    ))
}

fn close_over(ctx: &Context, decl: FunctionId) -> Value {
    Value::Function(FunctionValue::interpreted(
        Rc::clone(&ctx.arena),
        decl,
        ctx.activation.clone(),
    ))
}

/// Read a variable without transferring it. Containers alias.
fn read_variable(interpreter: &Interpreter, activation: &Activation, name: Name) -> EvalResult {
    let Some(variable) = interpreter.lookup_variable(activation, name) else {
        return Err(undefined_variable(interpreter.interner.lookup(name)));
    };
    bound_value(interpreter, &variable, name)
}

fn bound_value(interpreter: &Interpreter, variable: &Variable, name: Name) -> EvalResult {
    match variable.binding() {
        Binding::Value(value) => Ok(value),
        Binding::Moved => Err(resource_moved(interpreter.interner.lookup(name))),
        Binding::Uninitialized => Err(undefined_variable(interpreter.interner.lookup(name))),
    }
}

/// `<-name`. Reserved when a transfer list is open at this call depth,
/// taken on the spot otherwise.
fn move_variable(
    interpreter: &mut Interpreter,
    activation: &Activation,
    name: Name,
    span: Span,
) -> EvalResult {
    let depth = interpreter.call_depth();
    let reserving = interpreter
        .transfers
        .last()
        .is_some_and(|scope| scope.depth == depth);
    if !reserving {
        return take_variable(interpreter, activation, name);
    }
    let Some(variable) = interpreter.lookup_variable(activation, name) else {
        return Err(undefined_variable(interpreter.interner.lookup(name)));
    };
    let value = bound_value(interpreter, &variable, name)?;
    if let Some(scope) = interpreter.transfers.last_mut() {
        scope.moves.push(PendingMove {
            variable,
            name,
            span,
        });
    }
    Ok(value)
}

/// Move a variable's value out, leaving it `Moved`.
fn take_variable(interpreter: &Interpreter, activation: &Activation, name: Name) -> EvalResult {
    let Some(variable) = interpreter.lookup_variable(activation, name) else {
        return Err(undefined_variable(interpreter.interner.lookup(name)));
    };
    match variable.take() {
        Ok(value) => Ok(value),
        Err(Binding::Moved) => Err(resource_moved(interpreter.interner.lookup(name))),
        Err(_) => Err(undefined_variable(interpreter.interner.lookup(name))),
    }
}

pub(super) fn read_field(interpreter: &Interpreter, receiver: &Value, field: Name) -> EvalResult {
    let found = match receiver {
        Value::Composite(composite) => composite.get_field(field),
        Value::Function(function) => function.get_member(field)?,
        other => return Err(type_mismatch("Composite", other.type_name())),
    };
    found.ok_or_else(|| {
        undefined_field(receiver.type_name(), interpreter.interner.lookup(field))
    })
}

/// Array indexing is bounds-checked. Dictionary indexing yields an optional.
pub(super) fn read_index(receiver: &Value, index: &Value) -> EvalResult {
    match receiver {
        Value::Array(_) if !matches!(index, Value::Int(_) | Value::UInt64(_)) => {
            Err(type_mismatch("Int", index.type_name()))
        }
        Value::Array(array) => {
            let element = array_position(index, array.len()).and_then(|i| array.get(i));
            element.ok_or_else(|| index_out_of_bounds(index, array.len()))
        }
        Value::Dictionary(dict) => Ok(match dict.get(index)? {
            Some(value) => Value::some(value),
            None => Value::None,
        }),
        other => Err(type_mismatch("Array or Dictionary", other.type_name())),
    }
}

/// Convert an index value to an in-bounds position.
pub(super) fn array_position(index: &Value, len: usize) -> Option<usize> {
    let position = match index {
        Value::Int(n) => usize::try_from(*n).ok()?,
        Value::UInt64(n) => usize::try_from(*n).ok()?,
        _ => return None,
    };
    (position < len).then_some(position)
}
