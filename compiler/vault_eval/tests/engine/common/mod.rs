//! Program builder for engine tests.

use vault_eval::{EvalResult, Interpreter, Value};
use vault_ir::{
    CompositeKind, ExprArena, ExprId, FunctionDecl, FunctionId, FunctionType, Name, Param,
    SharedArena, Span, StaticType, StmtId, StmtKind, StmtRange,
};

/// An interpreter plus the arena a program is being built in.
pub struct Program {
    pub interpreter: Interpreter,
    pub arena: ExprArena,
}

impl Program {
    pub fn new() -> Self {
        Self::with(Interpreter::new())
    }

    pub fn with(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            arena: ExprArena::new(),
        }
    }

    pub fn name(&self, s: &str) -> Name {
        self.interpreter.interner().intern(s)
    }

    pub fn ident(&mut self, s: &str) -> ExprId {
        let name = self.name(s);
        self.arena.ident(name)
    }

    pub fn let_(&mut self, s: &str, value: ExprId) -> StmtId {
        let name = self.name(s);
        self.arena.push_stmt(StmtKind::Let { name, value })
    }

    pub fn ret(&mut self, value: ExprId) -> StmtId {
        self.arena.push_stmt(StmtKind::Return(Some(value)))
    }

    pub fn call(&mut self, callee: &str, args: Vec<ExprId>) -> ExprId {
        let callee = self.ident(callee);
        self.arena.call(callee, args)
    }

    pub fn resource(&mut self, ty: &str, fields: &[(&str, ExprId)]) -> ExprId {
        self.composite(ty, CompositeKind::Resource, fields)
    }

    pub fn structure(&mut self, ty: &str, fields: &[(&str, ExprId)]) -> ExprId {
        self.composite(ty, CompositeKind::Structure, fields)
    }

    fn composite(&mut self, ty: &str, kind: CompositeKind, fields: &[(&str, ExprId)]) -> ExprId {
        let type_name = self.name(ty);
        let fields: Vec<(Name, ExprId)> = fields
            .iter()
            .map(|(field, value)| (self.name(field), *value))
            .collect();
        self.arena.composite(type_name, kind, fields)
    }

    pub fn field(&mut self, receiver: ExprId, field: &str) -> ExprId {
        let field = self.name(field);
        self.arena.field(receiver, field)
    }

    /// Declare a function whose parameters and result are untyped.
    pub fn function(&mut self, name: &str, params: &[&str], body: Vec<StmtId>) -> FunctionId {
        let body = self.arena.block(body);
        let params: Vec<Param> = params
            .iter()
            .map(|param| Param {
                name: self.name(param),
                ty: StaticType::Any,
            })
            .collect();
        let ty = FunctionType::new(vec![StaticType::Any; params.len()], StaticType::Any);
        let name = self.name(name);
        self.arena.alloc_function(FunctionDecl {
            name,
            params,
            body,
            ty,
            span: Span::DUMMY,
        })
    }

    /// Freeze the arena, declaring `functions` as globals.
    pub fn finish(self, functions: &[FunctionId]) -> (Interpreter, SharedArena) {
        let Program {
            mut interpreter,
            arena,
        } = self;
        let arena = arena.into_shared();
        interpreter.declare_functions(&arena, functions);
        (interpreter, arena)
    }

    /// Run `stmts` as a top-level block.
    pub fn execute(mut self, stmts: Vec<StmtId>) -> (Interpreter, EvalResult) {
        let block: StmtRange = self.arena.block(stmts);
        let (mut interpreter, arena) = self.finish(&[]);
        let result = interpreter.execute(&arena, block);
        (interpreter, result)
    }

    pub fn evaluate(self, expr: ExprId) -> EvalResult {
        let (mut interpreter, arena) = self.finish(&[]);
        interpreter.evaluate(&arena, expr)
    }
}

pub fn int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        other => panic!("expected Int, got {other:?}"),
    }
}
