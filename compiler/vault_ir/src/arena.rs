//! Arena holding every node of one program.
//!
//! The front end fills an `ExprArena` and freezes it behind an `Rc` so that
//! function values can keep their declaration alive after the caller's
//! evaluation context is gone.

use std::rc::Rc;

use crate::ast::{
    BinaryOp, CompositeKind, EntryRange, Expr, ExprId, ExprKind, ExprRange, FieldInit,
    FieldRange, FunctionDecl, FunctionId, MapEntry, Stmt, StmtId, StmtKind, StmtRange, UnaryOp,
};
use crate::types::StaticType;
use crate::{Name, Span};

/// Arena shared by all function values created from the same program.
pub type SharedArena = Rc<ExprArena>;

/// Flat storage for expressions, statements and function declarations.
#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    expr_lists: Vec<ExprId>,
    stmt_lists: Vec<StmtId>,
    entries: Vec<MapEntry>,
    fields: Vec<FieldInit>,
    functions: Vec<FunctionDecl>,
}

/// Convert an arena length to a `u32` index.
///
/// # Panics
/// Panics if the arena holds more than `u32::MAX` items of one kind.
#[inline]
fn to_u32(len: usize, what: &str) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("{what} arena exceeded u32::MAX entries"))
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the arena for sharing with function values.
    pub fn into_shared(self) -> SharedArena {
        Rc::new(self)
    }

    // Allocation

    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::new(to_u32(self.exprs.len(), "expression"));
        self.exprs.push(Expr { kind, span });
        id
    }

    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId::new(to_u32(self.stmts.len(), "statement"));
        self.stmts.push(Stmt { kind, span });
        id
    }

    pub fn alloc_expr_list(&mut self, ids: impl IntoIterator<Item = ExprId>) -> ExprRange {
        let start = to_u32(self.expr_lists.len(), "expression list");
        self.expr_lists.extend(ids);
        let end = to_u32(self.expr_lists.len(), "expression list");
        ExprRange::new(start, end - start)
    }

    pub fn alloc_stmt_list(&mut self, ids: impl IntoIterator<Item = StmtId>) -> StmtRange {
        let start = to_u32(self.stmt_lists.len(), "statement list");
        self.stmt_lists.extend(ids);
        let end = to_u32(self.stmt_lists.len(), "statement list");
        StmtRange::new(start, end - start)
    }

    pub fn alloc_entries(&mut self, entries: impl IntoIterator<Item = MapEntry>) -> EntryRange {
        let start = to_u32(self.entries.len(), "entry");
        self.entries.extend(entries);
        let end = to_u32(self.entries.len(), "entry");
        EntryRange::new(start, end - start)
    }

    pub fn alloc_fields(&mut self, fields: impl IntoIterator<Item = FieldInit>) -> FieldRange {
        let start = to_u32(self.fields.len(), "field");
        self.fields.extend(fields);
        let end = to_u32(self.fields.len(), "field");
        FieldRange::new(start, end - start)
    }

    pub fn alloc_function(&mut self, decl: FunctionDecl) -> FunctionId {
        let id = FunctionId::new(to_u32(self.functions.len(), "function"));
        self.functions.push(decl);
        id
    }

    // Access

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn expr_list(&self, range: ExprRange) -> &[ExprId] {
        &self.expr_lists[range.as_range()]
    }

    #[inline]
    pub fn stmt_list(&self, range: StmtRange) -> &[StmtId] {
        &self.stmt_lists[range.as_range()]
    }

    #[inline]
    pub fn entries(&self, range: EntryRange) -> &[MapEntry] {
        &self.entries[range.as_range()]
    }

    #[inline]
    pub fn fields(&self, range: FieldRange) -> &[FieldInit] {
        &self.fields[range.as_range()]
    }

    #[inline]
    pub fn function(&self, id: FunctionId) -> &FunctionDecl {
        &self.functions[id.index()]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    // Construction helpers for hosts and tests that build programs directly.
    // All use `Span::DUMMY`.

    pub fn int(&mut self, value: i64) -> ExprId {
        self.alloc_expr(ExprKind::Int(value), Span::DUMMY)
    }

    pub fn bool(&mut self, value: bool) -> ExprId {
        self.alloc_expr(ExprKind::Bool(value), Span::DUMMY)
    }

    pub fn str(&mut self, value: Name) -> ExprId {
        self.alloc_expr(ExprKind::Str(value), Span::DUMMY)
    }

    pub fn nil(&mut self) -> ExprId {
        self.alloc_expr(ExprKind::Nil, Span::DUMMY)
    }

    pub fn ident(&mut self, name: Name) -> ExprId {
        self.alloc_expr(ExprKind::Ident(name), Span::DUMMY)
    }

    pub fn move_of(&mut self, operand: ExprId) -> ExprId {
        self.alloc_expr(ExprKind::Move(operand), Span::DUMMY)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.alloc_expr(ExprKind::Unary { op, operand }, Span::DUMMY)
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.alloc_expr(ExprKind::Binary { op, left, right }, Span::DUMMY)
    }

    pub fn some(&mut self, inner: ExprId) -> ExprId {
        self.alloc_expr(ExprKind::Some(inner), Span::DUMMY)
    }

    pub fn array(&mut self, elements: impl IntoIterator<Item = ExprId>) -> ExprId {
        let range = self.alloc_expr_list(elements);
        self.alloc_expr(ExprKind::Array(range), Span::DUMMY)
    }

    pub fn dictionary(&mut self, entries: impl IntoIterator<Item = (ExprId, ExprId)>) -> ExprId {
        let range = self.alloc_entries(
            entries
                .into_iter()
                .map(|(key, value)| MapEntry { key, value }),
        );
        self.alloc_expr(ExprKind::Dictionary(range), Span::DUMMY)
    }

    pub fn composite(
        &mut self,
        type_name: Name,
        kind: CompositeKind,
        fields: impl IntoIterator<Item = (Name, ExprId)>,
    ) -> ExprId {
        let fields = self.alloc_fields(
            fields
                .into_iter()
                .map(|(name, value)| FieldInit { name, value }),
        );
        self.alloc_expr(
            ExprKind::Composite {
                type_name,
                kind,
                fields,
            },
            Span::DUMMY,
        )
    }

    pub fn field(&mut self, receiver: ExprId, field: Name) -> ExprId {
        self.alloc_expr(ExprKind::Field { receiver, field }, Span::DUMMY)
    }

    pub fn index(&mut self, receiver: ExprId, index: ExprId) -> ExprId {
        self.alloc_expr(ExprKind::Index { receiver, index }, Span::DUMMY)
    }

    /// Call with every argument typed `Any`.
    pub fn call(&mut self, callee: ExprId, args: impl IntoIterator<Item = ExprId>) -> ExprId {
        let args = self.alloc_expr_list(args);
        let arg_types = vec![StaticType::Any; args.len()].into_boxed_slice();
        self.alloc_expr(
            ExprKind::Call {
                callee,
                args,
                arg_types,
            },
            Span::DUMMY,
        )
    }

    pub fn push_stmt(&mut self, kind: StmtKind) -> StmtId {
        self.alloc_stmt(kind, Span::DUMMY)
    }

    pub fn block(&mut self, stmts: impl IntoIterator<Item = StmtId>) -> StmtRange {
        self.alloc_stmt_list(stmts)
    }
}
