//! Intermediate representation handed from the Vault front end to the evaluator.
//!
//! - [`Name`] and [`StringInterner`]: interned identifiers
//! - [`Span`]: source locations
//! - [`StaticType`]: types resolved by the checker
//! - [`ExprArena`]: flat AST with id-based references

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-copied types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod arena;
pub mod ast;
mod interner;
mod name;
mod span;
mod types;

pub use arena::{ExprArena, SharedArena};
pub use ast::{
    BinaryOp, CompositeKind, EntryRange, Expr, ExprId, ExprKind, ExprRange, FieldInit,
    FieldRange, FunctionDecl, FunctionId, MapEntry, Param, Stmt, StmtId, StmtKind, StmtRange,
    UnaryOp,
};
pub use interner::{InternError, SharedInterner, StringInterner, StringLookup};
pub use name::Name;
pub use span::{Span, SpanError};
pub use types::{FunctionType, StaticType};

static_assert_size!(Name, 4);
static_assert_size!(Span, 8);
static_assert_size!(ExprId, 4);
