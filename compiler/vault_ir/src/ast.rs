//! Flat AST consumed by the evaluator.
//!
//! Nodes live in an [`ExprArena`](crate::ExprArena) and refer to each other
//! through `u32` ids. Child lists are stored contiguously and addressed with
//! ranges, so no node owns a `Box<Expr>`.

use std::fmt;

use crate::types::{FunctionType, StaticType};
use crate::{Name, Span};

macro_rules! define_id {
    ($(#[$meta:meta])* $id:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash)]
        #[repr(transparent)]
        pub struct $id(u32);

        impl $id {
            /// Invalid id (sentinel value).
            pub const INVALID: $id = $id(u32::MAX);

            #[inline]
            pub const fn new(index: u32) -> Self {
                $id(index)
            }

            /// Index into the owning arena vector.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl fmt::Debug for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", stringify!($id), self.0)
                } else {
                    write!(f, "{}::INVALID", stringify!($id))
                }
            }
        }

        impl Default for $id {
            fn default() -> Self {
                Self::INVALID
            }
        }
    };
}

macro_rules! define_range {
    ($(#[$meta:meta])* $range:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
        pub struct $range {
            pub start: u32,
            pub len: u32,
        }

        impl $range {
            pub const EMPTY: $range = $range { start: 0, len: 0 };

            #[inline]
            pub const fn new(start: u32, len: u32) -> Self {
                $range { start, len }
            }

            #[inline]
            pub const fn is_empty(&self) -> bool {
                self.len == 0
            }

            #[inline]
            pub const fn len(&self) -> usize {
                self.len as usize
            }

            /// Backing slice range in the arena's list storage.
            #[inline]
            pub const fn as_range(&self) -> std::ops::Range<usize> {
                let start = self.start as usize;
                start..start + self.len as usize
            }
        }
    };
}

define_id!(
    /// Index into the expression arena.
    ExprId
);
define_id!(
    /// Index into the statement arena.
    StmtId
);
define_id!(
    /// Index into the function declaration table.
    FunctionId
);

define_range!(
    /// Range of expression ids in the flattened expression lists.
    ExprRange
);
define_range!(
    /// Range of statement ids in the flattened statement lists.
    StmtRange
);
define_range!(
    /// Range of dictionary literal entries.
    EntryRange
);
define_range!(
    /// Range of composite field initializers.
    FieldRange
);

/// Whether a composite has value or resource semantics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CompositeKind {
    /// Copied on transfer.
    Structure,
    /// Moved on transfer, at most one owner.
    Resource,
}

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,

    // Optional
    Coalesce,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Coalesce => "??",
        }
    }

    /// True for operators whose right operand may be skipped.
    pub const fn is_short_circuit(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Coalesce)
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

/// Expression node.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression variants.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Bool(bool),
    Int(i64),
    UInt64(u64),
    /// Wide integer literal. Literals beyond `i128` are built by arithmetic.
    Int256(i128),
    Str(Name),
    /// The `nil` literal.
    Nil,
    Address(u64),
    Ident(Name),
    /// `<-e`: transfer by move.
    Move(ExprId),
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    /// Wrap in an optional.
    Some(ExprId),
    /// `e!`
    ForceUnwrap(ExprId),
    Array(ExprRange),
    Dictionary(EntryRange),
    Composite {
        type_name: Name,
        kind: CompositeKind,
        fields: FieldRange,
    },
    Field {
        receiver: ExprId,
        field: Name,
    },
    Index {
        receiver: ExprId,
        index: ExprId,
    },
    Call {
        callee: ExprId,
        args: ExprRange,
        /// Static argument types as resolved by the checker.
        arg_types: Box<[StaticType]>,
    },
    /// Function expression; captures the current activation.
    Function(FunctionId),
}

/// Statement node.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Let {
        name: Name,
        value: ExprId,
    },
    /// Target is an identifier, field access, or index access.
    Assign {
        target: ExprId,
        value: ExprId,
    },
    Expr(ExprId),
    Return(Option<ExprId>),
    If {
        cond: ExprId,
        then_branch: StmtRange,
        else_branch: StmtRange,
    },
    While {
        cond: ExprId,
        body: StmtRange,
    },
    Destroy(ExprId),
}

/// Dictionary literal entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MapEntry {
    pub key: ExprId,
    pub value: ExprId,
}

/// Composite field initializer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldInit {
    pub name: Name,
    pub value: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Name,
    pub ty: StaticType,
}

/// Function declaration, shared by top-level functions and function expressions.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Name,
    pub params: Vec<Param>,
    pub body: StmtRange,
    pub ty: FunctionType,
    pub span: Span,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}
