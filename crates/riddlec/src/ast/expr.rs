//! Expression AST nodes

use std::fmt;

use super::{DeclId, QualifiedName};
use crate::types::Ty;

/// Expression node
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    /// Type of this expression (filled in during type checking)
    pub ty: Option<Ty>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, ty: None }
    }

    /// Unqualified or qualified symbol reference.
    pub fn symbol(name: impl Into<QualifiedName>) -> Self {
        Self::new(ExprKind::Symbol {
            name: name.into(),
            binding: None,
        })
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::IntLiteral(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ExprKind::BoolLiteral(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExprKind::StringLiteral(value.into()))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    pub fn member(parent: Expr, member: impl Into<String>) -> Self {
        Self::new(ExprKind::Member {
            parent: Box::new(parent),
            member: member.into(),
            binding: None,
        })
    }

    pub fn addr_of(operand: Expr) -> Self {
        Self::new(ExprKind::AddrOf(Box::new(operand)))
    }

    pub fn deref(operand: Expr) -> Self {
        Self::new(ExprKind::Deref(Box::new(operand)))
    }
}

/// Expression kinds
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal: 42
    IntLiteral(i64),

    /// Boolean literal: true, false
    BoolLiteral(bool),

    /// String literal: "hello"
    StringLiteral(String),

    /// Symbol reference: `x` or `pkg::item`
    Symbol {
        name: QualifiedName,
        /// Declaration this reference binds to (filled in during resolution)
        binding: Option<DeclId>,
    },

    /// Binary operation: a + b
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function call: f(a, b)
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Member access: obj.field or Type.field
    Member {
        parent: Box<Expr>,
        member: String,
        /// Member declaration (filled in during type checking)
        binding: Option<DeclId>,
    },

    /// Address-of: &x
    AddrOf(Box<Expr>),

    /// Dereference: *p
    Deref(Box<Expr>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogAnd,
    LogOr,
    Assign,
}

impl BinaryOp {
    /// Relational and equality operators yield a 1-bit boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::LogAnd | Self::LogOr)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
            Self::Assign => "=",
        };
        write!(f, "{sym}")
    }
}
