//! Statement AST nodes

use super::{Decl, Expr};

/// Statement kinds. Nodes carry no source spans: the external parser owns
/// concrete syntax, this core starts at the bare tree.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Declaration statement (top-level or local)
    Decl(Decl),

    /// Expression statement: `f(x);`
    Expr(Expr),

    /// Braced block with its own scope
    Block(Vec<Stmt>),

    /// `if (cond) then else alt`
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while (cond) body`
    While { condition: Expr, body: Box<Stmt> },

    /// `return;` or `return expr;`
    Return(Option<Expr>),
}
