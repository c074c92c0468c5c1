//! Input contract: the bare AST produced by the external parser
//!
//! Node kinds are closed, tag-discriminated enums; missing cases in any
//! downstream match are compile errors rather than runtime surprises.
//! Units are created by the parser, mutated by the symbol pass (qualified
//! names, declaration map) and the type checker (type annotations), then
//! read-only for the IR builder.

mod decl;
mod expr;
mod name;
mod stmt;

pub use decl::{ClassDecl, Decl, DeclId, DeclKind, FuncDecl, Member, Param, VarDecl};
pub use expr::{BinaryOp, Expr, ExprKind};
pub use name::QualifiedName;
pub use stmt::Stmt;

use std::collections::{HashMap, HashSet};

/// One compilation unit: a package's worth of top-level statements.
#[derive(Debug, Clone)]
pub struct Unit {
    pub stmts: Vec<Stmt>,
    pub package: QualifiedName,
    /// Packages this unit imports.
    pub imports: HashSet<QualifiedName>,
    /// Declaration map, populated during predeclaration. The unit's export
    /// surface is derived from this map.
    pub decls: HashMap<QualifiedName, DeclId>,
}

impl Unit {
    pub fn new(stmts: Vec<Stmt>, package: QualifiedName) -> Self {
        Self {
            stmts,
            package,
            imports: HashSet::new(),
            decls: HashMap::new(),
        }
    }

    pub fn with_imports(mut self, imports: impl IntoIterator<Item = QualifiedName>) -> Self {
        self.imports.extend(imports);
        self
    }
}
