//! Declaration AST nodes

use super::{Expr, QualifiedName, Stmt};
use crate::types::Ty;

/// Handle to a declaration record in the program's [`DeclTable`].
///
/// AST nodes never own declaration metadata; a symbol reference carries one
/// of these as its non-owning back-reference.
///
/// [`DeclTable`]: crate::sema::DeclTable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declaration node
#[derive(Debug, Clone)]
pub struct Decl {
    /// Local short name.
    pub name: String,
    pub kind: DeclKind,
    /// Assigned by the symbol pass; set exactly once.
    pub id: Option<DeclId>,
    /// Assigned during predeclaration for top-level declarations.
    pub qualified: Option<QualifiedName>,
}

impl Decl {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            kind,
            id: None,
            qualified: None,
        }
    }
}

/// Declaration kinds
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// Variable declaration: `var x: int = 5;`
    Variable(VarDecl),

    /// Function declaration or definition
    Function(FuncDecl),

    /// Class declaration: `class Foo { ... }`
    Class(ClassDecl),
}

/// Variable declaration
#[derive(Debug, Clone)]
pub struct VarDecl {
    /// Type annotation, when written. A type annotation is an ordinary
    /// expression: a symbol denoting a builtin type or class, or a deref
    /// node denoting a pointer to the inner denoted type.
    pub ty_expr: Option<Expr>,
    pub init: Option<Expr>,
    /// Type of this variable (filled in during type checking)
    pub ty: Option<Ty>,
}

impl VarDecl {
    pub fn new(ty_expr: Option<Expr>, init: Option<Expr>) -> Self {
        Self {
            ty_expr,
            init,
            ty: None,
        }
    }
}

/// Function declaration or definition
#[derive(Debug, Clone)]
pub struct FuncDecl {
    /// Return type annotation; `None` means void.
    pub ret_ty_expr: Option<Expr>,
    pub params: Vec<Param>,
    pub variadic: bool,
    /// `None` marks an external declaration without a body.
    pub body: Option<Vec<Stmt>>,
    /// Function type (filled in during type checking)
    pub ty: Option<Ty>,
}

impl FuncDecl {
    pub fn new(ret_ty_expr: Option<Expr>, params: Vec<Param>, body: Option<Vec<Stmt>>) -> Self {
        Self {
            ret_ty_expr,
            params,
            variadic: false,
            body,
            ty: None,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty_expr: Expr,
    pub id: Option<DeclId>,
    pub ty: Option<Ty>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty_expr: Expr) -> Self {
        Self {
            name: name.into(),
            ty_expr,
            id: None,
            ty: None,
        }
    }
}

/// Class declaration
#[derive(Debug, Clone)]
pub struct ClassDecl {
    /// Members in declaration order; the order fixes instance field indices.
    pub members: Vec<Member>,
}

/// Class member
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub ty_expr: Expr,
    /// Static members live in module storage and are accessed through the
    /// type name; instance members index the object layout.
    pub is_static: bool,
    pub id: Option<DeclId>,
    pub ty: Option<Ty>,
}

impl Member {
    pub fn new(name: impl Into<String>, ty_expr: Expr) -> Self {
        Self {
            name: name.into(),
            ty_expr,
            is_static: false,
            id: None,
            ty: None,
        }
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }
}
