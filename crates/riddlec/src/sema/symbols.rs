//! Two-phase symbol pass: predeclaration and name resolution
//!
//! Phase 1 assigns qualified names and registers every top-level declaration
//! so forward references work within a unit, then derives the unit's export
//! table. Phase 2 walks bodies and binds every symbol reference. The driver
//! runs phase 1 for *all* units before phase 2 for *any*: an importer's
//! qualified lookups depend on its dependencies' completed export tables.

use std::collections::HashMap;

use super::decls::{DeclInfo, DeclTable, SymbolKind};
use super::scope::{Builtins, SymbolTable};
use crate::ast::{Decl, DeclId, DeclKind, Expr, ExprKind, QualifiedName, Stmt, Unit};
use crate::common::{CompileError, CompileResult};
use crate::types::Ty;

/// A package's public surface: short name to declaration.
pub type ExportTable = HashMap<String, DeclId>;

/// Export tables for every predeclared package.
#[derive(Debug, Default)]
pub struct ExportMap {
    tables: HashMap<QualifiedName, ExportTable>,
}

impl ExportMap {
    pub fn insert(&mut self, package: QualifiedName, table: ExportTable) {
        self.tables.insert(package, table);
    }

    pub fn get(&self, package: &QualifiedName) -> Option<&ExportTable> {
        self.tables.get(package)
    }
}

/// Phase 1: assign qualified names to every top-level declaration, register
/// them in the declaration table, and populate the unit's declaration map.
/// Duplicate short names fail here, before any body is resolved.
pub fn predeclare(
    unit: &mut Unit,
    decls: &mut DeclTable,
    builtins: &Builtins,
) -> CompileResult<()> {
    let mut table = SymbolTable::new(builtins);
    let package = unit.package.clone();

    for stmt in &mut unit.stmts {
        let Stmt::Decl(decl) = stmt else {
            continue;
        };
        let qualified = package.join(decl.name.as_str());
        let id = register_decl(decl, Some(qualified.clone()), decls);
        table.declare(&decl.name, id)?;
        unit.decls.insert(qualified, id);
    }
    Ok(())
}

/// Derive the unit's export table: the subset of its declaration map whose
/// qualified name is prefixed by the package name, keyed by short name.
pub fn exports_of(unit: &Unit) -> ExportTable {
    unit.decls
        .iter()
        .filter(|(qualified, _)| !qualified.is_empty() && qualified.starts_with(&unit.package))
        .filter_map(|(qualified, id)| qualified.last().map(|name| (name.to_string(), *id)))
        .collect()
}

/// Phase 2: walk the unit's bodies and bind every symbol reference.
pub fn resolve(
    unit: &mut Unit,
    decls: &mut DeclTable,
    builtins: &Builtins,
    exports: &ExportMap,
) -> CompileResult<()> {
    let mut resolver = Resolver {
        table: SymbolTable::new(builtins),
        decls,
        exports,
        package: unit.package.clone(),
        imports: unit.imports.iter().cloned().collect(),
    };

    // top-level declarations are visible before their point of use
    for stmt in &unit.stmts {
        if let Stmt::Decl(decl) = stmt {
            if let Some(id) = decl.id {
                resolver.table.declare(&decl.name, id)?;
            }
        }
    }

    for stmt in &mut unit.stmts {
        resolver.resolve_stmt(stmt)?;
    }
    Ok(())
}

/// Create the declaration-table record for an AST declaration and link the
/// node to it. Class members are registered alongside their class.
fn register_decl(
    decl: &mut Decl,
    qualified: Option<QualifiedName>,
    decls: &mut DeclTable,
) -> DeclId {
    let id = match &mut decl.kind {
        DeclKind::Variable(_) => decls.declare(DeclInfo {
            name: decl.name.clone(),
            qualified: qualified.clone(),
            kind: SymbolKind::Variable {
                is_global: qualified.is_some(),
                is_static: false,
            },
            ty: None,
        }),
        DeclKind::Function(func) => decls.declare(DeclInfo {
            name: decl.name.clone(),
            qualified: qualified.clone(),
            kind: SymbolKind::Function {
                variadic: func.variadic,
            },
            ty: None,
        }),
        DeclKind::Class(class) => {
            let class_name = qualified
                .clone()
                .unwrap_or_else(|| QualifiedName::single(decl.name.as_str()));
            let mut members = Vec::with_capacity(class.members.len());
            for member in &mut class.members {
                let member_id = decls.declare(DeclInfo {
                    name: member.name.clone(),
                    qualified: Some(class_name.join(member.name.as_str())),
                    kind: SymbolKind::Variable {
                        is_global: false,
                        is_static: member.is_static,
                    },
                    ty: None,
                });
                member.id = Some(member_id);
                members.push(member_id);
            }
            let class_id = decls.declare(DeclInfo {
                name: decl.name.clone(),
                qualified: qualified.clone(),
                kind: SymbolKind::Class { members },
                ty: None,
            });
            decls.set_ty(
                class_id,
                Ty::Class {
                    name: class_name,
                    decl: class_id,
                },
            );
            class_id
        }
    };

    decl.id = Some(id);
    decl.qualified = qualified;
    id
}

struct Resolver<'a> {
    table: SymbolTable,
    decls: &'a mut DeclTable,
    exports: &'a ExportMap,
    package: QualifiedName,
    imports: Vec<QualifiedName>,
}

impl Resolver<'_> {
    fn resolve_stmt(&mut self, stmt: &mut Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Decl(decl) => self.resolve_decl(decl),
            Stmt::Expr(expr) => self.resolve_expr(expr),
            Stmt::Block(body) => {
                self.table.push();
                for stmt in body {
                    self.resolve_stmt(stmt)?;
                }
                self.table.pop();
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.resolve_expr(value)?;
                }
                Ok(())
            }
        }
    }

    fn resolve_decl(&mut self, decl: &mut Decl) -> CompileResult<()> {
        // local declarations enter the active frame; top-level ones were
        // registered by the pre-pass
        if !self.table.is_global() {
            let id = match decl.id {
                Some(id) => id,
                None => register_decl(decl, None, self.decls),
            };
            self.table.declare(&decl.name, id)?;
        }

        match &mut decl.kind {
            DeclKind::Variable(var) => {
                if let Some(ty_expr) = &mut var.ty_expr {
                    self.resolve_expr(ty_expr)?;
                }
                if let Some(init) = &mut var.init {
                    self.resolve_expr(init)?;
                }
                Ok(())
            }
            DeclKind::Function(func) => {
                if let Some(ret) = &mut func.ret_ty_expr {
                    self.resolve_expr(ret)?;
                }
                for param in &mut func.params {
                    self.resolve_expr(&mut param.ty_expr)?;
                }
                if let Some(body) = &mut func.body {
                    self.table.push();
                    for param in &mut func.params {
                        let id = match param.id {
                            Some(id) => id,
                            None => {
                                let id = self.decls.declare(DeclInfo {
                                    name: param.name.clone(),
                                    qualified: None,
                                    kind: SymbolKind::Variable {
                                        is_global: false,
                                        is_static: false,
                                    },
                                    ty: None,
                                });
                                param.id = Some(id);
                                id
                            }
                        };
                        self.table.declare(&param.name, id)?;
                    }
                    for stmt in body {
                        self.resolve_stmt(stmt)?;
                    }
                    self.table.pop();
                }
                Ok(())
            }
            DeclKind::Class(class) => {
                for member in &mut class.members {
                    self.resolve_expr(&mut member.ty_expr)?;
                }
                Ok(())
            }
        }
    }

    fn resolve_expr(&mut self, expr: &mut Expr) -> CompileResult<()> {
        match &mut expr.kind {
            ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) | ExprKind::StringLiteral(_) => {
                Ok(())
            }
            ExprKind::Symbol { name, binding } => {
                let id = if name.len() == 1 {
                    let short = name.last().unwrap_or_default();
                    self.table
                        .lookup(short)
                        .ok_or_else(|| CompileError::UnresolvedSymbol(name.to_string()))?
                } else {
                    self.resolve_qualified(name)?
                };
                *binding = Some(id);
                Ok(())
            }
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)
            }
            ExprKind::Call { callee, args } => {
                self.resolve_expr(callee)?;
                for arg in args {
                    self.resolve_expr(arg)?;
                }
                Ok(())
            }
            // the member name itself resolves during type checking, against
            // the parent's class
            ExprKind::Member { parent, .. } => self.resolve_expr(parent),
            ExprKind::AddrOf(inner) | ExprKind::Deref(inner) => self.resolve_expr(inner),
        }
    }

    /// Resolve a qualified reference: pick the longest candidate package
    /// prefix (own package plus imports), then look up the single trailing
    /// segment in that package's export table.
    fn resolve_qualified(&self, name: &QualifiedName) -> CompileResult<DeclId> {
        let mut best: Option<&QualifiedName> = None;
        for package in std::iter::once(&self.package).chain(self.imports.iter()) {
            if package.len() >= name.len() {
                continue;
            }
            if name.starts_with(package) && best.is_none_or(|b| package.len() > b.len()) {
                best = Some(package);
            }
        }

        let Some(package) = best else {
            return Err(CompileError::UnresolvedSymbol(name.to_string()));
        };
        let Some(table) = self.exports.get(package) else {
            return Err(CompileError::UnresolvedSymbol(name.to_string()));
        };

        if name.len() - package.len() > 1 {
            return Err(CompileError::UnsupportedMemberPath(name.to_string()));
        }
        let member = name.last().unwrap_or_default();
        table
            .get(member)
            .copied()
            .ok_or_else(|| CompileError::UnknownExport {
                package: package.to_string(),
                name: member.to_string(),
            })
    }
}
