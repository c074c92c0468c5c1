//! Type checker: one forward walk per unit, annotating every declaration
//! and expression with a concrete type

use std::collections::HashMap;

use super::decls::{DeclTable, SymbolKind};
use crate::ast::{BinaryOp, Decl, DeclKind, Expr, ExprKind, Stmt, Unit};
use crate::common::{CompileError, CompileResult};
use crate::types::Ty;

/// The compatibility rule: identical for scalar types, pointers compare by
/// recursively compatible pointees. No implicit widening happens here —
/// numeric balancing is deferred to IR lowering.
pub fn compatible(found: &Ty, expected: &Ty) -> bool {
    match (found, expected) {
        (Ty::Pointer(a), Ty::Pointer(b)) => compatible(a, b),
        _ => found == expected,
    }
}

/// Type checker. Walks units in package-topological order, so a
/// dependency's declarations are typed before any importer looks at them.
pub struct TypeChecker<'a> {
    decls: &'a mut DeclTable,
    op_table: HashMap<(Ty, Ty, BinaryOp), Ty>,
    /// Declared return type of the function currently being checked.
    ret_ty: Option<Ty>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(decls: &'a mut DeclTable) -> Self {
        Self {
            decls,
            op_table: build_op_table(),
            ret_ty: None,
        }
    }

    pub fn check_unit(&mut self, unit: &mut Unit) -> CompileResult<()> {
        for stmt in &mut unit.stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Decl(decl) => self.check_decl(decl),
            Stmt::Expr(expr) => {
                self.check_expr(expr)?;
                Ok(())
            }
            Stmt::Block(body) => {
                for stmt in body {
                    self.check_stmt(stmt)?;
                }
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition)?;
                self.check_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => {
                self.check_condition(condition)?;
                self.check_stmt(body)
            }
            Stmt::Return(value) => {
                let Some(expected) = self.ret_ty.clone() else {
                    return Err(CompileError::semantic("'return' outside of a function"));
                };
                let found = match value {
                    Some(expr) => self.check_expr(expr)?,
                    None => Ty::Void,
                };
                if !compatible(&found, &expected) {
                    return Err(CompileError::ReturnTypeMismatch {
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Conditions must type exactly as the 1-bit boolean; truthiness
    /// coercion happens later, in the IR builder.
    fn check_condition(&mut self, condition: &mut Expr) -> CompileResult<()> {
        let ty = self.check_expr(condition)?;
        if !ty.is_bool() {
            return Err(CompileError::NonBooleanCondition(ty.to_string()));
        }
        Ok(())
    }

    fn check_decl(&mut self, decl: &mut Decl) -> CompileResult<()> {
        match &mut decl.kind {
            DeclKind::Variable(var) => {
                let annotated = match &mut var.ty_expr {
                    Some(ty_expr) => Some(Self::denoted_type(self.decls, ty_expr)?),
                    None => None,
                };
                let ty = match (annotated, &mut var.init) {
                    (Some(annotated), Some(init)) => {
                        let init_ty = self.check_expr(init)?;
                        if !compatible(&init_ty, &annotated) {
                            return Err(CompileError::TypeMismatch {
                                expected: annotated.to_string(),
                                found: init_ty.to_string(),
                            });
                        }
                        annotated
                    }
                    (Some(annotated), None) => annotated,
                    (None, Some(init)) => self.check_expr(init)?,
                    (None, None) => {
                        return Err(CompileError::semantic(format!(
                            "variable '{}' needs a type annotation or an initializer",
                            decl.name
                        )));
                    }
                };
                var.ty = Some(ty.clone());
                if let Some(id) = decl.id {
                    self.decls.set_ty(id, ty);
                }
                Ok(())
            }
            DeclKind::Function(func) => {
                let ret = match &mut func.ret_ty_expr {
                    Some(ty_expr) => Self::denoted_type(self.decls, ty_expr)?,
                    None => Ty::Void,
                };
                let mut params = Vec::with_capacity(func.params.len());
                for param in &mut func.params {
                    let ty = Self::denoted_type(self.decls, &mut param.ty_expr)?;
                    param.ty = Some(ty.clone());
                    if let Some(id) = param.id {
                        self.decls.set_ty(id, ty.clone());
                    }
                    params.push(ty);
                }
                let fn_ty = Ty::function(params, ret.clone(), func.variadic);
                func.ty = Some(fn_ty.clone());
                if let Some(id) = decl.id {
                    self.decls.set_ty(id, fn_ty);
                }

                // the declared type is recorded before the body walks, so
                // recursive calls type against it
                if let Some(body) = &mut func.body {
                    let saved = self.ret_ty.replace(ret);
                    for stmt in body {
                        self.check_stmt(stmt)?;
                    }
                    self.ret_ty = saved;
                }
                Ok(())
            }
            DeclKind::Class(class) => {
                for member in &mut class.members {
                    let ty = Self::denoted_type(self.decls, &mut member.ty_expr)?;
                    member.ty = Some(ty.clone());
                    if let Some(id) = member.id {
                        self.decls.set_ty(id, ty);
                    }
                }
                Ok(())
            }
        }
    }

    /// Resolve a type annotation. Annotations are ordinary expressions: a
    /// symbol naming a builtin type or class denotes that type, and a deref
    /// node denotes a pointer to the inner denoted type.
    fn denoted_type(decls: &DeclTable, expr: &mut Expr) -> CompileResult<Ty> {
        let ty = match &mut expr.kind {
            ExprKind::Symbol { name, binding } => {
                let id = binding.ok_or_else(|| {
                    CompileError::semantic(format!("symbol '{name}' has no resolved declaration"))
                })?;
                let info = decls.get(id);
                match info.kind {
                    SymbolKind::Builtin | SymbolKind::Class { .. } => {
                        info.ty.clone().ok_or_else(|| {
                            CompileError::semantic(format!("type '{name}' carries no type"))
                        })?
                    }
                    _ => {
                        return Err(CompileError::semantic(format!(
                            "'{name}' does not name a type"
                        )));
                    }
                }
            }
            ExprKind::Deref(inner) => Ty::pointer(Self::denoted_type(decls, inner)?),
            _ => {
                return Err(CompileError::semantic(
                    "unsupported expression in type position",
                ));
            }
        };
        expr.ty = Some(ty.clone());
        Ok(ty)
    }

    fn check_expr(&mut self, expr: &mut Expr) -> CompileResult<Ty> {
        let ty = match &mut expr.kind {
            ExprKind::IntLiteral(_) => Ty::int32(),
            ExprKind::BoolLiteral(_) => Ty::bool(),
            ExprKind::StringLiteral(_) => Ty::pointer(Ty::char()),

            ExprKind::Symbol { name, binding } => {
                let id = binding.ok_or_else(|| {
                    CompileError::semantic(format!("symbol '{name}' has no resolved declaration"))
                })?;
                let info = self.decls.get(id);
                info.ty.clone().ok_or_else(|| {
                    CompileError::semantic(format!(
                        "'{name}' is referenced before its type is known"
                    ))
                })?
            }

            ExprKind::Binary { op, left, right } => {
                let left_ty = self.check_expr(left)?;
                let right_ty = self.check_expr(right)?;
                match self
                    .op_table
                    .get(&(left_ty.clone(), right_ty.clone(), *op))
                {
                    Some(ty) => ty.clone(),
                    None => {
                        return Err(CompileError::UnknownOperator {
                            left: left_ty.to_string(),
                            op: op.to_string(),
                            right: right_ty.to_string(),
                        });
                    }
                }
            }

            ExprKind::Call { callee, args } => {
                let callee_ty = self.check_expr(callee)?;
                let (params, ret, variadic) = match callee_ty {
                    Ty::Function {
                        params,
                        ret,
                        variadic,
                    } => (params, ret, variadic),
                    other => {
                        return Err(CompileError::TypeMismatch {
                            expected: "function".to_string(),
                            found: other.to_string(),
                        });
                    }
                };

                let matches_arity = if variadic {
                    args.len() >= params.len()
                } else {
                    args.len() == params.len()
                };
                if !matches_arity {
                    return Err(CompileError::ArgumentMismatch {
                        expected: params.len(),
                        found: args.len(),
                    });
                }

                for (i, arg) in args.iter_mut().enumerate() {
                    let arg_ty = self.check_expr(arg)?;
                    if let Some(param_ty) = params.get(i) {
                        if !compatible(&arg_ty, param_ty) {
                            return Err(CompileError::TypeMismatch {
                                expected: param_ty.to_string(),
                                found: arg_ty.to_string(),
                            });
                        }
                    }
                }
                *ret
            }

            ExprKind::Member {
                parent,
                member,
                binding,
            } => {
                let parent_ty = self.check_expr(parent)?;
                let (class_name, class_id) = match parent_ty {
                    Ty::Class { name, decl } => (name, decl),
                    other => {
                        return Err(CompileError::TypeMismatch {
                            expected: "class".to_string(),
                            found: other.to_string(),
                        });
                    }
                };

                // access through the type name iff the parent is the class
                // symbol itself
                let via_type_name = matches!(
                    &parent.kind,
                    ExprKind::Symbol {
                        binding: Some(b), ..
                    } if *b == class_id
                );

                let member_id = self.decls.find_member(class_id, member).ok_or_else(|| {
                    CompileError::NoSuchMember {
                        class: class_name.to_string(),
                        member: member.clone(),
                    }
                })?;
                let info = self.decls.get(member_id);
                let is_static = matches!(
                    info.kind,
                    SymbolKind::Variable {
                        is_static: true,
                        ..
                    }
                );
                if is_static && !via_type_name {
                    return Err(CompileError::StaticMemberViaInstance {
                        member: member.clone(),
                    });
                }
                if !is_static && via_type_name {
                    return Err(CompileError::InstanceMemberViaType {
                        member: member.clone(),
                    });
                }

                let ty = info.ty.clone().ok_or_else(|| {
                    CompileError::semantic(format!(
                        "member '{member}' is referenced before its type is known"
                    ))
                })?;
                *binding = Some(member_id);
                ty
            }

            ExprKind::AddrOf(inner) => Ty::pointer(self.check_expr(inner)?),

            ExprKind::Deref(inner) => {
                let inner_ty = self.check_expr(inner)?;
                match inner_ty {
                    Ty::Pointer(pointee) => *pointee,
                    other => {
                        return Err(CompileError::TypeMismatch {
                            expected: "pointer".to_string(),
                            found: other.to_string(),
                        });
                    }
                }
            }
        };

        expr.ty = Some(ty.clone());
        Ok(ty)
    }
}

/// The static binary-operator table, keyed by (left, right, operator).
/// Relational and equality entries yield the 1-bit boolean; every other
/// entry yields the operand type. A missing key is a fatal unknown-operator
/// error.
fn build_op_table() -> HashMap<(Ty, Ty, BinaryOp), Ty> {
    use BinaryOp::*;

    let mut table = HashMap::new();
    let mut insert = |ty: &Ty, ops: &[BinaryOp], result: &Ty| {
        for op in ops {
            table.insert((ty.clone(), ty.clone(), *op), result.clone());
        }
    };

    let comparisons = [Eq, Ne, Lt, Le, Gt, Ge];
    let bool_ty = Ty::bool();

    for int in [Ty::int8(), Ty::int16(), Ty::int32(), Ty::int64()] {
        insert(
            &int,
            &[Add, Sub, Mul, Div, Rem, BitAnd, BitOr, BitXor, Shl, Shr, Assign],
            &int,
        );
        insert(&int, &comparisons, &bool_ty);
        insert(&int, &[LogAnd, LogOr], &bool_ty);
    }

    for float in [Ty::Float32, Ty::Float64] {
        insert(&float, &[Add, Sub, Mul, Div, Assign], &float);
        insert(&float, &comparisons, &bool_ty);
    }

    let char_ty = Ty::char();
    insert(&char_ty, &[Assign], &char_ty);
    insert(&char_ty, &comparisons, &bool_ty);

    insert(&bool_ty, &[Eq, Ne, LogAnd, LogOr], &bool_ty);
    insert(&bool_ty, &[Assign], &bool_ty);

    table
}
