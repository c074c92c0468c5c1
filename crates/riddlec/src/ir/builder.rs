//! IR builder: lowers the typed AST into basic-block HIR

use std::collections::HashMap;

use super::inst::{
    BinOp, BlockId, CastKind, CmpPred, FuncId, GlobalId, Inst, InstId, InstKind, IrFunction,
    IrGlobal, IrModule, IrParam, Terminator, Value,
};
use crate::ast::{
    BinaryOp, Decl, DeclId, DeclKind, Expr, ExprKind, FuncDecl, Stmt, Unit, VarDecl,
};
use crate::common::{CompileError, CompileResult};
use crate::sema::decls::{DeclTable, SymbolKind};
use crate::types::Ty;

/// How an expression is being evaluated: an lvalue's storage location, or
/// the loaded value. Only symbol references and member accesses are
/// mode-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    Address,
    Value,
}

/// Lower every unit into one IR module. Function shells and globals are
/// created up front so bodies can reference them regardless of unit order.
pub fn lower_program(units: &[Unit], decls: &DeclTable) -> CompileResult<IrModule> {
    let mut builder = IrBuilder::new(decls);

    for unit in units {
        builder.declare_functions(unit)?;
    }
    for unit in units {
        builder.declare_globals(unit)?;
    }
    for unit in units {
        for stmt in &unit.stmts {
            if let Stmt::Decl(decl) = stmt {
                if let DeclKind::Function(func) = &decl.kind {
                    builder.build_function(decl, func)?;
                }
            }
        }
    }

    Ok(builder.finish())
}

/// Builds IR from the typed AST.
pub struct IrBuilder<'a> {
    decls: &'a DeclTable,
    module: IrModule,
    cur_func: usize,
    cur_block: BlockId,
    /// Declaration -> storage address, innermost scope last.
    scopes: Vec<HashMap<DeclId, Value>>,
    global_of: HashMap<DeclId, GlobalId>,
    func_of: HashMap<DeclId, FuncId>,
    block_seq: usize,
}

impl<'a> IrBuilder<'a> {
    pub fn new(decls: &'a DeclTable) -> Self {
        Self {
            decls,
            module: IrModule::new(),
            cur_func: 0,
            cur_block: BlockId(0),
            scopes: Vec::new(),
            global_of: HashMap::new(),
            func_of: HashMap::new(),
            block_seq: 0,
        }
    }

    pub fn finish(self) -> IrModule {
        self.module
    }

    // ==================== module-level shells ====================

    /// Create a function shell for every top-level function declaration.
    fn declare_functions(&mut self, unit: &Unit) -> CompileResult<()> {
        for stmt in &unit.stmts {
            let Stmt::Decl(decl) = stmt else { continue };
            let DeclKind::Function(func) = &decl.kind else {
                continue;
            };

            let id = decl_id(decl)?;
            let ty = self
                .decls
                .ty(id)
                .cloned()
                .ok_or_else(|| missing_type(&decl.name))?;
            let params = func
                .params
                .iter()
                .map(|param| {
                    param
                        .ty
                        .clone()
                        .map(|ty| IrParam {
                            name: param.name.clone(),
                            ty,
                        })
                        .ok_or_else(|| missing_type(&param.name))
                })
                .collect::<CompileResult<Vec<_>>>()?;

            let func_id = FuncId(self.module.functions.len());
            self.module
                .functions
                .push(IrFunction::new(global_name(decl), ty, params));
            self.func_of.insert(id, func_id);
        }
        Ok(())
    }

    /// Create module globals: one per top-level variable, plus one per
    /// static class member.
    fn declare_globals(&mut self, unit: &Unit) -> CompileResult<()> {
        for stmt in &unit.stmts {
            let Stmt::Decl(decl) = stmt else { continue };
            match &decl.kind {
                DeclKind::Variable(var) => {
                    let id = decl_id(decl)?;
                    let ty = self
                        .decls
                        .ty(id)
                        .cloned()
                        .ok_or_else(|| missing_type(&decl.name))?;
                    let init = const_init(var, &ty);
                    let global_id = GlobalId(self.module.globals.len());
                    self.module.globals.push(IrGlobal {
                        name: global_name(decl),
                        ty,
                        init,
                    });
                    self.global_of.insert(id, global_id);
                }
                DeclKind::Class(class) => {
                    for member in &class.members {
                        if !member.is_static {
                            continue;
                        }
                        let id = member
                            .id
                            .ok_or_else(|| missing_decl(&member.name))?;
                        let info = self.decls.get(id);
                        let ty = info
                            .ty
                            .clone()
                            .ok_or_else(|| missing_type(&member.name))?;
                        let name = info
                            .qualified
                            .as_ref()
                            .map_or_else(|| member.name.clone(), ToString::to_string);
                        let global_id = GlobalId(self.module.globals.len());
                        self.module.globals.push(IrGlobal {
                            name,
                            init: zero_value(&ty),
                            ty,
                        });
                        self.global_of.insert(id, global_id);
                    }
                }
                DeclKind::Function(_) => {}
            }
        }
        Ok(())
    }

    // ==================== functions ====================

    fn build_function(&mut self, decl: &Decl, func: &FuncDecl) -> CompileResult<()> {
        let id = decl_id(decl)?;
        let func_id = self
            .func_of
            .get(&id)
            .copied()
            .ok_or_else(|| CompileError::lowering(format!("function '{}' has no shell", decl.name)))?;

        self.cur_func = func_id.0;
        self.block_seq = 0;
        self.scopes.clear();
        self.push_scope();

        let entry = self.func_mut().add_block("entry");
        self.cur_block = entry;

        match &func.body {
            None => {
                // external declaration
                self.set_terminator(Terminator::Unreachable)?;
            }
            Some(body) => {
                // copy parameters into stack slots so they are addressable
                for (index, param) in func.params.iter().enumerate() {
                    let ty = param
                        .ty
                        .clone()
                        .ok_or_else(|| missing_type(&param.name))?;
                    let slot = self.emit(
                        InstKind::Alloca {
                            alloc_ty: ty.clone(),
                        },
                        Ty::pointer(ty),
                    )?;
                    self.emit(
                        InstKind::Store {
                            addr: slot.clone(),
                            value: Value::Param(index),
                        },
                        Ty::Void,
                    )?;
                    let param_id = param.id.ok_or_else(|| missing_decl(&param.name))?;
                    self.bind(param_id, slot);
                }

                for stmt in body {
                    self.build_stmt(stmt)?;
                }

                // seal a fall-through end so every block has its terminator
                if !self.current_terminated() {
                    if self.func().return_ty().is_void() {
                        self.set_terminator(Terminator::Return(None))?;
                    } else {
                        self.set_terminator(Terminator::Unreachable)?;
                    }
                }
            }
        }

        self.pop_scope();
        Ok(())
    }

    // ==================== statements ====================

    fn build_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Decl(decl) => match &decl.kind {
                DeclKind::Variable(var) => self.build_local_var(decl, var),
                _ => Err(CompileError::lowering(format!(
                    "declaration '{}' is not supported in a function body",
                    decl.name
                ))),
            },
            Stmt::Expr(expr) => {
                self.build_expr(expr, EvalMode::Value)?;
                Ok(())
            }
            Stmt::Block(body) => {
                self.push_scope();
                for stmt in body {
                    self.build_stmt(stmt)?;
                }
                self.pop_scope();
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.build_if(condition, then_branch, else_branch.as_deref()),
            Stmt::While { condition, body } => self.build_while(condition, body),
            Stmt::Return(value) => {
                let ret_ty = self.func().return_ty();
                let value = match value {
                    Some(expr) => {
                        let value = self.build_expr(expr, EvalMode::Value)?;
                        Some(self.maybe_cast(value, &ret_ty)?)
                    }
                    None => None,
                };
                self.set_terminator(Terminator::Return(value))
            }
        }
    }

    fn build_local_var(&mut self, decl: &Decl, var: &VarDecl) -> CompileResult<()> {
        let id = decl_id(decl)?;
        let ty = var.ty.clone().ok_or_else(|| missing_type(&decl.name))?;
        let slot = self.emit(
            InstKind::Alloca {
                alloc_ty: ty.clone(),
            },
            Ty::pointer(ty.clone()),
        )?;
        self.bind(id, slot.clone());

        if let Some(init) = &var.init {
            let value = self.build_expr(init, EvalMode::Value)?;
            let value = self.maybe_cast(value, &ty)?;
            self.emit(InstKind::Store { addr: slot, value }, Ty::Void)?;
        }
        Ok(())
    }

    fn build_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> CompileResult<()> {
        let seq = self.next_seq();
        let then_blk = self.func_mut().add_block(format!("then{seq}"));
        let else_blk = self.func_mut().add_block(format!("else{seq}"));

        let cond = self.build_expr(condition, EvalMode::Value)?;
        let cond = self.coerce_bool(cond)?;
        self.set_terminator(Terminator::CondBranch {
            cond,
            then_blk,
            else_blk,
        })?;

        // the merge block exists only if some arm falls through to it
        let mut merge: Option<BlockId> = None;

        self.cur_block = then_blk;
        self.build_stmt(then_branch)?;
        if !self.current_terminated() {
            let merge_blk = self.ensure_merge(&mut merge, seq);
            self.set_terminator(Terminator::Branch(merge_blk))?;
        }

        self.cur_block = else_blk;
        if let Some(else_branch) = else_branch {
            self.build_stmt(else_branch)?;
        }
        if !self.current_terminated() {
            let merge_blk = self.ensure_merge(&mut merge, seq);
            self.set_terminator(Terminator::Branch(merge_blk))?;
        }

        if let Some(merge_blk) = merge {
            self.cur_block = merge_blk;
        }
        Ok(())
    }

    fn ensure_merge(&mut self, merge: &mut Option<BlockId>, seq: usize) -> BlockId {
        match merge {
            Some(block) => *block,
            None => {
                let block = self.func_mut().add_block(format!("merge{seq}"));
                *merge = Some(block);
                block
            }
        }
    }

    fn build_while(&mut self, condition: &Expr, body: &Stmt) -> CompileResult<()> {
        let seq = self.next_seq();
        let cond_blk = self.func_mut().add_block(format!("while.cond{seq}"));
        let body_blk = self.func_mut().add_block(format!("while.body{seq}"));
        let exit_blk = self.func_mut().add_block(format!("while.exit{seq}"));

        self.set_terminator(Terminator::Branch(cond_blk))?;

        self.cur_block = cond_blk;
        let cond = self.build_expr(condition, EvalMode::Value)?;
        let cond = self.coerce_bool(cond)?;
        self.set_terminator(Terminator::CondBranch {
            cond,
            then_blk: body_blk,
            else_blk: exit_blk,
        })?;

        self.cur_block = body_blk;
        self.build_stmt(body)?;
        if !self.current_terminated() {
            self.set_terminator(Terminator::Branch(cond_blk))?;
        }

        self.cur_block = exit_blk;
        Ok(())
    }

    // ==================== expressions ====================

    fn build_expr(&mut self, expr: &Expr, mode: EvalMode) -> CompileResult<Value> {
        match &expr.kind {
            ExprKind::IntLiteral(value) => Ok(Value::ConstInt {
                value: *value,
                ty: expr.ty.clone().unwrap_or_else(Ty::int32),
            }),

            ExprKind::BoolLiteral(value) => Ok(Value::ConstInt {
                value: i64::from(*value),
                ty: Ty::bool(),
            }),

            ExprKind::StringLiteral(value) => Ok(Value::ConstStr {
                value: value.clone(),
                ty: expr
                    .ty
                    .clone()
                    .unwrap_or_else(|| Ty::pointer(Ty::char())),
            }),

            ExprKind::Symbol { name, binding } => {
                let id = binding
                    .ok_or_else(|| CompileError::lowering(format!("unresolved symbol '{name}'")))?;
                let storage = self.symbol_storage(id, &name.to_string())?;
                match (mode, storage) {
                    (_, func @ Value::Func(_)) => Ok(func),
                    (EvalMode::Address, addr) => Ok(addr),
                    (EvalMode::Value, addr) => {
                        let ty = expr_ty(expr)?;
                        self.emit(InstKind::Load { addr }, ty)
                    }
                }
            }

            ExprKind::Binary { op, left, right } => self.build_binary(*op, left, right),

            ExprKind::Call { callee, args } => self.build_call(callee, args),

            ExprKind::Member { .. } => {
                let addr = self.build_member_addr(expr)?;
                match mode {
                    EvalMode::Address => Ok(addr),
                    EvalMode::Value => {
                        let ty = expr_ty(expr)?;
                        self.emit(InstKind::Load { addr }, ty)
                    }
                }
            }

            // the address of `&x` in either mode is x's storage
            ExprKind::AddrOf(inner) => self.build_expr(inner, EvalMode::Address),

            ExprKind::Deref(inner) => {
                let pointer = self.build_expr(inner, EvalMode::Value)?;
                match mode {
                    EvalMode::Address => Ok(pointer),
                    EvalMode::Value => {
                        let ty = expr_ty(expr)?;
                        self.emit(InstKind::Load { addr: pointer }, ty)
                    }
                }
            }
        }
    }

    fn build_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> CompileResult<Value> {
        if op == BinaryOp::Assign {
            let addr = self.build_expr(left, EvalMode::Address)?;
            let value = self.build_expr(right, EvalMode::Value)?;
            let target_ty = expr_ty(left)?;
            let value = self.maybe_cast(value, &target_ty)?;
            self.emit(
                InstKind::Store {
                    addr,
                    value: value.clone(),
                },
                Ty::Void,
            )?;
            return Ok(value);
        }

        let lhs = self.build_expr(left, EvalMode::Value)?;
        let rhs = self.build_expr(right, EvalMode::Value)?;

        if op.is_comparison() {
            let (lhs, rhs, _) = self.balance(lhs, rhs)?;
            let pred = cmp_pred(op)?;
            return self.emit(InstKind::Cmp { pred, lhs, rhs }, Ty::bool());
        }

        if op.is_logical() {
            let lhs = self.coerce_bool(lhs)?;
            let rhs = self.coerce_bool(rhs)?;
            let bit_op = if op == BinaryOp::LogAnd {
                BinOp::And
            } else {
                BinOp::Or
            };
            return self.emit(
                InstKind::Binary {
                    op: bit_op,
                    lhs,
                    rhs,
                },
                Ty::bool(),
            );
        }

        let (lhs, rhs, unified) = self.balance(lhs, rhs)?;
        let op = arith_op(op)?;
        self.emit(InstKind::Binary { op, lhs, rhs }, unified)
    }

    fn build_call(&mut self, callee: &Expr, args: &[Expr]) -> CompileResult<Value> {
        let callee_val = self.build_expr(callee, EvalMode::Value)?;
        let callee_ty = self.value_ty(&callee_val);
        let (params, ret) = match callee_ty {
            Ty::Function { params, ret, .. } => (params, *ret),
            Ty::Pointer(inner) => match *inner {
                Ty::Function { params, ret, .. } => (params, *ret),
                other => {
                    return Err(CompileError::lowering(format!(
                        "callee of type '{other}*' is not a function"
                    )));
                }
            },
            other => {
                return Err(CompileError::lowering(format!(
                    "callee of type '{other}' is not a function"
                )));
            }
        };

        let mut lowered = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let value = self.build_expr(arg, EvalMode::Value)?;
            // fixed positions cast to the declared parameter type; variadic
            // trailing arguments pass through uncast
            let value = match params.get(index) {
                Some(param_ty) => self.maybe_cast(value, param_ty)?,
                None => value,
            };
            lowered.push(value);
        }

        self.emit(
            InstKind::Call {
                callee: callee_val,
                args: lowered,
            },
            ret,
        )
    }

    /// Address of a member access: statics resolve to their module global,
    /// instance members to an indexed address off the object's storage.
    fn build_member_addr(&mut self, expr: &Expr) -> CompileResult<Value> {
        let ExprKind::Member {
            parent,
            member,
            binding,
        } = &expr.kind
        else {
            return Err(CompileError::lowering("expected a member access"));
        };
        let member_id =
            binding.ok_or_else(|| CompileError::lowering(format!("unresolved member '{member}'")))?;

        let info = self.decls.get(member_id);
        if matches!(
            info.kind,
            SymbolKind::Variable {
                is_static: true,
                ..
            }
        ) {
            let global = self.global_of.get(&member_id).copied().ok_or_else(|| {
                CompileError::lowering(format!("static member '{member}' has no storage"))
            })?;
            return Ok(Value::Global(global));
        }

        let parent_ty = expr_ty(parent)?;
        let class_id = match &parent_ty {
            Ty::Class { decl, .. } => *decl,
            other => {
                return Err(CompileError::lowering(format!(
                    "member access on non-class type '{other}'"
                )));
            }
        };

        let base = self.build_expr(parent, EvalMode::Address)?;
        let index = self
            .decls
            .instance_field_index(class_id, member)
            .ok_or_else(|| {
                CompileError::lowering(format!("member '{member}' is not an instance field"))
            })?;
        let field_ty = self
            .decls
            .ty(member_id)
            .cloned()
            .ok_or_else(|| missing_type(member))?;

        let index_ty = Ty::Int {
            bits: 32,
            signed: false,
        };
        let indices = vec![
            Value::ConstInt {
                value: 0,
                ty: index_ty.clone(),
            },
            Value::ConstInt {
                value: index as i64,
                ty: index_ty,
            },
        ];
        self.emit(
            InstKind::ElemPtr { base, indices },
            Ty::pointer(field_ty),
        )
    }

    // ==================== casts & coercions ====================

    /// Cast each operand to the unified type, per the numeric balancing
    /// rule.
    fn balance(&mut self, lhs: Value, rhs: Value) -> CompileResult<(Value, Value, Ty)> {
        let unified = unify(&self.value_ty(&lhs), &self.value_ty(&rhs))?;
        let lhs = self.maybe_cast(lhs, &unified)?;
        let rhs = self.maybe_cast(rhs, &unified)?;
        Ok((lhs, rhs, unified))
    }

    fn maybe_cast(&mut self, value: Value, target: &Ty) -> CompileResult<Value> {
        let from = self.value_ty(&value);
        if from == *target {
            return Ok(value);
        }
        let kind = choose_cast(&from, target)?;
        self.emit(InstKind::Cast { kind, value }, target.clone())
    }

    /// Boolean coercion: 1-bit values pass through, wider integers compare
    /// against zero, pointers convert to an address value first, floats
    /// compare against 0.0.
    fn coerce_bool(&mut self, value: Value) -> CompileResult<Value> {
        let ty = self.value_ty(&value);
        if ty.is_bool() {
            return Ok(value);
        }
        match ty {
            Ty::Int { .. } => {
                let zero = Value::ConstInt { value: 0, ty };
                self.emit(
                    InstKind::Cmp {
                        pred: CmpPred::Ne,
                        lhs: value,
                        rhs: zero,
                    },
                    Ty::bool(),
                )
            }
            Ty::Pointer(_) => {
                let addr_ty = Ty::Int {
                    bits: 64,
                    signed: false,
                };
                let as_int = self.emit(
                    InstKind::Cast {
                        kind: CastKind::PtrToInt,
                        value,
                    },
                    addr_ty.clone(),
                )?;
                let zero = Value::ConstInt {
                    value: 0,
                    ty: addr_ty,
                };
                self.emit(
                    InstKind::Cmp {
                        pred: CmpPred::Ne,
                        lhs: as_int,
                        rhs: zero,
                    },
                    Ty::bool(),
                )
            }
            Ty::Float32 | Ty::Float64 => {
                let zero = Value::ConstFloat { value: 0.0, ty };
                self.emit(
                    InstKind::Cmp {
                        pred: CmpPred::Ne,
                        lhs: value,
                        rhs: zero,
                    },
                    Ty::bool(),
                )
            }
            other => Err(CompileError::UnsupportedCoercion(other.to_string())),
        }
    }

    // ==================== plumbing ====================

    fn func(&self) -> &IrFunction {
        &self.module.functions[self.cur_func]
    }

    fn func_mut(&mut self) -> &mut IrFunction {
        &mut self.module.functions[self.cur_func]
    }

    fn value_ty(&self, value: &Value) -> Ty {
        self.module.value_ty(self.func(), value)
    }

    fn next_seq(&mut self) -> usize {
        let seq = self.block_seq;
        self.block_seq += 1;
        seq
    }

    fn current_terminated(&self) -> bool {
        self.func().block(self.cur_block).terminator.is_some()
    }

    fn emit(&mut self, kind: InstKind, ty: Ty) -> CompileResult<Value> {
        let block = self.cur_block;
        let func = self.func_mut();
        if func.block(block).terminator.is_some() {
            return Err(CompileError::lowering(
                "cannot emit into a terminated block",
            ));
        }
        let id = InstId(func.insts.len());
        func.insts.push(Inst { kind, ty });
        func.block_mut(block).insts.push(id);
        Ok(Value::Inst(id))
    }

    /// Install the block's single terminator and record the CFG edges it
    /// creates.
    fn set_terminator(&mut self, terminator: Terminator) -> CompileResult<()> {
        let block = self.cur_block;
        let targets: Vec<BlockId> = match &terminator {
            Terminator::Branch(target) => vec![*target],
            Terminator::CondBranch {
                then_blk, else_blk, ..
            } => vec![*then_blk, *else_blk],
            Terminator::Return(_) | Terminator::Unreachable => Vec::new(),
        };

        let func = self.func_mut();
        if func.block(block).terminator.is_some() {
            return Err(CompileError::lowering("block already has a terminator"));
        }
        for target in targets {
            func.block_mut(block).succs.push(target);
            func.block_mut(target).preds.push(block);
        }
        func.block_mut(block).terminator = Some(terminator);
        Ok(())
    }

    /// Storage for a declaration: scope stack innermost-first, then module
    /// globals, then module functions. Anything else is an
    /// internal-consistency failure — the symbol pass accepted a name the
    /// lowering cannot place.
    fn symbol_storage(&self, id: DeclId, name: &str) -> CompileResult<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(&id) {
                return Ok(value.clone());
            }
        }
        if let Some(global) = self.global_of.get(&id) {
            return Ok(Value::Global(*global));
        }
        if let Some(func) = self.func_of.get(&id) {
            return Ok(Value::Func(*func));
        }
        Err(CompileError::lowering(format!(
            "symbol '{name}' has no bound storage"
        )))
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, id: DeclId, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(id, value);
        }
    }
}

// ==================== free helpers ====================

fn decl_id(decl: &Decl) -> CompileResult<DeclId> {
    decl.id.ok_or_else(|| missing_decl(&decl.name))
}

fn missing_decl(name: &str) -> CompileError {
    CompileError::lowering(format!("declaration '{name}' was never registered"))
}

fn missing_type(name: &str) -> CompileError {
    CompileError::lowering(format!("'{name}' has no type annotation from the checker"))
}

fn expr_ty(expr: &Expr) -> CompileResult<Ty> {
    expr.ty
        .clone()
        .ok_or_else(|| CompileError::lowering("expression was never typed"))
}

fn global_name(decl: &Decl) -> String {
    decl.qualified
        .as_ref()
        .map_or_else(|| decl.name.clone(), ToString::to_string)
}

/// Lower a global initializer: literal constants directly, anything else
/// zero-initialized.
fn const_init(var: &VarDecl, ty: &Ty) -> Value {
    match var.init.as_ref() {
        Some(Expr {
            kind: ExprKind::IntLiteral(value),
            ty: lit_ty,
        }) => Value::ConstInt {
            value: *value,
            ty: lit_ty.clone().unwrap_or_else(Ty::int32),
        },
        Some(Expr {
            kind: ExprKind::BoolLiteral(value),
            ..
        }) => Value::ConstInt {
            value: i64::from(*value),
            ty: Ty::bool(),
        },
        Some(Expr {
            kind: ExprKind::StringLiteral(value),
            ty: lit_ty,
        }) => Value::ConstStr {
            value: value.clone(),
            ty: lit_ty
                .clone()
                .unwrap_or_else(|| Ty::pointer(Ty::char())),
        },
        _ => zero_value(ty),
    }
}

fn zero_value(ty: &Ty) -> Value {
    match ty {
        Ty::Float32 | Ty::Float64 => Value::ConstFloat {
            value: 0.0,
            ty: ty.clone(),
        },
        Ty::Int { .. } => Value::ConstInt {
            value: 0,
            ty: ty.clone(),
        },
        _ => Value::ConstInt {
            value: 0,
            ty: Ty::int32(),
        },
    }
}

/// Numeric balancing: the common type two operand types cast to before an
/// arithmetic or comparison operation.
pub fn unify(a: &Ty, b: &Ty) -> CompileResult<Ty> {
    if a == b {
        return Ok(a.clone());
    }
    match (a, b) {
        (
            Ty::Int {
                bits: a_bits,
                signed: a_signed,
            },
            Ty::Int {
                bits: b_bits,
                signed: b_signed,
            },
        ) => Ok(Ty::Int {
            bits: (*a_bits).max(*b_bits),
            signed: *a_signed || *b_signed,
        }),
        (Ty::Float32 | Ty::Float64, Ty::Float32 | Ty::Float64) => {
            if matches!(a, Ty::Float64) || matches!(b, Ty::Float64) {
                Ok(Ty::Float64)
            } else {
                Ok(Ty::Float32)
            }
        }
        (Ty::Int { .. }, float @ (Ty::Float32 | Ty::Float64)) => Ok(float.clone()),
        (float @ (Ty::Float32 | Ty::Float64), Ty::Int { .. }) => Ok(float.clone()),
        // pointers are assumed compatible once balancing is reached
        (Ty::Pointer(_), Ty::Pointer(_)) => Ok(a.clone()),
        _ => Err(CompileError::TypeUnification {
            left: a.to_string(),
            right: b.to_string(),
        }),
    }
}

/// Pick the conversion between two types.
pub fn choose_cast(from: &Ty, to: &Ty) -> CompileResult<CastKind> {
    if from == to {
        return Ok(CastKind::Bitcast);
    }
    match (from, to) {
        (
            Ty::Int {
                bits: from_bits,
                signed,
            },
            Ty::Int { bits: to_bits, .. },
        ) => {
            if from_bits < to_bits {
                Ok(if *signed {
                    CastKind::SExt
                } else {
                    CastKind::ZExt
                })
            } else if from_bits > to_bits {
                Ok(CastKind::Trunc)
            } else {
                Ok(CastKind::Bitcast)
            }
        }
        (Ty::Float32, Ty::Float64) => Ok(CastKind::FpExt),
        (Ty::Float64, Ty::Float32) => Ok(CastKind::FpTrunc),
        (Ty::Int { .. }, Ty::Float32 | Ty::Float64) => Ok(CastKind::SiToFp),
        (Ty::Float32 | Ty::Float64, Ty::Int { .. }) => Ok(CastKind::FpToSi),
        (Ty::Pointer(_), Ty::Pointer(_)) => Ok(CastKind::Bitcast),
        (Ty::Pointer(_), Ty::Int { .. }) => Ok(CastKind::PtrToInt),
        (Ty::Int { .. }, Ty::Pointer(_)) => Ok(CastKind::IntToPtr),
        _ => Err(CompileError::UnsupportedCast {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

fn arith_op(op: BinaryOp) -> CompileResult<BinOp> {
    Ok(match op {
        BinaryOp::Add => BinOp::Add,
        BinaryOp::Sub => BinOp::Sub,
        BinaryOp::Mul => BinOp::Mul,
        BinaryOp::Div => BinOp::Div,
        BinaryOp::Rem => BinOp::Rem,
        BinaryOp::BitAnd => BinOp::And,
        BinaryOp::BitOr => BinOp::Or,
        BinaryOp::BitXor => BinOp::Xor,
        BinaryOp::Shl => BinOp::Shl,
        BinaryOp::Shr => BinOp::Shr,
        other => {
            return Err(CompileError::lowering(format!(
                "operator '{other}' has no arithmetic lowering"
            )));
        }
    })
}

fn cmp_pred(op: BinaryOp) -> CompileResult<CmpPred> {
    Ok(match op {
        BinaryOp::Eq => CmpPred::Eq,
        BinaryOp::Ne => CmpPred::Ne,
        BinaryOp::Lt => CmpPred::Lt,
        BinaryOp::Le => CmpPred::Le,
        BinaryOp::Gt => CmpPred::Gt,
        BinaryOp::Ge => CmpPred::Ge,
        other => {
            return Err(CompileError::lowering(format!(
                "operator '{other}' is not a comparison"
            )));
        }
    })
}
