//! HIR data model: module, globals, functions, basic blocks, instructions
//!
//! Functions own their instructions and blocks as index arenas. Every value
//! carries a fixed type set at construction; modules are built once by the
//! IR builder and never mutated afterwards.

use std::fmt;

use crate::types::Ty;

/// Index of a basic block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// Index of an instruction within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub usize);

/// Index of a function within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub usize);

/// Index of a global variable within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub usize);

/// An IR value (operand). Identity and type are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of an instruction
    Inst(InstId),
    /// The n-th parameter of the enclosing function
    Param(usize),
    /// Address of a module global
    Global(GlobalId),
    /// A module function (callee value)
    Func(FuncId),
    /// Integer constant
    ConstInt { value: i64, ty: Ty },
    /// Floating-point constant
    ConstFloat { value: f64, ty: Ty },
    /// String constant
    ConstStr { value: String, ty: Ty },
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Rem => "rem",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Shl => "shl",
            Self::Shr => "shr",
        };
        write!(f, "{name}")
    }
}

/// Comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
        };
        write!(f, "{name}")
    }
}

/// Cast kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Reinterpret without changing bits (pointer-to-pointer, same width)
    Bitcast,
    ZExt,
    SExt,
    Trunc,
    FpExt,
    FpTrunc,
    FpToSi,
    SiToFp,
    PtrToInt,
    IntToPtr,
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bitcast => "bitcast",
            Self::ZExt => "zext",
            Self::SExt => "sext",
            Self::Trunc => "trunc",
            Self::FpExt => "fpext",
            Self::FpTrunc => "fptrunc",
            Self::FpToSi => "fptosi",
            Self::SiToFp => "sitofp",
            Self::PtrToInt => "ptrtoint",
            Self::IntToPtr => "inttoptr",
        };
        write!(f, "{name}")
    }
}

/// An instruction: a kind plus the fixed type of its result (`void` for
/// instructions that produce no value).
#[derive(Debug, Clone)]
pub struct Inst {
    pub kind: InstKind,
    pub ty: Ty,
}

/// Instruction kinds
#[derive(Debug, Clone)]
pub enum InstKind {
    /// Reserve a stack slot; the result is a pointer to it
    Alloca { alloc_ty: Ty },

    /// Load the value stored at `addr`
    Load { addr: Value },

    /// Store `value` at `addr`
    Store { addr: Value, value: Value },

    /// Arithmetic or bitwise operation over balanced operands
    Binary { op: BinOp, lhs: Value, rhs: Value },

    /// Typed comparison; always yields the 1-bit boolean
    Cmp {
        pred: CmpPred,
        lhs: Value,
        rhs: Value,
    },

    /// Conversion to the instruction's result type
    Cast { kind: CastKind, value: Value },

    /// Indexed address computation: base address plus constant indices,
    /// typed as pointer-to-element
    ElemPtr { base: Value, indices: Vec<Value> },

    /// Function call; the result type is the callee's declared return type
    Call { callee: Value, args: Vec<Value> },
}

/// The single control transfer ending a basic block.
#[derive(Debug, Clone)]
pub enum Terminator {
    Return(Option<Value>),
    Branch(BlockId),
    CondBranch {
        cond: Value,
        then_blk: BlockId,
        else_blk: BlockId,
    },
    Unreachable,
}

/// A basic block: an ordered instruction list ending in exactly one
/// terminator, plus explicit predecessor/successor edges.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub name: String,
    pub insts: Vec<InstId>,
    /// `None` only while the builder is mid-construction; always present in
    /// a finished module.
    pub terminator: Option<Terminator>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            insts: Vec::new(),
            terminator: None,
            preds: Vec::new(),
            succs: Vec::new(),
        }
    }
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct IrParam {
    pub name: String,
    pub ty: Ty,
}

/// A function: parameters, an instruction arena, and basic blocks. The
/// first block is the entry block.
#[derive(Debug, Clone)]
pub struct IrFunction {
    pub name: String,
    pub ty: Ty,
    pub params: Vec<IrParam>,
    pub insts: Vec<Inst>,
    pub blocks: Vec<BasicBlock>,
}

impl IrFunction {
    pub fn new(name: impl Into<String>, ty: Ty, params: Vec<IrParam>) -> Self {
        Self {
            name: name.into(),
            ty,
            params,
            insts: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::new(name));
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0]
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.0]
    }

    /// Declared return type.
    pub fn return_ty(&self) -> Ty {
        match &self.ty {
            Ty::Function { ret, .. } => (**ret).clone(),
            _ => Ty::Void,
        }
    }
}

/// Global variable
#[derive(Debug, Clone)]
pub struct IrGlobal {
    pub name: String,
    pub ty: Ty,
    pub init: Value,
}

/// An IR module: the unit handed to the external code generator.
#[derive(Debug, Clone, Default)]
pub struct IrModule {
    pub globals: Vec<IrGlobal>,
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed type of a value, in the context of `func`.
    pub fn value_ty(&self, func: &IrFunction, value: &Value) -> Ty {
        match value {
            Value::Inst(id) => func.insts[id.0].ty.clone(),
            Value::Param(index) => func.params[*index].ty.clone(),
            // a global used as an operand stands for its address
            Value::Global(id) => Ty::pointer(self.globals[id.0].ty.clone()),
            Value::Func(id) => self.functions[id.0].ty.clone(),
            Value::ConstInt { ty, .. }
            | Value::ConstFloat { ty, .. }
            | Value::ConstStr { ty, .. } => ty.clone(),
        }
    }

    fn fmt_value(&self, func: &IrFunction, value: &Value) -> String {
        match value {
            Value::Inst(id) => format!("%{}", id.0),
            Value::Param(index) => format!("%{}", func.params[*index].name),
            Value::Global(id) => format!("@{}", self.globals[id.0].name),
            Value::Func(id) => format!("@{}", self.functions[id.0].name),
            Value::ConstInt { value, .. } => value.to_string(),
            Value::ConstFloat { value, .. } => value.to_string(),
            Value::ConstStr { value, .. } => format!("\"{}\"", value.escape_default()),
        }
    }

    fn fmt_inst(
        &self,
        func: &IrFunction,
        id: InstId,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let inst = &func.insts[id.0];
        let operands = match &inst.kind {
            InstKind::Alloca { alloc_ty } => format!("alloca {alloc_ty}"),
            InstKind::Load { addr } => format!("load {}", self.fmt_value(func, addr)),
            InstKind::Store { addr, value } => format!(
                "store {}, {}",
                self.fmt_value(func, value),
                self.fmt_value(func, addr)
            ),
            InstKind::Binary { op, lhs, rhs } => format!(
                "{op} {}, {}",
                self.fmt_value(func, lhs),
                self.fmt_value(func, rhs)
            ),
            InstKind::Cmp { pred, lhs, rhs } => format!(
                "cmp.{pred} {}, {}",
                self.fmt_value(func, lhs),
                self.fmt_value(func, rhs)
            ),
            InstKind::Cast { kind, value } => {
                format!("cast.{kind} {}", self.fmt_value(func, value))
            }
            InstKind::ElemPtr { base, indices } => {
                let indices = indices
                    .iter()
                    .map(|index| self.fmt_value(func, index))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("elemptr {}, {indices}", self.fmt_value(func, base))
            }
            InstKind::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.fmt_value(func, arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("call {}({args})", self.fmt_value(func, callee))
            }
        };

        if inst.ty.is_void() {
            writeln!(f, "  {operands}")
        } else {
            writeln!(f, "  %{} = {operands} : {}", id.0, inst.ty)
        }
    }

    fn fmt_terminator(
        &self,
        func: &IrFunction,
        terminator: &Terminator,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match terminator {
            Terminator::Return(Some(value)) => {
                writeln!(f, "  ret {}", self.fmt_value(func, value))
            }
            Terminator::Return(None) => writeln!(f, "  ret"),
            Terminator::Branch(target) => writeln!(f, "  br ^{}", func.block(*target).name),
            Terminator::CondBranch {
                cond,
                then_blk,
                else_blk,
            } => writeln!(
                f,
                "  cbr {}, ^{}, ^{}",
                self.fmt_value(func, cond),
                func.block(*then_blk).name,
                func.block(*else_blk).name
            ),
            Terminator::Unreachable => writeln!(f, "  unreachable"),
        }
    }

    fn fmt_function(&self, func: &IrFunction, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func @{}(", func.name)?;
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", param.ty, param.name)?;
        }
        writeln!(f, ") -> {} {{", func.return_ty())?;

        for block in &func.blocks {
            writeln!(f, "^{}:", block.name)?;
            for inst in &block.insts {
                self.fmt_inst(func, *inst, f)?;
            }
            if let Some(terminator) = &block.terminator {
                self.fmt_terminator(func, terminator, f)?;
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for global in &self.globals {
            writeln!(
                f,
                "@{} : {} = {}",
                global.name,
                global.ty,
                match &global.init {
                    Value::ConstInt { value, .. } => value.to_string(),
                    Value::ConstFloat { value, .. } => value.to_string(),
                    Value::ConstStr { value, .. } => format!("\"{}\"", value.escape_default()),
                    _ => "?".to_string(),
                }
            )?;
        }
        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            self.fmt_function(func, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_form_of_a_small_function() {
        let mut module = IrModule::new();
        let mut func = IrFunction::new(
            "main::id",
            Ty::function(vec![Ty::int32()], Ty::int32(), false),
            vec![IrParam {
                name: "x".to_string(),
                ty: Ty::int32(),
            }],
        );
        let entry = func.add_block("entry");

        func.insts.push(Inst {
            kind: InstKind::Alloca {
                alloc_ty: Ty::int32(),
            },
            ty: Ty::pointer(Ty::int32()),
        });
        func.insts.push(Inst {
            kind: InstKind::Store {
                addr: Value::Inst(InstId(0)),
                value: Value::Param(0),
            },
            ty: Ty::Void,
        });
        func.insts.push(Inst {
            kind: InstKind::Load {
                addr: Value::Inst(InstId(0)),
            },
            ty: Ty::int32(),
        });
        func.block_mut(entry).insts = vec![InstId(0), InstId(1), InstId(2)];
        func.block_mut(entry).terminator = Some(Terminator::Return(Some(Value::Inst(InstId(2)))));
        module.functions.push(func);

        let text = module.to_string();
        assert!(text.contains("func @main::id(i32 %x) -> i32 {"));
        assert!(text.contains("^entry:"));
        assert!(text.contains("%0 = alloca i32 : i32*"));
        assert!(text.contains("store %x, %0"));
        assert!(text.contains("%2 = load %0 : i32"));
        assert!(text.contains("ret %2"));
    }
}
