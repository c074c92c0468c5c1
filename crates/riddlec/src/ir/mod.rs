//! Intermediate representation
//!
//! A typed, control-flow-graph HIR: modules own globals and functions, a
//! function owns its parameters and basic blocks, and every block ends in
//! exactly one terminator. The per-instruction text form rendered by
//! `Display` is a debugging aid, not a wire format.

mod builder;
mod inst;

pub use builder::{choose_cast, lower_program, unify, EvalMode, IrBuilder};
pub use inst::{
    BasicBlock, BinOp, BlockId, CastKind, CmpPred, FuncId, GlobalId, Inst, InstId, InstKind,
    IrFunction, IrGlobal, IrModule, IrParam, Terminator, Value,
};
