//! The type system shared by the type checker and the IR
//!
//! One tagged union serves both stages: the checker annotates the AST with
//! [`Ty`] values and the IR builder reuses them unchanged, so there is no
//! separate lowering step between semantic and IR types.

mod ty;

pub use ty::Ty;
