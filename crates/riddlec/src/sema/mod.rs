//! Semantic analysis: package ordering, name resolution, type checking

pub mod decls;
pub mod infer;
pub mod packages;
pub mod scope;
pub mod symbols;

pub use decls::{DeclInfo, DeclTable, SymbolKind};
pub use infer::{compatible, TypeChecker};
pub use packages::{merge_units, package_order, sort_units, SortOptions};
pub use scope::{Builtins, SymbolTable};
pub use symbols::{exports_of, predeclare, resolve, ExportMap, ExportTable};
