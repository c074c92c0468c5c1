//! Declaration table: the owning store for semantic declaration records
//!
//! AST nodes and symbol bindings refer to declarations through [`DeclId`]
//! handles; the table owns the records, so back-references never extend a
//! declaration's lifetime.

use crate::ast::{DeclId, QualifiedName};
use crate::types::Ty;

/// Semantic kind of a declaration. The variant set is closed: variables,
/// functions, classes and builtin types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Variable { is_global: bool, is_static: bool },
    Function { variadic: bool },
    Class { members: Vec<DeclId> },
    /// Builtin type names exist only in this table; the parser never
    /// produces a declaration node for them.
    Builtin,
}

/// One declaration record.
#[derive(Debug, Clone)]
pub struct DeclInfo {
    /// Local short name.
    pub name: String,
    /// Full path, assigned exactly once during predeclaration. Locals and
    /// builtins never receive one.
    pub qualified: Option<QualifiedName>,
    pub kind: SymbolKind,
    /// Assigned by the type checker (builtins carry their denoted type from
    /// the start).
    pub ty: Option<Ty>,
}

/// Program-wide arena of declaration records.
#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<DeclInfo>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, info: DeclInfo) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(info);
        id
    }

    pub fn get(&self, id: DeclId) -> &DeclInfo {
        &self.decls[id.index()]
    }

    pub fn set_ty(&mut self, id: DeclId, ty: Ty) {
        self.decls[id.index()].ty = Some(ty);
    }

    pub fn ty(&self, id: DeclId) -> Option<&Ty> {
        self.decls[id.index()].ty.as_ref()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Look up a class member by short name.
    pub fn find_member(&self, class: DeclId, name: &str) -> Option<DeclId> {
        match &self.get(class).kind {
            SymbolKind::Class { members } => {
                members.iter().copied().find(|m| self.get(*m).name == name)
            }
            _ => None,
        }
    }

    /// Zero-based field index of an instance member, counting instance
    /// members in declaration order (statics live in module storage and do
    /// not occupy a slot in the object layout).
    pub fn instance_field_index(&self, class: DeclId, name: &str) -> Option<usize> {
        match &self.get(class).kind {
            SymbolKind::Class { members } => members
                .iter()
                .filter(|m| {
                    !matches!(
                        self.get(**m).kind,
                        SymbolKind::Variable {
                            is_static: true,
                            ..
                        }
                    )
                })
                .position(|m| self.get(*m).name == name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(table: &mut DeclTable, name: &str, is_static: bool) -> DeclId {
        table.declare(DeclInfo {
            name: name.to_string(),
            qualified: None,
            kind: SymbolKind::Variable {
                is_global: false,
                is_static,
            },
            ty: Some(Ty::int32()),
        })
    }

    #[test]
    fn test_instance_field_index_skips_statics() {
        let mut table = DeclTable::new();
        let a = member(&mut table, "a", true);
        let b = member(&mut table, "b", false);
        let c = member(&mut table, "c", false);
        let class = table.declare(DeclInfo {
            name: "C".to_string(),
            qualified: Some(QualifiedName::parse("pkg::C")),
            kind: SymbolKind::Class {
                members: vec![a, b, c],
            },
            ty: None,
        });

        assert_eq!(table.instance_field_index(class, "b"), Some(0));
        assert_eq!(table.instance_field_index(class, "c"), Some(1));
        assert_eq!(table.instance_field_index(class, "a"), None);
        assert_eq!(table.find_member(class, "a"), Some(a));
        assert_eq!(table.find_member(class, "missing"), None);
    }
}
