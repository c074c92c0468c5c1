//! Symbol table and scope management

use std::collections::{HashMap, HashSet};

use super::decls::{DeclInfo, DeclTable, SymbolKind};
use crate::ast::DeclId;
use crate::common::{CompileError, CompileResult};
use crate::types::Ty;

/// The immutable builtin-type registry.
///
/// Installed once into the program's [`DeclTable`] and handed to every fresh
/// symbol table, instead of living as ambient global state.
#[derive(Debug, Clone)]
pub struct Builtins {
    entries: Vec<(String, DeclId)>,
}

impl Builtins {
    /// Register the builtin type declarations and return the registry.
    pub fn install(table: &mut DeclTable) -> Self {
        let denoted = [
            ("void", Ty::Void),
            ("bool", Ty::bool()),
            ("char", Ty::char()),
            ("i8", Ty::int8()),
            ("i16", Ty::int16()),
            ("i32", Ty::int32()),
            ("i64", Ty::int64()),
            ("int", Ty::int32()),
            ("long", Ty::int64()),
            ("float", Ty::Float32),
            ("double", Ty::Float64),
        ];

        let entries = denoted
            .into_iter()
            .map(|(name, ty)| {
                let id = table.declare(DeclInfo {
                    name: name.to_string(),
                    qualified: None,
                    kind: SymbolKind::Builtin,
                    ty: Some(ty),
                });
                (name.to_string(), id)
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[(String, DeclId)] {
        &self.entries
    }
}

/// Lexically scoped symbol table: a stack of frames, each recording the
/// short names introduced there, plus a per-name stack of declarations so
/// inner frames shadow outer ones.
#[derive(Debug)]
pub struct SymbolTable {
    decls: HashMap<String, Vec<DeclId>>,
    frames: Vec<HashSet<String>>,
}

impl SymbolTable {
    /// A fresh table with one (global) frame, pre-seeded with the builtins.
    pub fn new(builtins: &Builtins) -> Self {
        let mut table = Self {
            decls: HashMap::new(),
            frames: vec![HashSet::new()],
        };
        for (name, id) in builtins.entries() {
            // builtin names are unique by construction
            let _ = table.declare(name, *id);
        }
        table
    }

    pub fn push(&mut self) {
        self.frames.push(HashSet::new());
    }

    /// Remove the innermost frame, restoring the visibility of anything it
    /// shadowed.
    pub fn pop(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        for name in frame {
            if let Some(stack) = self.decls.get_mut(&name) {
                stack.pop();
                if stack.is_empty() {
                    self.decls.remove(&name);
                }
            }
        }
    }

    /// Exactly one active frame means global scope.
    pub fn is_global(&self) -> bool {
        self.frames.len() == 1
    }

    /// Introduce `name` in the innermost frame. Redeclaring a name within
    /// the same frame is an error; shadowing an outer frame is not.
    pub fn declare(&mut self, name: &str, id: DeclId) -> CompileResult<()> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(CompileError::semantic("no active scope frame"));
        };
        if !frame.insert(name.to_string()) {
            return Err(CompileError::DuplicateDeclaration(name.to_string()));
        }
        self.decls.entry(name.to_string()).or_default().push(id);
        Ok(())
    }

    /// Innermost declaration for `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<DeclId> {
        self.decls.get(name).and_then(|stack| stack.last()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (DeclTable, Builtins) {
        let mut table = DeclTable::new();
        let builtins = Builtins::install(&mut table);
        (table, builtins)
    }

    fn var(decls: &mut DeclTable, name: &str) -> DeclId {
        decls.declare(DeclInfo {
            name: name.to_string(),
            qualified: None,
            kind: SymbolKind::Variable {
                is_global: false,
                is_static: false,
            },
            ty: None,
        })
    }

    #[test]
    fn test_builtins_are_visible() {
        let (decls, builtins) = fixture();
        let table = SymbolTable::new(&builtins);
        let int = table.lookup("int").expect("int is seeded");
        assert_eq!(decls.get(int).kind, SymbolKind::Builtin);
        assert_eq!(decls.ty(int), Some(&Ty::int32()));
    }

    #[test]
    fn test_inner_scope_shadows_then_restores() {
        let (mut decls, builtins) = fixture();
        let mut table = SymbolTable::new(&builtins);
        let outer = var(&mut decls, "x");
        let inner = var(&mut decls, "x");

        table.declare("x", outer).unwrap();
        table.push();
        table.declare("x", inner).unwrap();
        assert_eq!(table.lookup("x"), Some(inner));
        table.pop();
        assert_eq!(table.lookup("x"), Some(outer));
    }

    #[test]
    fn test_duplicate_in_same_frame_is_rejected() {
        let (mut decls, builtins) = fixture();
        let mut table = SymbolTable::new(&builtins);
        let a = var(&mut decls, "a");
        let b = var(&mut decls, "a");

        table.declare("a", a).unwrap();
        let err = table.declare("a", b).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDeclaration(name) if name == "a"));
    }

    #[test]
    fn test_global_flag_tracks_frame_depth() {
        let (_, builtins) = fixture();
        let mut table = SymbolTable::new(&builtins);
        assert!(table.is_global());
        table.push();
        assert!(!table.is_global());
        table.pop();
        assert!(table.is_global());
    }
}
