//! Compilation driver: stage and phase orchestration
//!
//! Fully synchronous and single-threaded: each stage runs to completion
//! over every unit (in package-topological order) before the next stage
//! starts, and the first error aborts the whole run. The symbol pass's
//! phase boundary is a visible pair of loops — all units predeclare before
//! any unit resolves, because an importer's qualified lookups read its
//! dependencies' completed export tables.

use crate::ast::Unit;
use crate::common::CompileResult;
use crate::ir::{self, IrModule};
use crate::sema::packages::{self, SortOptions};
use crate::sema::symbols::{self, ExportMap};
use crate::sema::{Builtins, DeclTable, TypeChecker};

/// Options threaded through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Graph imported packages that have no compilation unit (see
    /// [`SortOptions::include_external`]).
    pub include_external: bool,
}

/// Everything the semantic core hands to the code generator: the annotated
/// units, the declaration table they reference, and the lowered module.
#[derive(Debug)]
pub struct Compilation {
    pub units: Vec<Unit>,
    pub decls: DeclTable,
    pub module: IrModule,
}

/// Run the full pipeline over a program's units.
pub fn compile(units: Vec<Unit>) -> CompileResult<Compilation> {
    compile_with_options(units, &CompileOptions::default())
}

pub fn compile_with_options(
    units: Vec<Unit>,
    options: &CompileOptions,
) -> CompileResult<Compilation> {
    let mut decls = DeclTable::new();
    let builtins = Builtins::install(&mut decls);

    let merged = packages::merge_units(units);
    let mut units = packages::sort_units(
        merged,
        &SortOptions {
            include_external: options.include_external,
        },
    )?;

    // phase 1: every unit predeclares and publishes its export table
    let mut exports = ExportMap::default();
    for unit in &mut units {
        symbols::predeclare(unit, &mut decls, &builtins)?;
        exports.insert(unit.package.clone(), symbols::exports_of(unit));
    }

    // phase 2: bodies resolve against the completed export tables
    for unit in &mut units {
        symbols::resolve(unit, &mut decls, &builtins, &exports)?;
    }

    let mut checker = TypeChecker::new(&mut decls);
    for unit in &mut units {
        checker.check_unit(unit)?;
    }

    let module = ir::lower_program(&units, &decls)?;
    Ok(Compilation {
        units,
        decls,
        module,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::{
        BinaryOp, Decl, DeclKind, Expr, ExprKind, FuncDecl, Param, QualifiedName, Stmt, VarDecl,
    };
    use crate::common::CompileError;
    use crate::ir::{InstKind, IrFunction, Terminator, Value};
    use crate::types::Ty;

    fn type_sym(name: &str) -> Expr {
        Expr::symbol(QualifiedName::single(name))
    }

    fn var_stmt(name: &str, init: Expr) -> Stmt {
        Stmt::Decl(Decl::new(
            name,
            DeclKind::Variable(VarDecl::new(None, Some(init))),
        ))
    }

    /// Every block must end in exactly one terminator, and recorded edges
    /// must match the terminators that created them.
    fn assert_well_formed(func: &IrFunction) {
        for (index, block) in func.blocks.iter().enumerate() {
            let terminator = block
                .terminator
                .as_ref()
                .unwrap_or_else(|| panic!("block '{}' lacks a terminator", block.name));

            let targets: Vec<usize> = match terminator {
                Terminator::Branch(t) => vec![t.0],
                Terminator::CondBranch {
                    then_blk, else_blk, ..
                } => vec![then_blk.0, else_blk.0],
                _ => vec![],
            };
            let succs: Vec<usize> = block.succs.iter().map(|s| s.0).collect();
            assert_eq!(succs, targets, "successors of '{}'", block.name);

            for target in targets {
                assert!(
                    func.blocks[target].preds.iter().any(|p| p.0 == index),
                    "edge {} -> {} not recorded as predecessor",
                    block.name,
                    func.blocks[target].name
                );
            }
        }
        // every predecessor edge corresponds to a real terminator target
        for (index, block) in func.blocks.iter().enumerate() {
            for pred in &block.preds {
                assert!(
                    func.blocks[pred.0].succs.iter().any(|s| s.0 == index),
                    "stale predecessor edge into '{}'",
                    block.name
                );
            }
        }
    }

    fn find_function<'m>(compilation: &'m Compilation, name: &str) -> &'m IrFunction {
        compilation
            .module
            .functions
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("function '{name}' not in module"))
    }

    /// Scenario: unit `test` exports `b`; unit `main` imports it, binds
    /// `test::b`, and lowers a small arithmetic function.
    #[test]
    fn test_cross_unit_program_end_to_end() {
        let test_unit = Unit::new(
            vec![var_stmt("b", Expr::int(1))],
            QualifiedName::parse("test"),
        );

        // fun main() -> int { var c = 1 + 1 / 1; return c; }
        let body = vec![
            var_stmt(
                "c",
                Expr::binary(
                    BinaryOp::Add,
                    Expr::int(1),
                    Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(1)),
                ),
            ),
            Stmt::Return(Some(Expr::symbol(QualifiedName::single("c")))),
        ];
        let main_unit = Unit::new(
            vec![
                var_stmt("a", Expr::symbol(QualifiedName::parse("test::b"))),
                Stmt::Decl(Decl::new(
                    "main",
                    DeclKind::Function(FuncDecl::new(Some(type_sym("int")), vec![], Some(body))),
                )),
            ],
            QualifiedName::parse("main"),
        )
        .with_imports([QualifiedName::parse("test")]);

        let compilation = compile(vec![test_unit, main_unit]).unwrap();

        // `main::a` is bound to the exact declaration exported by `test`
        let test_unit = &compilation.units[0];
        let main_unit = &compilation.units[1];
        let exported = test_unit.decls[&QualifiedName::parse("test::b")];
        let bound = main_unit
            .stmts
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::Decl(decl) if decl.name == "a" => match &decl.kind {
                    DeclKind::Variable(var) => match &var.init.as_ref()?.kind {
                        ExprKind::Symbol { binding, .. } => *binding,
                        _ => None,
                    },
                    _ => None,
                },
                _ => None,
            })
            .unwrap();
        assert_eq!(bound, exported);

        // both declarations typed i32
        let local = main_unit.decls[&QualifiedName::parse("main::a")];
        assert_eq!(compilation.decls.ty(exported), Some(&Ty::int32()));
        assert_eq!(compilation.decls.ty(local), Some(&Ty::int32()));

        // both globals exist; the cross-unit initializer is not a literal,
        // so it zero-initializes
        assert!(compilation
            .module
            .globals
            .iter()
            .any(|g| g.name == "test::b"
                && matches!(g.init, Value::ConstInt { value: 1, .. })));
        assert!(compilation
            .module
            .globals
            .iter()
            .any(|g| g.name == "main::a"
                && matches!(g.init, Value::ConstInt { value: 0, .. })));

        // main::main is a single block: alloca, div, add, store, load, ret
        let main_fn = find_function(&compilation, "main::main");
        assert_well_formed(main_fn);
        assert_eq!(main_fn.blocks.len(), 1);

        let kinds: Vec<&str> = main_fn.blocks[0]
            .insts
            .iter()
            .map(|id| match &main_fn.inst(*id).kind {
                InstKind::Alloca { .. } => "alloca",
                InstKind::Load { .. } => "load",
                InstKind::Store { .. } => "store",
                InstKind::Binary { op, .. } => match op {
                    crate::ir::BinOp::Add => "add",
                    crate::ir::BinOp::Div => "div",
                    _ => "binary",
                },
                InstKind::Cmp { .. } => "cmp",
                InstKind::Cast { .. } => "cast",
                InstKind::ElemPtr { .. } => "elemptr",
                InstKind::Call { .. } => "call",
            })
            .collect();
        assert_eq!(kinds, vec!["alloca", "div", "add", "store", "load"]);
        assert!(matches!(
            main_fn.blocks[0].terminator,
            Some(Terminator::Return(Some(_)))
        ));
    }

    /// Scenario: recursive fib with both `if` arms returning — no merge
    /// block is synthesized, and the recursive calls bind to the function's
    /// own declaration.
    #[test]
    fn test_fib_control_flow_shape() {
        // fun fib(x: int) -> int { if (x < 2) { return x; } else return
        // fib(x - 1) + fib(x - 2); }
        let x = || Expr::symbol(QualifiedName::single("x"));
        let fib = |offset: i64| {
            Expr::call(
                Expr::symbol(QualifiedName::single("fib")),
                vec![Expr::binary(BinaryOp::Sub, x(), Expr::int(offset))],
            )
        };
        let body = vec![Stmt::If {
            condition: Expr::binary(BinaryOp::Lt, x(), Expr::int(2)),
            then_branch: Box::new(Stmt::Block(vec![Stmt::Return(Some(x()))])),
            else_branch: Some(Box::new(Stmt::Return(Some(Expr::binary(
                BinaryOp::Add,
                fib(1),
                fib(2),
            ))))),
        }];
        let unit = Unit::new(
            vec![Stmt::Decl(Decl::new(
                "fib",
                DeclKind::Function(FuncDecl::new(
                    Some(type_sym("int")),
                    vec![Param::new("x", type_sym("int"))],
                    Some(body),
                )),
            ))],
            QualifiedName::parse("main"),
        );

        let compilation = compile(vec![unit]).unwrap();
        let fib_fn = find_function(&compilation, "main::fib");
        assert_well_formed(fib_fn);

        let names: Vec<&str> = fib_fn.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["entry", "then0", "else0"]);

        // both arms return; entry conditionally branches into them
        assert!(matches!(
            fib_fn.blocks[0].terminator,
            Some(Terminator::CondBranch { .. })
        ));
        assert!(matches!(
            fib_fn.blocks[1].terminator,
            Some(Terminator::Return(Some(_)))
        ));
        assert!(matches!(
            fib_fn.blocks[2].terminator,
            Some(Terminator::Return(Some(_)))
        ));

        // recursive calls resolve to the function itself
        let fib_id = compilation.units[0].decls[&QualifiedName::parse("main::fib")];
        let self_calls = fib_fn
            .insts
            .iter()
            .filter(|inst| {
                matches!(
                    &inst.kind,
                    InstKind::Call { callee: Value::Func(f), .. }
                        if compilation.module.functions[f.0].name == "main::fib"
                )
            })
            .count();
        assert_eq!(self_calls, 2);
        assert!(compilation.decls.ty(fib_id).is_some());
    }

    #[test]
    fn test_if_with_fallthrough_arm_gets_merge_block() {
        // fun f(x: int) -> int { if (x < 2) { return x; } return 0; }
        // the implicit else falls through, so a merge block must exist
        let x = || Expr::symbol(QualifiedName::single("x"));
        let body = vec![
            Stmt::If {
                condition: Expr::binary(BinaryOp::Lt, x(), Expr::int(2)),
                then_branch: Box::new(Stmt::Return(Some(x()))),
                else_branch: None,
            },
            Stmt::Return(Some(Expr::int(0))),
        ];
        let unit = Unit::new(
            vec![Stmt::Decl(Decl::new(
                "f",
                DeclKind::Function(FuncDecl::new(
                    Some(type_sym("int")),
                    vec![Param::new("x", type_sym("int"))],
                    Some(body),
                )),
            ))],
            QualifiedName::parse("main"),
        );

        let compilation = compile(vec![unit]).unwrap();
        let func = find_function(&compilation, "main::f");
        assert_well_formed(func);

        let names: Vec<&str> = func.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["entry", "then0", "else0", "merge0"]);
        // only the empty else arm branches into the merge block
        assert_eq!(func.blocks[3].preds.len(), 1);
    }

    #[test]
    fn test_while_loop_shape() {
        // fun f() { var i = 0; while (i < 10) { i = i + 1; } }
        let i = || Expr::symbol(QualifiedName::single("i"));
        let body = vec![
            var_stmt("i", Expr::int(0)),
            Stmt::While {
                condition: Expr::binary(BinaryOp::Lt, i(), Expr::int(10)),
                body: Box::new(Stmt::Block(vec![Stmt::Expr(Expr::binary(
                    BinaryOp::Assign,
                    i(),
                    Expr::binary(BinaryOp::Add, i(), Expr::int(1)),
                ))])),
            },
        ];
        let unit = Unit::new(
            vec![Stmt::Decl(Decl::new(
                "f",
                DeclKind::Function(FuncDecl::new(None, vec![], Some(body))),
            ))],
            QualifiedName::parse("main"),
        );

        let compilation = compile(vec![unit]).unwrap();
        let func = find_function(&compilation, "main::f");
        assert_well_formed(func);

        let names: Vec<&str> = func.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["entry", "while.cond0", "while.body0", "while.exit0"]
        );
        // entry jumps to cond; cond branches body/exit; body loops back
        assert!(matches!(
            func.blocks[0].terminator,
            Some(Terminator::Branch(t)) if t.0 == 1
        ));
        assert!(matches!(
            func.blocks[1].terminator,
            Some(Terminator::CondBranch { then_blk, else_blk, .. })
                if then_blk.0 == 2 && else_blk.0 == 3
        ));
        assert!(matches!(
            func.blocks[2].terminator,
            Some(Terminator::Branch(t)) if t.0 == 1
        ));
        // cond has two predecessors: entry and the loop body
        assert_eq!(func.blocks[1].preds.len(), 2);
        // the function falls through after the loop; void return seals it
        assert!(matches!(
            func.blocks[3].terminator,
            Some(Terminator::Return(None))
        ));
    }

    #[test]
    fn test_bodyless_function_is_a_single_unreachable() {
        let unit = Unit::new(
            vec![Stmt::Decl(Decl::new(
                "external",
                DeclKind::Function(FuncDecl::new(Some(type_sym("int")), vec![], None)),
            ))],
            QualifiedName::parse("main"),
        );

        let compilation = compile(vec![unit]).unwrap();
        let func = find_function(&compilation, "main::external");
        assert_eq!(func.blocks.len(), 1);
        assert!(func.blocks[0].insts.is_empty());
        assert!(matches!(
            func.blocks[0].terminator,
            Some(Terminator::Unreachable)
        ));
    }

    #[test]
    fn test_member_access_lowering() {
        // class Point { static origin: int; x: int; y: int; }
        // fun f() -> int { var p: Point; return p.y; }
        // fun g() -> int { return Point.origin; }
        use crate::ast::{ClassDecl, Member};

        let class = Stmt::Decl(Decl::new(
            "Point",
            DeclKind::Class(ClassDecl {
                members: vec![
                    Member::new("origin", type_sym("int")).static_member(),
                    Member::new("x", type_sym("int")),
                    Member::new("y", type_sym("int")),
                ],
            }),
        ));
        let f = Stmt::Decl(Decl::new(
            "f",
            DeclKind::Function(FuncDecl::new(
                Some(type_sym("int")),
                vec![],
                Some(vec![
                    Stmt::Decl(Decl::new(
                        "p",
                        DeclKind::Variable(VarDecl::new(Some(type_sym("Point")), None)),
                    )),
                    Stmt::Return(Some(Expr::member(
                        Expr::symbol(QualifiedName::single("p")),
                        "y",
                    ))),
                ]),
            )),
        ));
        let g = Stmt::Decl(Decl::new(
            "g",
            DeclKind::Function(FuncDecl::new(
                Some(type_sym("int")),
                vec![],
                Some(vec![Stmt::Return(Some(Expr::member(
                    Expr::symbol(QualifiedName::single("Point")),
                    "origin",
                )))]),
            )),
        ));
        let unit = Unit::new(vec![class, f, g], QualifiedName::parse("main"));

        let compilation = compile(vec![unit]).unwrap();

        // the static member is module storage named by its qualified name
        assert!(compilation
            .module
            .globals
            .iter()
            .any(|global| global.name == "main::Point::origin"));

        // p.y indexes the object layout: statics do not occupy a slot, so
        // the second instance field sits at index 1
        let f_fn = find_function(&compilation, "main::f");
        assert_well_formed(f_fn);
        let elem = f_fn
            .insts
            .iter()
            .find_map(|inst| match &inst.kind {
                InstKind::ElemPtr { indices, .. } => Some((indices.clone(), inst.ty.clone())),
                _ => None,
            })
            .expect("field address computation");
        let index_values: Vec<i64> = elem
            .0
            .iter()
            .map(|value| match value {
                Value::ConstInt { value, .. } => *value,
                _ => panic!("field indices are integer constants"),
            })
            .collect();
        assert_eq!(index_values, vec![0, 1]);
        assert_eq!(elem.1, Ty::pointer(Ty::int32()));

        // Point.origin loads through the module global, with no indexing
        let g_fn = find_function(&compilation, "main::g");
        assert_well_formed(g_fn);
        assert!(g_fn
            .insts
            .iter()
            .any(|inst| matches!(inst.kind, InstKind::Load { addr: Value::Global(_) })));
        assert!(!g_fn
            .insts
            .iter()
            .any(|inst| matches!(inst.kind, InstKind::ElemPtr { .. })));
    }

    #[test]
    fn test_duplicate_top_level_names_abort() {
        let unit = Unit::new(
            vec![var_stmt("a", Expr::int(1)), var_stmt("a", Expr::int(2))],
            QualifiedName::parse("main"),
        );
        let err = compile(vec![unit]).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDeclaration(name) if name == "a"));
    }

    #[test]
    fn test_cyclic_imports_abort() {
        let a = Unit::new(vec![], QualifiedName::parse("a"))
            .with_imports([QualifiedName::parse("b")]);
        let b = Unit::new(vec![], QualifiedName::parse("b"))
            .with_imports([QualifiedName::parse("a")]);
        let err = compile(vec![a, b]).unwrap_err();
        assert!(matches!(err, CompileError::CyclicDependency(_)));
    }

    #[test]
    fn test_logical_operator_coerces_and_stays_boolean() {
        // fun f(a: int, b: int) -> bool { return a && b; }
        let body = vec![Stmt::Return(Some(Expr::binary(
            BinaryOp::LogAnd,
            Expr::symbol(QualifiedName::single("a")),
            Expr::symbol(QualifiedName::single("b")),
        )))];
        let unit = Unit::new(
            vec![Stmt::Decl(Decl::new(
                "f",
                DeclKind::Function(FuncDecl::new(
                    Some(type_sym("bool")),
                    vec![
                        Param::new("a", type_sym("int")),
                        Param::new("b", type_sym("int")),
                    ],
                    Some(body),
                )),
            ))],
            QualifiedName::parse("main"),
        );

        let compilation = compile(vec![unit]).unwrap();
        let func = find_function(&compilation, "main::f");
        assert_well_formed(func);

        // each operand is coerced with a `!= 0` compare before the bitwise op
        let compares = func
            .insts
            .iter()
            .filter(|inst| matches!(inst.kind, InstKind::Cmp { .. }))
            .count();
        assert_eq!(compares, 2);
        let bool_ops = func
            .insts
            .iter()
            .filter(|inst| {
                matches!(inst.kind, InstKind::Binary { op: crate::ir::BinOp::And, .. })
                    && inst.ty == Ty::bool()
            })
            .count();
        assert_eq!(bool_ops, 1);
    }
}
