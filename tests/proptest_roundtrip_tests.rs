//! Property-based tests for statement ownership and the enum codec
//!
//! These tests use proptest to generate random statements and verify that:
//! 1. Copying out of an owned view or an arena reproduces the statement
//! 2. Copies stay valid after the source and sibling copies are dropped
//! 3. Every enumeration round-trips through its name and raw value

use proptest::prelude::*;
use vexir::arena::NodeArena;
use vexir::ir::{
    Callee, Const, Dirty, Effect, Endness, Exit, Expr, IrType, JumpKind, MBusEvent, Mbe, Put,
    Stmt, StmtTag, Store, Temp, WrTmp,
};
use vexir::{borrow_view, copy_out, wrap};

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

fn endness() -> impl Strategy<Value = Endness> {
    prop::sample::select(Endness::ALL)
}

fn atom() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0u32..64).prop_map(Expr::rd_tmp),
        any::<u64>().prop_map(|v| Expr::constant(Const::U64(v))),
        any::<bool>().prop_map(|b| Expr::constant(Const::U1(b))),
    ]
}

/// Expressions up to a few levels deep
fn expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        atom(),
        (0i32..512).prop_map(|off| Expr::get(off, IrType::I64)),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Expr::binop("Iop_Add64", a, b).unwrap()),
            inner.clone().prop_map(|a| Expr::unop("Iop_Not64", a).unwrap()),
            (endness(), inner.clone()).prop_map(|(end, a)| Expr::load(end, IrType::I32, a)),
            (inner.clone(), inner.clone(), inner).prop_map(|(c, t, f)| Expr::ite(c, t, f)),
        ]
    })
}

fn stmt() -> impl Strategy<Value = Stmt> {
    prop_oneof![
        (0i32..1024, expr()).prop_map(|(off, data)| Stmt::from(Put::new(off, data))),
        (0u32..1000, expr()).prop_map(|(t, data)| Stmt::from(WrTmp::new(Temp(t), data).unwrap())),
        (endness(), expr(), expr()).prop_map(|(e, a, d)| Stmt::from(Store::new(e, a, d))),
        (expr(), prop::sample::select(JumpKind::ALL), any::<u64>(), 0i32..1024).prop_map(
            |(g, jk, dst, off)| Stmt::from(Exit::new(g, jk, Const::U64(dst), off))
        ),
        prop::sample::select(MBusEvent::ALL).prop_map(|e| Stmt::from(Mbe::new(e))),
        (prop::collection::vec(expr(), 0..6), prop::option::of(0u32..100)).prop_map(
            |(args, tmp)| {
                let cee = Callee::new(0, "helper", 0x1000).unwrap();
                let dirty = match tmp {
                    Some(t) => Dirty::with_result(Temp(t), cee, args).unwrap(),
                    None => Dirty::new(cee, args),
                };
                Stmt::from(dirty)
            }
        ),
    ]
}

// =============================================================================
// OWNERSHIP PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn wrap_of_copy_out_is_identity(s in stmt()) {
        let copied = copy_out(borrow_view(&s)).unwrap();
        prop_assert_eq!(&wrap(borrow_view(&copied)).unwrap().stmt, &s);
    }

    #[test]
    fn arena_round_trip_preserves_statement(s in stmt()) {
        let mut arena = NodeArena::new();
        let handle = s.materialize(&mut arena).unwrap();
        let back = copy_out(arena.view_stmt(handle)).unwrap();
        drop(arena);
        prop_assert_eq!(back, s);
    }

    #[test]
    fn copies_survive_sibling_drop(s in stmt()) {
        let mut arena = NodeArena::new();
        let handle = s.materialize(&mut arena).unwrap();
        let first = copy_out(arena.view_stmt(handle)).unwrap();
        let second = copy_out(arena.view_stmt(handle)).unwrap();
        drop(arena);
        drop(first);
        prop_assert_eq!(second, s);
    }

    #[test]
    fn flatness_matches_sub_exprs(s in stmt()) {
        let all_atoms = s.sub_exprs().iter().all(|e| e.is_atom());
        prop_assert_eq!(s.is_flat(), all_atoms);
    }

    #[test]
    fn dirty_arg_count_is_exact(args in prop::collection::vec(atom(), 0..16)) {
        let cee = Callee::new(0, "helper", 0).unwrap();
        let dirty = Dirty::new(cee, args.clone());
        prop_assert_eq!(dirty.n_args(), args.len());
        prop_assert_eq!(dirty.args(), args);
    }

    #[test]
    fn wrtmp_flat_iff_data_atomic(t in 0u32..100, data in expr()) {
        let atomic = data.is_atom();
        let wr = Stmt::from(WrTmp::new(Temp(t), data).unwrap());
        prop_assert_eq!(wr.is_flat(), atomic);
    }
}

// =============================================================================
// ENUM CODEC PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn unknown_raw_tags_are_rejected(raw in any::<u32>()) {
        let known = StmtTag::ALL.iter().any(|t| t.raw() == raw);
        prop_assert_eq!(StmtTag::from_raw(raw).is_ok(), known);
        prop_assert_eq!(StmtTag::name_of_raw(raw).is_ok(), known);
    }

    #[test]
    fn names_are_case_sensitive(jk in prop::sample::select(JumpKind::ALL)) {
        let upper = jk.name().to_uppercase();
        if upper != jk.name() {
            prop_assert!(JumpKind::from_name(&upper).is_err());
        }
    }
}

#[test]
fn every_enum_round_trips() {
    for v in StmtTag::ALL {
        assert_eq!(StmtTag::from_name(v.name()).unwrap(), *v);
        assert_eq!(StmtTag::from_raw(v.raw()).unwrap(), *v);
    }
    for v in IrType::ALL {
        assert_eq!(IrType::from_name(v.name()).unwrap(), *v);
        assert_eq!(IrType::from_raw(v.raw()).unwrap(), *v);
    }
    for v in JumpKind::ALL {
        assert_eq!(v.name().parse::<JumpKind>().unwrap(), *v);
        assert_eq!(JumpKind::from_raw(v.raw()).unwrap(), *v);
    }
    for v in Effect::ALL {
        assert_eq!(Effect::from_name(v.name()).unwrap(), *v);
    }
    for v in Endness::ALL {
        assert_eq!(Endness::from_raw(v.raw()).unwrap(), *v);
    }
    for v in MBusEvent::ALL {
        assert_eq!(MBusEvent::from_name(v.name()).unwrap(), *v);
    }
}
