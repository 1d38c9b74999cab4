//! End-to-end tests for statement construction, wrapping and ownership

use vexir::arena::{ArenaBudget, ArenaBudgetKind, NodeArena, RawCas, RawDirty, RawExpr, RawStmtBody};
use vexir::ir::{
    AbiHint, Callee, Cas, CasDetails, Const, Dirty, Effect, Endness, Exit, Expr, FxState, IMark,
    IrOp, IrType, JumpKind, Llsc, MBusEvent, Mbe, NoOp, Put, PutI, PutIDetails, RegArray, Stmt,
    StmtArgs, StmtTag, StmtVariant, Store, Temp, WrTmp,
};
use vexir::{borrow_view, construct, copy_out, wrap, Error, ErrorSeverity, StmtFactory, UnknownTagPolicy};

fn build(tag: StmtTag, args: StmtArgs) -> Stmt {
    construct(tag, &args).unwrap()
}

/// One statement of every kind, including nested expressions
fn every_kind() -> Vec<Stmt> {
    let cee = Callee::new(1, "helper", 0x7fff_0000).unwrap();
    vec![
        NoOp.into(),
        IMark::new(0x400000, 4, 0).into(),
        AbiHint::new(Expr::rd_tmp(1), 128, Expr::constant(Const::U64(0x400004))).into(),
        Put::new(16, Expr::rd_tmp(0)).into(),
        PutI::new(PutIDetails::new(
            RegArray::new(96, IrType::F64, 8).unwrap(),
            Expr::rd_tmp(1),
            7,
            Expr::constant(Const::F64(1.5f64.to_bits())),
        ))
        .into(),
        WrTmp::new(
            Temp(2),
            Expr::binop("Iop_Add64", Expr::rd_tmp(0), Expr::get(16, IrType::I64)).unwrap(),
        )
        .unwrap()
        .into(),
        Store::new(Endness::Be, Expr::rd_tmp(1), Expr::rd_tmp(2)).into(),
        Cas::new(
            CasDetails::new(
                Some(Temp(6)),
                Temp(5),
                Endness::Le,
                Expr::rd_tmp(1),
                Some(Expr::rd_tmp(7)),
                Expr::rd_tmp(2),
                Some(Expr::rd_tmp(8)),
                Expr::rd_tmp(3),
            )
            .unwrap(),
        )
        .into(),
        Llsc::store_conditional(Endness::Le, Temp(4), Expr::rd_tmp(1), Expr::rd_tmp(2))
            .unwrap()
            .into(),
        Dirty::with_result(Temp(9), cee, vec![Expr::rd_tmp(4), Expr::rd_tmp(5)])
            .unwrap()
            .with_guard(Expr::rd_tmp(3))
            .with_mem_effect(Effect::Read, Some(Expr::rd_tmp(1)), 8)
            .unwrap()
            .with_fx_state(vec![FxState::repeating(Effect::Modify, 96, 8, 7, 16)])
            .unwrap()
            .with_needs_bbp(true)
            .into(),
        Mbe::new(MBusEvent::Fence).into(),
        Exit::new(
            Expr::ite(Expr::rd_tmp(3), Expr::rd_tmp(4), Expr::rd_tmp(5)),
            JumpKind::Boring,
            Const::U64(0x1000),
            184,
        )
        .into(),
    ]
}

// ====================
// Keyword construction
// ====================

#[test]
fn test_imark_echoes_fields() {
    let stmt = build(
        StmtTag::IMark,
        StmtArgs::new()
            .with("addr", 0x400000u64)
            .with("len", 4i64)
            .with("delta", 0i64),
    );
    assert_eq!(stmt.tag(), Some(StmtTag::IMark));
    let mark = stmt.variant::<IMark>().unwrap();
    assert_eq!((mark.addr(), mark.len(), mark.delta()), (0x400000, 4, 0));
}

#[test]
fn test_put_of_temp_is_flat() {
    let stmt = build(
        StmtTag::Put,
        StmtArgs::new()
            .with("offset", 16i64)
            .with("data", Expr::rd_tmp(0)),
    );
    assert!(stmt.is_flat());
}

#[test]
fn test_store_unknown_endness_fails() {
    let args = StmtArgs::new()
        .with("endness", "Iend_XX")
        .with("addr", Expr::rd_tmp(1))
        .with("data", Expr::rd_tmp(2));
    let err = construct(StmtTag::Store, &args).unwrap_err();
    assert!(matches!(err, Error::UnknownName { ref name, .. } if name == "Iend_XX"));
    assert_eq!(err.classify(), ErrorSeverity::Recoverable);
}

#[test]
fn test_exit_jumpkind_name() {
    let stmt = build(
        StmtTag::Exit,
        StmtArgs::new()
            .with("guard", Expr::rd_tmp(3))
            .with("jumpkind", "Ijk_Boring")
            .with("dst", Const::U64(0x1000))
            .with("offsIP", 184i64),
    );
    let exit = stmt.variant::<Exit>().unwrap();
    assert_eq!(exit.jumpkind().name(), "Ijk_Boring");
    assert_eq!(exit.offs_ip(), 184);
}

#[test]
fn test_dirty_without_tmp() {
    let stmt = build(
        StmtTag::Dirty,
        StmtArgs::new()
            .with("regparms", 0i64)
            .with("name", "helper")
            .with("addr", 0x7fff_0000u64)
            .with("args", vec![Expr::rd_tmp(4), Expr::rd_tmp(5)]),
    );
    let dirty = stmt.variant::<Dirty>().unwrap();
    assert_eq!(dirty.tmp(), None);
    assert_eq!(dirty.args(), vec![Expr::rd_tmp(4), Expr::rd_tmp(5)]);
    assert_eq!(dirty.cee().addr(), 0x7fff_0000);
}

#[test]
fn test_two_cas_with_different_endness() {
    let args = |endness: &str| {
        StmtArgs::new()
            .with("oldLo", 5u32)
            .with("endness", endness)
            .with("addr", Expr::rd_tmp(1))
            .with("expdLo", Expr::rd_tmp(2))
            .with("dataLo", Expr::rd_tmp(3))
    };
    let le = build(StmtTag::Cas, args("Iend_LE"));
    let be = build(StmtTag::Cas, args("Iend_BE"));
    assert_eq!(le.variant::<Cas>().unwrap().endness(), Endness::Le);
    assert_eq!(be.variant::<Cas>().unwrap().endness(), Endness::Be);
}

#[test]
fn test_validation_order() {
    // Reserved keyword wins over everything else
    let args = StmtArgs::new().with("wrap", 0u64).with("bogus", 1i64);
    assert_eq!(
        construct(StmtTag::Put, &args),
        Err(Error::AmbiguousConstruction { variant: "Ist_Put" })
    );

    // Unknown field before missing field
    let args = StmtArgs::new().with("bogus", 1i64);
    assert!(matches!(
        construct(StmtTag::Put, &args),
        Err(Error::UnexpectedArgument { .. })
    ));

    let args = StmtArgs::new().with("offset", 16i64);
    assert!(matches!(
        construct(StmtTag::Put, &args),
        Err(Error::MissingArgument { field: "data", .. })
    ));
}

#[test]
fn test_every_variant_declares_fields() {
    assert_eq!(NoOp::FIELDS.len(), 0);
    assert_eq!(Mbe::FIELDS, &["event"]);
    assert_eq!(Exit::FIELDS, &["guard", "jumpkind", "dst", "offsIP"]);
    assert_eq!(Dirty::FIELDS.len(), 11);
}

// ====================
// Wrap and copy-out
// ====================

#[test]
fn test_copy_out_round_trip_for_every_kind() {
    for stmt in every_kind() {
        let copied = copy_out(borrow_view(&stmt)).unwrap();
        assert_eq!(wrap(borrow_view(&copied)).unwrap().stmt, stmt);
    }
}

#[test]
fn test_lower_and_wrap_back_for_every_kind() {
    let mut arena = NodeArena::new();
    let stmts = every_kind();
    let handles: Vec<_> = stmts
        .iter()
        .map(|stmt| stmt.materialize(&mut arena).unwrap())
        .collect();

    let wrapped: Vec<Stmt> = handles
        .iter()
        .map(|h| copy_out(arena.view_stmt(*h)).unwrap())
        .collect();
    drop(arena);
    assert_eq!(wrapped, stmts);
}

#[test]
fn test_copies_are_independent() {
    let original = Stmt::from(Put::new(16, Expr::rd_tmp(0)));
    let first = copy_out(original.view()).unwrap();
    let second = copy_out(original.view()).unwrap();
    drop(first);
    assert_eq!(second, original);
}

#[test]
fn test_arena_copies_outlive_arena() {
    let mut arena = NodeArena::new();
    let t1 = arena.alloc_expr(RawExpr::RdTmp(Temp(1))).unwrap();
    let t2 = arena.alloc_expr(RawExpr::RdTmp(Temp(2))).unwrap();
    let handle = arena
        .alloc_stmt(RawStmtBody::Store {
            end: Endness::Le,
            addr: t1,
            data: t2,
        })
        .unwrap();

    let a = copy_out(arena.view_stmt(handle)).unwrap();
    let b = copy_out(arena.view_stmt(handle)).unwrap();
    drop(arena);
    drop(a);
    assert_eq!(b.to_string(), "STle(t1) = t2");
}

#[test]
fn test_wrap_single_cas_from_arena() {
    let mut arena = NodeArena::new();
    let addr = arena.alloc_expr(RawExpr::RdTmp(Temp(1))).unwrap();
    let expd = arena.alloc_expr(RawExpr::RdTmp(Temp(2))).unwrap();
    let data = arena.alloc_expr(RawExpr::RdTmp(Temp(3))).unwrap();
    let details = arena
        .alloc_cas(RawCas {
            old_hi: Temp::INVALID,
            old_lo: Temp(5),
            end: Endness::Be,
            addr,
            expd_hi: None,
            expd_lo: expd,
            data_hi: None,
            data_lo: data,
        })
        .unwrap();
    let handle = arena.alloc_stmt(RawStmtBody::Cas(details)).unwrap();

    let stmt = copy_out(arena.view_stmt(handle)).unwrap();
    let cas = stmt.variant::<Cas>().unwrap();
    assert_eq!(cas.old_hi(), None);
    assert!(!cas.details().is_double());
    assert_eq!(stmt.to_string(), "t5 = CASbe(t1 :: t2->t3)");
}

#[test]
fn test_wrap_dirty_with_zero_temp() {
    let mut arena = NodeArena::new();
    let guard = arena.alloc_expr(RawExpr::Const(Const::U1(true))).unwrap();
    let details = arena
        .alloc_dirty(RawDirty {
            cee: Callee::new(0, "helper", 0x7fff_0000).unwrap(),
            guard,
            args: Vec::new(),
            tmp: Temp(0),
            m_fx: Effect::None,
            m_addr: None,
            m_size: 0,
            fx_state: Vec::new(),
            needs_bbp: false,
        })
        .unwrap();
    let handle = arena.alloc_stmt(RawStmtBody::Dirty(details)).unwrap();

    let stmt = copy_out(arena.view_stmt(handle)).unwrap();
    let dirty = stmt.variant::<Dirty>().unwrap();
    assert_eq!(dirty.tmp(), Some(Temp(0)));
    assert_eq!(dirty.n_args(), 0);
}

#[test]
fn test_wrap_rejects_mismatched_variant() {
    let stmt = Stmt::from(Put::new(16, Expr::rd_tmp(0)));
    assert!(matches!(
        WrTmp::from_borrowed(stmt.view()),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn test_corrupt_arena_node() {
    let mut arena = NodeArena::new();
    let handle = arena
        .alloc_stmt_with_tag(StmtTag::Exit.raw(), RawStmtBody::Mbe(MBusEvent::Fence))
        .unwrap();
    let err = copy_out(arena.view_stmt(handle)).unwrap_err();
    assert_eq!(
        err,
        Error::CorruptNode {
            tag: "Ist_Exit",
            body: "Ist_MBE"
        }
    );
    assert_eq!(err.classify(), ErrorSeverity::Fatal);
}

// ====================
// Unknown tags, budgets and handles
// ====================

#[test]
fn test_unknown_tag_degrades() {
    let mut arena = NodeArena::new();
    let handle = arena
        .alloc_stmt_with_tag(0x1E0C, RawStmtBody::Opaque)
        .unwrap();

    let wrapped = wrap(arena.view_stmt(handle)).unwrap();
    assert_eq!(wrapped.stmt.tag(), None);
    assert_eq!(wrapped.stmt.raw_tag(), 0x1E0C);
    assert!(wrapped.stmt.is_flat());
    assert_eq!(wrapped.diagnostic.unwrap().severity(), ErrorSeverity::Warning);

    let strict = StmtFactory::new(UnknownTagPolicy::Reject);
    assert_eq!(
        strict.wrap(arena.view_stmt(handle)).unwrap_err().classify(),
        ErrorSeverity::Warning
    );
}

#[test]
fn test_budget_exhaustion() {
    let mut arena = NodeArena::with_budget(ArenaBudget {
        max_expressions: 3,
        ..ArenaBudget::default()
    });
    let nested = Expr::binop(
        "Iop_Add64",
        Expr::rd_tmp(1),
        Expr::unop("Iop_Not64", Expr::rd_tmp(2)).unwrap(),
    )
    .unwrap();
    let stmt = Stmt::from(Put::new(16, nested));
    assert!(matches!(
        stmt.materialize(&mut arena),
        Err(Error::BudgetExceeded {
            kind: ArenaBudgetKind::Expressions,
            limit: 3,
            ..
        })
    ));
}

#[test]
fn test_deep_chain_stops_at_depth_budget() {
    let mut arena = NodeArena::new();
    let limit = arena.budget().max_expr_depth;
    let mut top = arena.alloc_expr(RawExpr::RdTmp(Temp(0))).unwrap();
    let mut rejected = None;
    for _ in 0..20_000 {
        let not = RawExpr::Unop {
            op: IrOp::new("Iop_Not64").unwrap(),
            arg: top,
        };
        match arena.alloc_expr(not) {
            Ok(next) => top = next,
            Err(err) => {
                rejected = Some(err);
                break;
            }
        }
    }
    assert_eq!(
        rejected,
        Some(Error::BudgetExceeded {
            kind: ArenaBudgetKind::Depth,
            limit: u64::from(limit),
            attempted: u64::from(limit) + 1,
        })
    );
    assert_eq!(arena.expr_depth(top).unwrap(), limit);

    // The deepest accepted chain still copies out
    let handle = arena
        .alloc_stmt(RawStmtBody::Put { offset: 16, data: top })
        .unwrap();
    let stmt = copy_out(arena.view_stmt(handle)).unwrap();
    drop(arena);
    assert_eq!(
        stmt.variant::<Put>().unwrap().data().node_count(),
        limit as usize
    );
}

#[test]
fn test_lowering_rejects_overdeep_tree() {
    let mut arena = NodeArena::with_budget(ArenaBudget {
        max_expr_depth: 8,
        ..ArenaBudget::default()
    });
    let mut data = Expr::rd_tmp(0);
    for _ in 0..8 {
        data = Expr::unop("Iop_Not64", data).unwrap();
    }
    let stmt = Stmt::from(Put::new(16, data));
    let err = stmt.materialize(&mut arena).unwrap_err();
    assert!(matches!(
        err,
        Error::BudgetExceeded {
            kind: ArenaBudgetKind::Depth,
            limit: 8,
            attempted: 9
        }
    ));
    assert_eq!(err.classify(), ErrorSeverity::Fatal);
    assert_eq!(arena.expr_count(), 0);
}

#[test]
fn test_raw_dirty_with_bad_mem_effect_is_fatal() {
    let mut arena = NodeArena::new();
    let guard = arena.alloc_expr(RawExpr::Const(Const::U1(true))).unwrap();
    let handle = arena
        .alloc_dirty(RawDirty {
            cee: Callee::new(0, "helper", 0x1000).unwrap(),
            guard,
            args: Vec::new(),
            tmp: Temp::INVALID,
            m_fx: Effect::Read,
            m_addr: None,
            m_size: 8,
            fx_state: Vec::new(),
            needs_bbp: false,
        })
        .unwrap();
    let stmt = arena.alloc_stmt(RawStmtBody::Dirty(handle)).unwrap();

    let err = copy_out(arena.view_stmt(stmt)).unwrap_err();
    assert!(matches!(err, Error::CorruptNode { tag: "Ist_Dirty", .. }));
    assert_eq!(err.classify(), ErrorSeverity::Fatal);
}

#[test]
fn test_foreign_handle_rejected() {
    let mut first = NodeArena::new();
    let second = NodeArena::new();
    let handle = first.alloc_stmt(RawStmtBody::NoOp).unwrap();
    assert!(matches!(
        copy_out(second.view_stmt(handle)),
        Err(Error::ForeignHandle { .. })
    ));
}

// ====================
// Rendering
// ====================

#[test]
fn test_rendering_every_kind() {
    let rendered: Vec<String> = every_kind().iter().map(|s| s.to_string()).collect();
    assert_eq!(
        rendered,
        vec![
            "IR-NoOp",
            "------ IMark(0x400000, 4, 0) ------",
            "====== AbiHint(t1, 128, 0x400004:I64) ======",
            "PUT(16) = t0",
            "PUTI(96:8xF64)[t1,7] = F64{0x3ff8000000000000}",
            "t2 = Add64(t0,GET:I64(16))",
            "STbe(t1) = t2",
            "t6,t5 = CASle(t1 :: (t7,t2)->(t8,t3))",
            "t4 = ( STle-Cond(t1) = t2 )",
            "t9 = DIRTY t3 RdFX-mem(t1,8) MoFX-gst(96,8,reps7,step16) ::: helper{0x7fff0000}[rp=1](t4,t5)",
            "IR-MBE-Fence",
            "if (ITE(t3,t4,t5)) { PUT(184) = 0x1000:I64; exit-Boring }",
        ]
    );
}
