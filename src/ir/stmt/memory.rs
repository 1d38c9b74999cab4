//! Memory statements: `Store`, `CAS` and `LLSC`

use serde::Serialize;

use super::{Stmt, StmtVariant};
use crate::arena::ownership::{malformed, BorrowedStmt, StmtPayload};
use crate::arena::{NodeArena, RawCas, RawStmtBody};
use crate::error::{Error, Result};
use crate::ir::{Endness, Expr, StmtArgs, StmtTag, Temp};

fn real_temp(field: &'static str, tmp: Temp) -> Result<Temp> {
    if tmp.is_invalid() {
        return Err(Error::invalid(field, "temporary id is the INVALID sentinel"));
    }
    Ok(tmp)
}

/// Memory write
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Store {
    endness: Endness,
    addr: Expr,
    data: Expr,
}

impl Store {
    /// `ST<end>(addr) = data`
    pub fn new(endness: Endness, addr: Expr, data: Expr) -> Self {
        Self {
            endness,
            addr,
            data,
        }
    }

    /// Byte order
    pub fn endness(&self) -> Endness {
        self.endness
    }

    /// Address
    pub fn addr(&self) -> &Expr {
        &self.addr
    }

    /// Value written
    pub fn data(&self) -> &Expr {
        &self.data
    }
}

impl StmtVariant for Store {
    const TAG: StmtTag = StmtTag::Store;
    const FIELDS: &'static [&'static str] = &["endness", "addr", "data"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        let addr = args.expr(variant, "addr")?;
        let data = args.expr(variant, "data")?;
        let endness = args.named_enum(variant, "endness")?;
        Ok(Self::new(endness, addr, data))
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::Store(store)) => Ok(store.clone()),
            StmtPayload::Raw {
                arena,
                body: RawStmtBody::Store { end, addr, data },
            } => Ok(Self::new(
                *end,
                arena.copy_expr(*addr)?,
                arena.copy_expr(*data)?,
            )),
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        vec![&self.addr, &self.data]
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        Ok(RawStmtBody::Store {
            end: self.endness,
            addr: arena.lower_expr(&self.addr)?,
            data: arena.lower_expr(&self.data)?,
        })
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::Store(v) => Some(v),
            _ => None,
        }
    }
}

/// Compare-and-swap operands.
///
/// A single CAS has no high halves; a double CAS has all three.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CasDetails {
    old_hi: Option<Temp>,
    old_lo: Temp,
    endness: Endness,
    addr: Expr,
    expd_hi: Option<Expr>,
    expd_lo: Expr,
    data_hi: Option<Expr>,
    data_lo: Expr,
}

impl CasDetails {
    /// Builds the operands, checking that the high halves are all present or all absent
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        old_hi: Option<Temp>,
        old_lo: Temp,
        endness: Endness,
        addr: Expr,
        expd_hi: Option<Expr>,
        expd_lo: Expr,
        data_hi: Option<Expr>,
        data_lo: Expr,
    ) -> Result<Self> {
        let old_lo = real_temp("oldLo", old_lo)?;
        let old_hi = old_hi.map(|tmp| real_temp("oldHi", tmp)).transpose()?;
        let present = [old_hi.is_some(), expd_hi.is_some(), data_hi.is_some()];
        if present.iter().any(|p| *p) && !present.iter().all(|p| *p) {
            return Err(Error::invalid(
                "oldHi",
                "oldHi, expdHi and dataHi must be all present (double CAS) or all absent",
            ));
        }
        Ok(Self {
            old_hi,
            old_lo,
            endness,
            addr,
            expd_hi,
            expd_lo,
            data_hi,
            data_lo,
        })
    }

    /// Single-element CAS
    pub fn single(old: Temp, endness: Endness, addr: Expr, expd: Expr, data: Expr) -> Result<Self> {
        Self::new(None, old, endness, addr, None, expd, None, data)
    }

    /// Whether this is a double-element CAS
    pub fn is_double(&self) -> bool {
        self.old_hi.is_some()
    }
}

/// Atomic compare-and-swap
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cas {
    details: CasDetails,
}

impl Cas {
    /// Wraps a details record
    pub fn new(details: CasDetails) -> Self {
        Self { details }
    }

    /// The details record
    pub fn details(&self) -> &CasDetails {
        &self.details
    }

    /// High half of the old value
    pub fn old_hi(&self) -> Option<Temp> {
        self.details.old_hi
    }

    /// Low half of the old value
    pub fn old_lo(&self) -> Temp {
        self.details.old_lo
    }

    /// Byte order
    pub fn endness(&self) -> Endness {
        self.details.endness
    }

    /// Address
    pub fn addr(&self) -> &Expr {
        &self.details.addr
    }

    /// Expected high half
    pub fn expd_hi(&self) -> Option<&Expr> {
        self.details.expd_hi.as_ref()
    }

    /// Expected low half
    pub fn expd_lo(&self) -> &Expr {
        &self.details.expd_lo
    }

    /// New high half
    pub fn data_hi(&self) -> Option<&Expr> {
        self.details.data_hi.as_ref()
    }

    /// New low half
    pub fn data_lo(&self) -> &Expr {
        &self.details.data_lo
    }
}

impl StmtVariant for Cas {
    const TAG: StmtTag = StmtTag::Cas;
    const FIELDS: &'static [&'static str] = &[
        "oldHi", "oldLo", "endness", "addr", "expdHi", "expdLo", "dataHi", "dataLo",
    ];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        let old_hi = args.opt_temp("oldHi")?;
        let old_lo = args.temp(variant, "oldLo")?;
        let addr = args.expr(variant, "addr")?;
        let expd_hi = args.opt_expr("expdHi")?;
        let expd_lo = args.expr(variant, "expdLo")?;
        let data_hi = args.opt_expr("dataHi")?;
        let data_lo = args.expr(variant, "dataLo")?;
        let endness = args.named_enum(variant, "endness")?;
        CasDetails::new(
            old_hi, old_lo, endness, addr, expd_hi, expd_lo, data_hi, data_lo,
        )
        .map(Self::new)
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::Cas(cas)) => Ok(cas.clone()),
            StmtPayload::Raw {
                arena,
                body: RawStmtBody::Cas(handle),
            } => {
                let raw = arena.cas(*handle)?;
                let expd_hi = raw.expd_hi.map(|h| arena.copy_expr(h)).transpose()?;
                let data_hi = raw.data_hi.map(|h| arena.copy_expr(h)).transpose()?;
                let details = CasDetails::new(
                    raw.old_hi.to_option(),
                    raw.old_lo,
                    raw.end,
                    arena.copy_expr(raw.addr)?,
                    expd_hi,
                    arena.copy_expr(raw.expd_lo)?,
                    data_hi,
                    arena.copy_expr(raw.data_lo)?,
                );
                malformed(Self::TAG, details).map(Self::new)
            }
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        let d = &self.details;
        let mut exprs = vec![&d.addr];
        exprs.extend(d.expd_hi.as_ref());
        exprs.push(&d.expd_lo);
        exprs.extend(d.data_hi.as_ref());
        exprs.push(&d.data_lo);
        exprs
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        let d = &self.details;
        let addr = arena.lower_expr(&d.addr)?;
        let expd_hi = d.expd_hi.as_ref().map(|e| arena.lower_expr(e)).transpose()?;
        let expd_lo = arena.lower_expr(&d.expd_lo)?;
        let data_hi = d.data_hi.as_ref().map(|e| arena.lower_expr(e)).transpose()?;
        let data_lo = arena.lower_expr(&d.data_lo)?;
        let handle = arena.alloc_cas(RawCas {
            old_hi: Temp::from_option(d.old_hi),
            old_lo: d.old_lo,
            end: d.endness,
            addr,
            expd_hi,
            expd_lo,
            data_hi,
            data_lo,
        })?;
        Ok(RawStmtBody::Cas(handle))
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::Cas(v) => Some(v),
            _ => None,
        }
    }
}

/// Which half of a load-linked/store-conditional pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum LlscOp {
    /// `result = LD<end>-Linked(addr)`
    LoadLinked,
    /// `result = ( ST<end>-Cond(addr) = storedata )`
    StoreConditional(Expr),
}

/// Load-linked or store-conditional
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Llsc {
    endness: Endness,
    result: Temp,
    addr: Expr,
    op: LlscOp,
}

impl Llsc {
    /// Load-linked into `result`
    pub fn load_linked(endness: Endness, result: Temp, addr: Expr) -> Result<Self> {
        Self::with_op(endness, result, addr, LlscOp::LoadLinked)
    }

    /// Store-conditional of `storedata`; `result` receives the success bit
    pub fn store_conditional(endness: Endness, result: Temp, addr: Expr, storedata: Expr) -> Result<Self> {
        Self::with_op(endness, result, addr, LlscOp::StoreConditional(storedata))
    }

    fn with_op(endness: Endness, result: Temp, addr: Expr, op: LlscOp) -> Result<Self> {
        Ok(Self {
            endness,
            result: real_temp("result", result)?,
            addr,
            op,
        })
    }

    /// Byte order
    pub fn endness(&self) -> Endness {
        self.endness
    }

    /// Result temporary
    pub fn result(&self) -> Temp {
        self.result
    }

    /// Address
    pub fn addr(&self) -> &Expr {
        &self.addr
    }

    /// Operation
    pub fn op(&self) -> &LlscOp {
        &self.op
    }

    /// Value stored by a store-conditional
    pub fn storedata(&self) -> Option<&Expr> {
        match &self.op {
            LlscOp::LoadLinked => None,
            LlscOp::StoreConditional(data) => Some(data),
        }
    }

    /// Whether this is the load half
    pub fn is_load_linked(&self) -> bool {
        matches!(self.op, LlscOp::LoadLinked)
    }
}

impl StmtVariant for Llsc {
    const TAG: StmtTag = StmtTag::Llsc;
    const FIELDS: &'static [&'static str] = &["endness", "result", "addr", "storedata"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        let result = args.temp(variant, "result")?;
        let addr = args.expr(variant, "addr")?;
        let storedata = args.opt_expr("storedata")?;
        let endness = args.named_enum(variant, "endness")?;
        match storedata {
            None => Self::load_linked(endness, result, addr),
            Some(data) => Self::store_conditional(endness, result, addr, data),
        }
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::Llsc(llsc)) => Ok(llsc.clone()),
            StmtPayload::Raw {
                arena,
                body:
                    RawStmtBody::Llsc {
                        end,
                        result,
                        addr,
                        storedata,
                    },
            } => {
                let addr = arena.copy_expr(*addr)?;
                let llsc = match storedata {
                    None => Self::load_linked(*end, *result, addr),
                    Some(data) => {
                        Self::store_conditional(*end, *result, addr, arena.copy_expr(*data)?)
                    }
                };
                malformed(Self::TAG, llsc)
            }
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        let mut exprs = vec![&self.addr];
        exprs.extend(self.storedata());
        exprs
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        let addr = arena.lower_expr(&self.addr)?;
        let storedata = self.storedata().map(|e| arena.lower_expr(e)).transpose()?;
        Ok(RawStmtBody::Llsc {
            end: self.endness,
            result: self.result,
            addr,
            storedata,
        })
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::Llsc(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Const, IrType};

    fn single_cas_args(endness: &str) -> StmtArgs {
        StmtArgs::new()
            .with("oldLo", 5u32)
            .with("endness", endness)
            .with("addr", Expr::rd_tmp(1))
            .with("expdLo", Expr::rd_tmp(2))
            .with("dataLo", Expr::rd_tmp(3))
    }

    #[test]
    fn test_store_unknown_endness() {
        let args = StmtArgs::new()
            .with("endness", "Iend_XX")
            .with("addr", Expr::rd_tmp(1))
            .with("data", Expr::rd_tmp(2));
        assert_eq!(
            Store::from_args(&args),
            Err(Error::UnknownName {
                enumeration: "IREndness",
                name: "Iend_XX".to_string()
            })
        );
    }

    #[test]
    fn test_cas_endness_is_per_call() {
        let le = Cas::from_args(&single_cas_args("Iend_LE")).unwrap();
        let be = Cas::from_args(&single_cas_args("Iend_BE")).unwrap();
        assert_eq!(le.endness(), Endness::Le);
        assert_eq!(be.endness(), Endness::Be);
        assert!(!le.details().is_double());
        assert_eq!(le.old_hi(), None);
        assert_eq!(le.old_lo(), Temp(5));
    }

    #[test]
    fn test_double_cas_halves() {
        let args = single_cas_args("Iend_LE")
            .with("oldHi", 6u32)
            .with("expdHi", Expr::rd_tmp(7))
            .with("dataHi", Expr::rd_tmp(8));
        let cas = Cas::from_args(&args).unwrap();
        assert!(cas.details().is_double());
        assert_eq!(cas.sub_exprs().len(), 5);

        let partial = single_cas_args("Iend_LE").with("oldHi", 6u32);
        assert!(matches!(
            Cas::from_args(&partial),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_llsc_kinds() {
        let args = StmtArgs::new()
            .with("endness", "Iend_LE")
            .with("result", 4u32)
            .with("addr", Expr::rd_tmp(1));
        let ll = Llsc::from_args(&args).unwrap();
        assert!(ll.is_load_linked());
        assert_eq!(ll.storedata(), None);

        let sc = Llsc::from_args(&args.clone().with("storedata", Expr::rd_tmp(2))).unwrap();
        assert_eq!(sc.op(), &LlscOp::StoreConditional(Expr::rd_tmp(2)));
        assert!(sc.is_flat());
    }

    #[test]
    fn test_store_flatness() {
        let store = Store::new(
            Endness::Le,
            Expr::get(16, IrType::I64),
            Expr::constant(Const::U8(0)),
        );
        assert!(!store.is_flat());
    }

    #[test]
    fn test_raw_cas_with_half_high_part_is_corrupt() {
        let mut arena = NodeArena::new();
        let t = |arena: &mut NodeArena, id| {
            arena.alloc_expr(crate::arena::RawExpr::RdTmp(Temp(id))).unwrap()
        };
        let addr = t(&mut arena, 1);
        let expd_hi = t(&mut arena, 2);
        let expd_lo = t(&mut arena, 3);
        let data_lo = t(&mut arena, 4);
        let handle = arena
            .alloc_cas(RawCas {
                old_hi: Temp::INVALID,
                old_lo: Temp(5),
                end: Endness::Le,
                addr,
                expd_hi: Some(expd_hi),
                expd_lo,
                data_hi: None,
                data_lo,
            })
            .unwrap();
        let stmt = arena.alloc_stmt(RawStmtBody::Cas(handle)).unwrap();

        let err = Cas::from_borrowed(arena.view_stmt(stmt)).unwrap_err();
        assert!(matches!(err, Error::CorruptNode { tag: "Ist_CAS", .. }));
    }
}
