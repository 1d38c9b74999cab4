//! Marker statements: `NoOp`, `IMark`, `AbiHint` and `MBE`

use serde::Serialize;

use super::{Stmt, StmtVariant};
use crate::arena::ownership::{BorrowedStmt, StmtPayload};
use crate::arena::{NodeArena, RawStmtBody};
use crate::error::Result;
use crate::ir::{Expr, MBusEvent, StmtArgs, StmtTag};

/// Statement that does nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NoOp;

impl StmtVariant for NoOp {
    const TAG: StmtTag = StmtTag::NoOp;
    const FIELDS: &'static [&'static str] = &[];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        args.validate_fields(Self::TAG.name(), Self::FIELDS)?;
        Ok(NoOp)
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::NoOp(_)) | StmtPayload::Raw { body: RawStmtBody::NoOp, .. } => {
                Ok(NoOp)
            }
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        Vec::new()
    }

    fn lower(&self, _arena: &mut NodeArena) -> Result<RawStmtBody> {
        Ok(RawStmtBody::NoOp)
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::NoOp(v) => Some(v),
            _ => None,
        }
    }
}

/// Start of the IR for one guest instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IMark {
    addr: u64,
    len: i32,
    delta: u8,
}

impl IMark {
    /// Marks the instruction at `addr`, `len` bytes long, with PC delta `delta`
    pub fn new(addr: u64, len: i32, delta: u8) -> Self {
        Self { addr, len, delta }
    }

    /// Guest address of the instruction
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// Instruction length in bytes
    pub fn len(&self) -> i32 {
        self.len
    }

    /// Offset from the instruction address to the guest PC (Thumb uses 1)
    pub fn delta(&self) -> u8 {
        self.delta
    }
}

impl StmtVariant for IMark {
    const TAG: StmtTag = StmtTag::IMark;
    const FIELDS: &'static [&'static str] = &["addr", "len", "delta"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        Ok(Self::new(
            args.int(variant, "addr")?,
            args.int(variant, "len")?,
            args.int(variant, "delta")?,
        ))
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::IMark(mark)) => Ok(*mark),
            StmtPayload::Raw {
                body: RawStmtBody::IMark { addr, len, delta },
                ..
            } => Ok(Self::new(*addr, *len, *delta)),
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        Vec::new()
    }

    fn lower(&self, _arena: &mut NodeArena) -> Result<RawStmtBody> {
        Ok(RawStmtBody::IMark {
            addr: self.addr,
            len: self.len,
            delta: self.delta,
        })
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::IMark(v) => Some(v),
            _ => None,
        }
    }
}

/// ABI hint: `[base, base+len)` became undefined; `nia` is the next address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AbiHint {
    base: Expr,
    len: i32,
    nia: Expr,
}

impl AbiHint {
    /// Creates a hint
    pub fn new(base: Expr, len: i32, nia: Expr) -> Self {
        Self { base, len, nia }
    }

    /// Start of the undefined area
    pub fn base(&self) -> &Expr {
        &self.base
    }

    /// Length of the undefined area
    pub fn len(&self) -> i32 {
        self.len
    }

    /// Address of the next instruction
    pub fn nia(&self) -> &Expr {
        &self.nia
    }
}

impl StmtVariant for AbiHint {
    const TAG: StmtTag = StmtTag::AbiHint;
    const FIELDS: &'static [&'static str] = &["base", "len", "nia"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        Ok(Self::new(
            args.expr(variant, "base")?,
            args.int(variant, "len")?,
            args.expr(variant, "nia")?,
        ))
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::AbiHint(hint)) => Ok(hint.clone()),
            StmtPayload::Raw {
                arena,
                body: RawStmtBody::AbiHint { base, len, nia },
            } => Ok(Self::new(arena.copy_expr(*base)?, *len, arena.copy_expr(*nia)?)),
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        vec![&self.base, &self.nia]
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        Ok(RawStmtBody::AbiHint {
            base: arena.lower_expr(&self.base)?,
            len: self.len,
            nia: arena.lower_expr(&self.nia)?,
        })
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::AbiHint(v) => Some(v),
            _ => None,
        }
    }
}

/// Memory bus event (fence, reservation cancel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Mbe {
    event: MBusEvent,
}

impl Mbe {
    /// Creates a bus event statement
    pub fn new(event: MBusEvent) -> Self {
        Self { event }
    }

    /// The event
    pub fn event(&self) -> MBusEvent {
        self.event
    }
}

impl StmtVariant for Mbe {
    const TAG: StmtTag = StmtTag::Mbe;
    const FIELDS: &'static [&'static str] = &["event"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        Ok(Self::new(args.named_enum(variant, "event")?))
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::Mbe(mbe)) => Ok(*mbe),
            StmtPayload::Raw {
                body: RawStmtBody::Mbe(event),
                ..
            } => Ok(Self::new(*event)),
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        Vec::new()
    }

    fn lower(&self, _arena: &mut NodeArena) -> Result<RawStmtBody> {
        Ok(RawStmtBody::Mbe(self.event))
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::Mbe(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ir::Const;

    #[test]
    fn test_imark_keywords() {
        let args = StmtArgs::new()
            .with("addr", 0x400000u64)
            .with("len", 4i64)
            .with("delta", 0i64);
        let mark = IMark::from_args(&args).unwrap();
        assert_eq!(mark.addr(), 0x400000);
        assert_eq!(mark.len(), 4);
        assert_eq!(mark.delta(), 0);
        assert!(mark.is_flat());
    }

    #[test]
    fn test_imark_delta_out_of_range() {
        let args = StmtArgs::new()
            .with("addr", 0u64)
            .with("len", 4i64)
            .with("delta", 300i64);
        assert!(matches!(
            IMark::from_args(&args),
            Err(Error::InvalidArgument { field, .. }) if field == "delta"
        ));
    }

    #[test]
    fn test_noop_rejects_fields() {
        assert_eq!(NoOp::from_args(&StmtArgs::new()), Ok(NoOp));
        let args = StmtArgs::new().with("len", 1i64);
        assert!(matches!(
            NoOp::from_args(&args),
            Err(Error::UnexpectedArgument { .. })
        ));
    }

    #[test]
    fn test_abihint_requires_expressions() {
        let args = StmtArgs::new()
            .with("base", Const::U64(0))
            .with("len", 128i64)
            .with("nia", Expr::rd_tmp(1));
        assert!(matches!(
            AbiHint::from_args(&args),
            Err(Error::TypeMismatch { field, expected: "IRExpr", .. }) if field == "base"
        ));
    }

    #[test]
    fn test_mbe_event_keyword() {
        let args = StmtArgs::new().with("event", "Imbe_Fence");
        assert_eq!(Mbe::from_args(&args).unwrap().event(), MBusEvent::Fence);

        let args = StmtArgs::new().with("jumpkind", "Imbe_Fence");
        assert!(matches!(
            Mbe::from_args(&args),
            Err(Error::UnexpectedArgument { .. })
        ));
    }
}
