//! Register and temporary writes: `Put`, `PutI` and `WrTmp`

use serde::Serialize;

use super::{Stmt, StmtVariant};
use crate::arena::ownership::{malformed, BorrowedStmt, StmtPayload};
use crate::arena::{NodeArena, RawPutI, RawStmtBody};
use crate::error::{Error, Result};
use crate::ir::{Expr, RegArray, StmtArgs, StmtTag, Temp};

/// Write to a guest register at a fixed offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Put {
    offset: i32,
    data: Expr,
}

impl Put {
    /// `PUT(offset) = data`
    pub fn new(offset: i32, data: Expr) -> Self {
        Self { offset, data }
    }

    /// Register-file offset
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Value written
    pub fn data(&self) -> &Expr {
        &self.data
    }
}

impl StmtVariant for Put {
    const TAG: StmtTag = StmtTag::Put;
    const FIELDS: &'static [&'static str] = &["offset", "data"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        Ok(Self::new(args.int(variant, "offset")?, args.expr(variant, "data")?))
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::Put(put)) => Ok(put.clone()),
            StmtPayload::Raw {
                arena,
                body: RawStmtBody::Put { offset, data },
            } => Ok(Self::new(*offset, arena.copy_expr(*data)?)),
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        vec![&self.data]
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        Ok(RawStmtBody::Put {
            offset: self.offset,
            data: arena.lower_expr(&self.data)?,
        })
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::Put(v) => Some(v),
            _ => None,
        }
    }
}

/// Indexed register write: `descr[ix + bias] = data`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PutIDetails {
    descr: RegArray,
    ix: Expr,
    bias: i32,
    data: Expr,
}

impl PutIDetails {
    /// Creates the details record
    pub fn new(descr: RegArray, ix: Expr, bias: i32, data: Expr) -> Self {
        Self {
            descr,
            ix,
            bias,
            data,
        }
    }

    /// Array shape
    pub fn descr(&self) -> &RegArray {
        &self.descr
    }

    /// Variable index
    pub fn ix(&self) -> &Expr {
        &self.ix
    }

    /// Constant index bias
    pub fn bias(&self) -> i32 {
        self.bias
    }

    /// Value written
    pub fn data(&self) -> &Expr {
        &self.data
    }
}

/// Write to a guest register at a computed offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PutI {
    details: PutIDetails,
}

impl PutI {
    /// Wraps a details record
    pub fn new(details: PutIDetails) -> Self {
        Self { details }
    }

    /// The details record
    pub fn details(&self) -> &PutIDetails {
        &self.details
    }

    /// Array shape
    pub fn descr(&self) -> &RegArray {
        self.details.descr()
    }

    /// Variable index
    pub fn ix(&self) -> &Expr {
        self.details.ix()
    }

    /// Constant index bias
    pub fn bias(&self) -> i32 {
        self.details.bias()
    }

    /// Value written
    pub fn data(&self) -> &Expr {
        self.details.data()
    }
}

impl StmtVariant for PutI {
    const TAG: StmtTag = StmtTag::PutI;
    const FIELDS: &'static [&'static str] = &["description", "index", "bias", "data"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        Ok(Self::new(PutIDetails::new(
            args.reg_array(variant, "description")?,
            args.expr(variant, "index")?,
            args.int(variant, "bias")?,
            args.expr(variant, "data")?,
        )))
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::PutI(put)) => Ok(put.clone()),
            StmtPayload::Raw {
                arena,
                body: RawStmtBody::PutI(handle),
            } => {
                let raw = arena.put_i(*handle)?;
                Ok(Self::new(PutIDetails::new(
                    raw.descr.clone(),
                    arena.copy_expr(raw.ix)?,
                    raw.bias,
                    arena.copy_expr(raw.data)?,
                )))
            }
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        vec![&self.details.ix, &self.details.data]
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        let raw = RawPutI {
            descr: self.details.descr.clone(),
            ix: arena.lower_expr(&self.details.ix)?,
            bias: self.details.bias,
            data: arena.lower_expr(&self.details.data)?,
        };
        Ok(RawStmtBody::PutI(arena.alloc_put_i(raw)?))
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::PutI(v) => Some(v),
            _ => None,
        }
    }
}

/// Assignment to a temporary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WrTmp {
    tmp: Temp,
    data: Expr,
}

impl WrTmp {
    /// `tmp = data`; the temporary must be a real one
    pub fn new(tmp: Temp, data: Expr) -> Result<Self> {
        if tmp.is_invalid() {
            return Err(Error::invalid("tmp", "temporary id is the INVALID sentinel"));
        }
        Ok(Self { tmp, data })
    }

    /// Destination temporary
    pub fn tmp(&self) -> Temp {
        self.tmp
    }

    /// Value assigned
    pub fn data(&self) -> &Expr {
        &self.data
    }
}

impl StmtVariant for WrTmp {
    const TAG: StmtTag = StmtTag::WrTmp;
    const FIELDS: &'static [&'static str] = &["tmp", "data"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        let tmp = args.temp(variant, "tmp")?;
        let data = args.expr(variant, "data")?;
        Self::new(tmp, data)
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::WrTmp(wr)) => Ok(wr.clone()),
            StmtPayload::Raw {
                arena,
                body: RawStmtBody::WrTmp { tmp, data },
            } => malformed(Self::TAG, Self::new(*tmp, arena.copy_expr(*data)?)),
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        vec![&self.data]
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        Ok(RawStmtBody::WrTmp {
            tmp: self.tmp,
            data: arena.lower_expr(&self.data)?,
        })
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::WrTmp(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Const, IrType};

    #[test]
    fn test_put_flatness() {
        let args = StmtArgs::new()
            .with("offset", 16i64)
            .with("data", Expr::rd_tmp(0));
        let put = Put::from_args(&args).unwrap();
        assert_eq!(put.offset(), 16);
        assert_eq!(put.data(), &Expr::rd_tmp(0));
        assert!(put.is_flat());

        assert!(!Put::new(16, Expr::get(24, IrType::I64)).is_flat());
    }

    #[test]
    fn test_put_missing_data() {
        let args = StmtArgs::new().with("offset", 16i64);
        assert_eq!(
            Put::from_args(&args),
            Err(Error::MissingArgument {
                variant: "Ist_Put",
                field: "data"
            })
        );
    }

    #[test]
    fn test_puti_keywords() {
        let descr = RegArray::new(96, IrType::F64, 8).unwrap();
        let args = StmtArgs::new()
            .with("description", descr.clone())
            .with("index", Expr::rd_tmp(1))
            .with("bias", 7i64)
            .with("data", Expr::constant(Const::F64(0)));
        let put = PutI::from_args(&args).unwrap();
        assert_eq!(put.descr(), &descr);
        assert_eq!(put.bias(), 7);
        assert_eq!(put.sub_exprs().len(), 2);
        assert!(put.is_flat());
    }

    #[test]
    fn test_wrtmp_flatness() {
        let nested = WrTmp::new(Temp(1), Expr::get(16, IrType::I64)).unwrap();
        assert!(!nested.is_flat());

        let atom = WrTmp::new(Temp(1), Expr::rd_tmp(0)).unwrap();
        assert!(atom.is_flat());
    }

    #[test]
    fn test_wrtmp_rejects_sentinel() {
        assert!(WrTmp::new(Temp::INVALID, Expr::rd_tmp(0)).is_err());
        let args = StmtArgs::new()
            .with("tmp", Expr::rd_tmp(0))
            .with("data", Expr::rd_tmp(0));
        assert!(matches!(
            WrTmp::from_args(&args),
            Err(Error::TypeMismatch { expected: "int", .. })
        ));
    }

    #[test]
    fn test_raw_wrtmp_with_sentinel_is_corrupt() {
        let mut arena = NodeArena::new();
        let data = arena.alloc_expr(crate::arena::RawExpr::RdTmp(Temp(0))).unwrap();
        let stmt = arena
            .alloc_stmt(RawStmtBody::WrTmp {
                tmp: Temp::INVALID,
                data,
            })
            .unwrap();
        assert!(matches!(
            WrTmp::from_borrowed(arena.view_stmt(stmt)),
            Err(Error::CorruptNode {
                tag: "Ist_WrTmp",
                ..
            })
        ));
    }
}
