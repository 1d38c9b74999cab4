//! IR expressions referenced by statements
//!
//! Only the surface statements rely on is modelled here: the expression kind,
//! atomicity, and owned trees that can be deep-copied out of an arena.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::constant::Const;
use super::descr::{Callee, RegArray};
use super::enums::{Endness, ExprTag, IrType};
use crate::arena::ownership::BorrowedExpr;
use crate::error::{Error, Result};

/// Block-scoped temporary (SSA virtual register)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Temp(pub u32);

impl Temp {
    /// Low-level "no temporary" sentinel
    pub const INVALID: Temp = Temp(u32::MAX);

    /// Creates a temporary with the given id
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Numeric id
    pub fn id(self) -> u32 {
        self.0
    }

    /// Whether this is the `INVALID` sentinel
    pub fn is_invalid(self) -> bool {
        self == Temp::INVALID
    }

    /// Maps the sentinel to `None`
    pub fn to_option(self) -> Option<Temp> {
        if self.is_invalid() {
            None
        } else {
            Some(self)
        }
    }

    /// Maps `None` to the sentinel
    pub fn from_option(tmp: Option<Temp>) -> Temp {
        tmp.unwrap_or(Temp::INVALID)
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            f.write_str("t_INVALID")
        } else {
            write!(f, "t{}", self.0)
        }
    }
}

/// Primitive operation name (`Iop_Add64`, `Iop_Not1`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrOp(String);

impl IrOp {
    /// Creates an operation from its `Iop_` name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.len() <= 4 || !name.starts_with("Iop_") {
            return Err(Error::UnknownName {
                enumeration: "IROp",
                name,
            });
        }
        Ok(Self(name))
    }

    /// Full name including the `Iop_` prefix
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Name without the prefix, as printed inside IR text
    pub fn short_name(&self) -> &str {
        &self.0[4..]
    }
}

/// Owned expression tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Read a guest register at a fixed offset
    Get {
        /// Register-file offset
        offset: i32,
        /// Type read
        ty: IrType,
    },
    /// Read a guest register at a computed offset
    GetI {
        /// Array shape
        descr: RegArray,
        /// Variable index
        ix: Box<Expr>,
        /// Constant index bias
        bias: i32,
    },
    /// Read a temporary
    RdTmp(Temp),
    /// Binary operation
    Binop {
        /// Operation
        op: IrOp,
        /// Left operand
        arg1: Box<Expr>,
        /// Right operand
        arg2: Box<Expr>,
    },
    /// Unary operation
    Unop {
        /// Operation
        op: IrOp,
        /// Operand
        arg: Box<Expr>,
    },
    /// Load from memory
    Load {
        /// Byte order
        end: Endness,
        /// Type loaded
        ty: IrType,
        /// Address
        addr: Box<Expr>,
    },
    /// Constant
    Const(Const),
    /// If-then-else
    Ite {
        /// Condition (`Ity_I1`)
        cond: Box<Expr>,
        /// Value when true
        iftrue: Box<Expr>,
        /// Value when false
        iffalse: Box<Expr>,
    },
    /// Pure helper call
    CCall {
        /// Helper
        callee: Callee,
        /// Return type
        ret_ty: IrType,
        /// Arguments
        args: Vec<Expr>,
    },
}

impl Expr {
    /// `RdTmp(t)`
    pub fn rd_tmp(tmp: u32) -> Self {
        Expr::RdTmp(Temp(tmp))
    }

    /// `Const(c)`
    pub fn constant(value: Const) -> Self {
        Expr::Const(value)
    }

    /// `Get(offset, ty)`
    pub fn get(offset: i32, ty: IrType) -> Self {
        Expr::Get { offset, ty }
    }

    /// `GetI(descr, ix, bias)`
    pub fn get_i(descr: RegArray, ix: Expr, bias: i32) -> Self {
        Expr::GetI {
            descr,
            ix: Box::new(ix),
            bias,
        }
    }

    /// `Binop(op, arg1, arg2)`
    pub fn binop(op: &str, arg1: Expr, arg2: Expr) -> Result<Self> {
        Ok(Expr::Binop {
            op: IrOp::new(op)?,
            arg1: Box::new(arg1),
            arg2: Box::new(arg2),
        })
    }

    /// `Unop(op, arg)`
    pub fn unop(op: &str, arg: Expr) -> Result<Self> {
        Ok(Expr::Unop {
            op: IrOp::new(op)?,
            arg: Box::new(arg),
        })
    }

    /// `Load(end, ty, addr)`
    pub fn load(end: Endness, ty: IrType, addr: Expr) -> Self {
        Expr::Load {
            end,
            ty,
            addr: Box::new(addr),
        }
    }

    /// `ITE(cond, iftrue, iffalse)`
    pub fn ite(cond: Expr, iftrue: Expr, iffalse: Expr) -> Self {
        Expr::Ite {
            cond: Box::new(cond),
            iftrue: Box::new(iftrue),
            iffalse: Box::new(iffalse),
        }
    }

    /// `CCall(callee, ret_ty, args)`
    pub fn ccall(callee: Callee, ret_ty: IrType, args: Vec<Expr>) -> Self {
        Expr::CCall {
            callee,
            ret_ty,
            args,
        }
    }

    /// Expression kind
    pub fn tag(&self) -> ExprTag {
        match self {
            Expr::Get { .. } => ExprTag::Get,
            Expr::GetI { .. } => ExprTag::GetI,
            Expr::RdTmp(_) => ExprTag::RdTmp,
            Expr::Binop { .. } => ExprTag::Binop,
            Expr::Unop { .. } => ExprTag::Unop,
            Expr::Load { .. } => ExprTag::Load,
            Expr::Const(_) => ExprTag::Const,
            Expr::Ite { .. } => ExprTag::Ite,
            Expr::CCall { .. } => ExprTag::CCall,
        }
    }

    /// Atoms are temporaries and constants
    pub fn is_atom(&self) -> bool {
        matches!(self, Expr::RdTmp(_) | Expr::Const(_))
    }

    /// Borrowed view of this expression, without copying
    pub fn view(&self) -> BorrowedExpr<'_> {
        BorrowedExpr::Owned(self)
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        1 + match self {
            Expr::Get { .. } | Expr::RdTmp(_) | Expr::Const(_) => 0,
            Expr::GetI { ix, .. } => ix.node_count(),
            Expr::Binop { arg1, arg2, .. } => arg1.node_count() + arg2.node_count(),
            Expr::Unop { arg, .. } => arg.node_count(),
            Expr::Load { addr, .. } => addr.node_count(),
            Expr::Ite {
                cond,
                iftrue,
                iffalse,
            } => cond.node_count() + iftrue.node_count() + iffalse.node_count(),
            Expr::CCall { args, .. } => args.iter().map(Expr::node_count).sum(),
        }
    }
}

impl From<Const> for Expr {
    fn from(value: Const) -> Self {
        Expr::Const(value)
    }
}

impl From<Temp> for Expr {
    fn from(tmp: Temp) -> Self {
        Expr::RdTmp(tmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atoms() {
        assert!(Expr::rd_tmp(0).is_atom());
        assert!(Expr::constant(Const::U32(7)).is_atom());
        assert!(!Expr::get(16, IrType::I64).is_atom());

        let add = Expr::binop("Iop_Add64", Expr::rd_tmp(1), Expr::rd_tmp(2)).unwrap();
        assert!(!add.is_atom());
        assert_eq!(add.tag(), ExprTag::Binop);
        assert_eq!(add.node_count(), 3);
    }

    #[test]
    fn test_op_names() {
        let op = IrOp::new("Iop_Add64").unwrap();
        assert_eq!(op.short_name(), "Add64");
        assert!(IrOp::new("Add64").is_err());
        assert!(IrOp::new("Iop_").is_err());
    }

    #[test]
    fn test_temp_sentinel() {
        assert_eq!(Temp::INVALID.to_option(), None);
        assert_eq!(Temp(0).to_option(), Some(Temp(0)));
        assert_eq!(Temp::from_option(None), Temp::INVALID);
        assert_eq!(Temp(3).to_string(), "t3");
    }
}
