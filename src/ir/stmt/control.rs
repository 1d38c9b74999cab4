//! Conditional side exits

use serde::Serialize;

use super::{Stmt, StmtVariant};
use crate::arena::ownership::{BorrowedStmt, StmtPayload};
use crate::arena::{NodeArena, RawStmtBody};
use crate::error::Result;
use crate::ir::{Const, Expr, JumpKind, StmtArgs, StmtTag};

/// Leaves the block for `dst` when `guard` holds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Exit {
    guard: Expr,
    jumpkind: JumpKind,
    dst: Const,
    offs_ip: i32,
}

impl Exit {
    /// `if (guard) { PUT(offs_ip) = dst; exit-<jumpkind> }`
    pub fn new(guard: Expr, jumpkind: JumpKind, dst: Const, offs_ip: i32) -> Self {
        Self {
            guard,
            jumpkind,
            dst,
            offs_ip,
        }
    }

    /// Exit condition
    pub fn guard(&self) -> &Expr {
        &self.guard
    }

    /// Kind of transfer
    pub fn jumpkind(&self) -> JumpKind {
        self.jumpkind
    }

    /// Destination address
    pub fn dst(&self) -> Const {
        self.dst
    }

    /// Offset of the guest instruction pointer
    pub fn offs_ip(&self) -> i32 {
        self.offs_ip
    }
}

impl StmtVariant for Exit {
    const TAG: StmtTag = StmtTag::Exit;
    const FIELDS: &'static [&'static str] = &["guard", "jumpkind", "dst", "offsIP"];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        let guard = args.expr(variant, "guard")?;
        let dst = args.constant(variant, "dst")?;
        let jumpkind = args.named_enum(variant, "jumpkind")?;
        let offs_ip = args.int(variant, "offsIP")?;
        Ok(Self::new(guard, jumpkind, dst, offs_ip))
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::Exit(exit)) => Ok(exit.clone()),
            StmtPayload::Raw {
                arena,
                body:
                    RawStmtBody::Exit {
                        guard,
                        jk,
                        dst,
                        offs_ip,
                    },
            } => Ok(Self::new(arena.copy_expr(*guard)?, *jk, *dst, *offs_ip)),
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        vec![&self.guard]
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        Ok(RawStmtBody::Exit {
            guard: arena.lower_expr(&self.guard)?,
            jk: self.jumpkind,
            dst: self.dst,
            offs_ip: self.offs_ip,
        })
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::Exit(v) => Some(v),
            _ => None,
        }
    }
}
