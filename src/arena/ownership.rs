//! Borrowed views and deep copies between arenas and owned trees
//!
//! A view is either a handle into a [`NodeArena`] or a reference to an owned
//! node. Wrapping reads a view and produces owned storage that never aliases
//! the source; lowering goes the other way and writes owned nodes back into
//! the arena layout.

use super::{ExprHandle, NodeArena, RawExpr, RawStmtBody, StmtHandle};
use crate::error::{Error, Result};
use crate::factory::{self, Wrapped};
use crate::ir::{Expr, ExprTag, Stmt, StmtTag};

/// Transient view onto an expression
#[derive(Debug, Clone, Copy)]
pub enum BorrowedExpr<'a> {
    /// Node inside an arena
    Arena {
        /// Owning arena
        arena: &'a NodeArena,
        /// Node handle
        handle: ExprHandle,
    },
    /// Owned tree
    Owned(&'a Expr),
}

impl<'a> BorrowedExpr<'a> {
    /// Expression kind
    pub fn tag(&self) -> Result<ExprTag> {
        Ok(match self {
            BorrowedExpr::Owned(expr) => expr.tag(),
            BorrowedExpr::Arena { arena, handle } => match arena.expr(*handle)? {
                RawExpr::Get { .. } => ExprTag::Get,
                RawExpr::GetI { .. } => ExprTag::GetI,
                RawExpr::RdTmp(_) => ExprTag::RdTmp,
                RawExpr::Binop { .. } => ExprTag::Binop,
                RawExpr::Unop { .. } => ExprTag::Unop,
                RawExpr::Load { .. } => ExprTag::Load,
                RawExpr::Const(_) => ExprTag::Const,
                RawExpr::Ite { .. } => ExprTag::Ite,
                RawExpr::CCall { .. } => ExprTag::CCall,
            },
        })
    }

    /// Whether the viewed expression is a temporary or a constant
    pub fn is_atom(&self) -> Result<bool> {
        Ok(matches!(self.tag()?, ExprTag::RdTmp | ExprTag::Const))
    }

    /// Deep copy into an owned tree
    pub fn copy_out(&self) -> Result<Expr> {
        copy_out_expr(*self)
    }
}

/// Transient view onto a statement
#[derive(Debug, Clone, Copy)]
pub enum BorrowedStmt<'a> {
    /// Node inside an arena
    Arena {
        /// Owning arena
        arena: &'a NodeArena,
        /// Node handle
        handle: StmtHandle,
    },
    /// Owned statement
    Owned(&'a Stmt),
}

impl<'a> BorrowedStmt<'a> {
    /// Raw discriminant of the viewed statement
    pub fn raw_tag(&self) -> Result<u32> {
        match self {
            BorrowedStmt::Owned(stmt) => Ok(stmt.raw_tag()),
            BorrowedStmt::Arena { arena, handle } => Ok(arena.stmt(*handle)?.tag),
        }
    }

    /// Known tag, or `None` for a discriminant outside the closed set
    pub fn tag(&self) -> Result<Option<StmtTag>> {
        Ok(StmtTag::from_raw(self.raw_tag()?).ok())
    }

    /// Deep copy into an owned statement
    pub fn copy_out(&self) -> Result<Stmt> {
        copy_out(*self)
    }

    /// Resolves the view for a variant expecting `expected`.
    ///
    /// Fails with `TypeMismatch` when the node carries another tag.
    pub(crate) fn payload(&self, expected: StmtTag) -> Result<StmtPayload<'a>> {
        match *self {
            BorrowedStmt::Owned(stmt) => {
                if stmt.tag() != Some(expected) {
                    return Err(Error::mismatch("stmt", expected.name(), stmt.tag_name()));
                }
                Ok(StmtPayload::Owned(stmt))
            }
            BorrowedStmt::Arena { arena, handle } => {
                let raw = arena.stmt(handle)?;
                if raw.tag != expected.raw() {
                    let got = StmtTag::name_of_raw(raw.tag)
                        .map(str::to_string)
                        .unwrap_or_else(|_| format!("{:#x}", raw.tag));
                    return Err(Error::mismatch("stmt", expected.name(), got));
                }
                Ok(StmtPayload::Raw {
                    arena,
                    body: &raw.body,
                })
            }
        }
    }
}

/// Statement payload whose tag already matched the expected variant
#[derive(Debug, Clone, Copy)]
pub(crate) enum StmtPayload<'a> {
    Raw {
        arena: &'a NodeArena,
        body: &'a RawStmtBody,
    },
    Owned(&'a Stmt),
}

impl<'a> StmtPayload<'a> {
    /// Error for a payload the variant could not destructure
    pub(crate) fn unexpected(&self, expected: StmtTag) -> Error {
        match self {
            StmtPayload::Raw { body, .. } => Error::CorruptNode {
                tag: expected.name(),
                body: body.kind_name(),
            },
            StmtPayload::Owned(stmt) => {
                Error::mismatch("stmt", expected.name(), stmt.tag_name())
            }
        }
    }
}

/// Reports a builder failure on a raw body as a corrupt node.
///
/// Every field came from the arena, so there is no argument the caller could
/// fix and retry with.
pub(crate) fn malformed<T>(expected: StmtTag, result: Result<T>) -> Result<T> {
    result.map_err(|err| match err {
        Error::InvalidArgument { field, reason } => {
            tracing::debug!(tag = expected.name(), %field, %reason, "raw node violates a builder invariant");
            Error::CorruptNode {
                tag: expected.name(),
                body: "malformed",
            }
        }
        other => other,
    })
}

/// Deep-copies a viewed expression into fresh owned storage
pub fn copy_out_expr(view: BorrowedExpr<'_>) -> Result<Expr> {
    match view {
        BorrowedExpr::Owned(expr) => Ok(expr.clone()),
        BorrowedExpr::Arena { arena, handle } => {
            tracing::trace!(index = handle.index(), "copying expression out of arena");
            copy_arena_expr(arena, handle)
        }
    }
}

/// Deep-copies a viewed statement through the factory
pub fn copy_out(view: BorrowedStmt<'_>) -> Result<Stmt> {
    factory::wrap(view).map(Wrapped::into_stmt)
}

/// View onto an owned statement, without copying
pub fn borrow_view(stmt: &Stmt) -> BorrowedStmt<'_> {
    BorrowedStmt::Owned(stmt)
}

fn copy_arena_expr(arena: &NodeArena, handle: ExprHandle) -> Result<Expr> {
    let copy = |child: ExprHandle| copy_arena_expr(arena, child).map(Box::new);
    Ok(match arena.expr(handle)? {
        RawExpr::Get { offset, ty } => Expr::Get {
            offset: *offset,
            ty: *ty,
        },
        RawExpr::GetI { descr, ix, bias } => Expr::GetI {
            descr: descr.clone(),
            ix: copy(*ix)?,
            bias: *bias,
        },
        RawExpr::RdTmp(tmp) => Expr::RdTmp(*tmp),
        RawExpr::Binop { op, arg1, arg2 } => Expr::Binop {
            op: op.clone(),
            arg1: copy(*arg1)?,
            arg2: copy(*arg2)?,
        },
        RawExpr::Unop { op, arg } => Expr::Unop {
            op: op.clone(),
            arg: copy(*arg)?,
        },
        RawExpr::Load { end, ty, addr } => Expr::Load {
            end: *end,
            ty: *ty,
            addr: copy(*addr)?,
        },
        RawExpr::Const(value) => Expr::Const(*value),
        RawExpr::Ite {
            cond,
            iftrue,
            iffalse,
        } => Expr::Ite {
            cond: copy(*cond)?,
            iftrue: copy(*iftrue)?,
            iffalse: copy(*iffalse)?,
        },
        RawExpr::CCall {
            callee,
            ret_ty,
            args,
        } => Expr::CCall {
            callee: callee.clone(),
            ret_ty: *ret_ty,
            args: arena.copy_exprs(args, "CCall args")?,
        },
    })
}

impl NodeArena {
    /// View onto a statement in this arena
    pub fn view_stmt(&self, handle: StmtHandle) -> BorrowedStmt<'_> {
        BorrowedStmt::Arena {
            arena: self,
            handle,
        }
    }

    /// View onto an expression in this arena
    pub fn view_expr(&self, handle: ExprHandle) -> BorrowedExpr<'_> {
        BorrowedExpr::Arena {
            arena: self,
            handle,
        }
    }

    /// Deep-copies one expression out of this arena
    pub(crate) fn copy_expr(&self, handle: ExprHandle) -> Result<Expr> {
        copy_arena_expr(self, handle)
    }

    /// Deep-copies a handle list into a vector reserved up front
    pub(crate) fn copy_exprs(&self, handles: &[ExprHandle], resource: &'static str) -> Result<Vec<Expr>> {
        let mut out = Vec::new();
        out.try_reserve_exact(handles.len())
            .map_err(|_| Error::AllocationFailure {
                resource,
                requested: handles.len(),
            })?;
        for handle in handles {
            out.push(copy_arena_expr(self, *handle)?);
        }
        Ok(out)
    }

    /// Writes an owned expression tree into this arena, children first.
    ///
    /// Fails with `BudgetExceeded` before descending past the depth budget.
    pub fn lower_expr(&mut self, expr: &Expr) -> Result<ExprHandle> {
        self.lower_expr_at(expr, 1)
    }

    /// Lowers each expression in order
    pub fn lower_exprs(&mut self, exprs: &[Expr]) -> Result<Vec<ExprHandle>> {
        self.lower_exprs_at(exprs, 1)
    }

    fn lower_exprs_at(&mut self, exprs: &[Expr], level: u32) -> Result<Vec<ExprHandle>> {
        exprs.iter().map(|expr| self.lower_expr_at(expr, level)).collect()
    }

    fn lower_expr_at(&mut self, expr: &Expr, level: u32) -> Result<ExprHandle> {
        self.check_depth(level)?;
        let next = level.saturating_add(1);
        let raw = match expr {
            Expr::Get { offset, ty } => RawExpr::Get {
                offset: *offset,
                ty: *ty,
            },
            Expr::GetI { descr, ix, bias } => RawExpr::GetI {
                descr: descr.clone(),
                ix: self.lower_expr_at(ix, next)?,
                bias: *bias,
            },
            Expr::RdTmp(tmp) => RawExpr::RdTmp(*tmp),
            Expr::Binop { op, arg1, arg2 } => RawExpr::Binop {
                op: op.clone(),
                arg1: self.lower_expr_at(arg1, next)?,
                arg2: self.lower_expr_at(arg2, next)?,
            },
            Expr::Unop { op, arg } => RawExpr::Unop {
                op: op.clone(),
                arg: self.lower_expr_at(arg, next)?,
            },
            Expr::Load { end, ty, addr } => RawExpr::Load {
                end: *end,
                ty: *ty,
                addr: self.lower_expr_at(addr, next)?,
            },
            Expr::Const(value) => RawExpr::Const(*value),
            Expr::Ite {
                cond,
                iftrue,
                iffalse,
            } => RawExpr::Ite {
                cond: self.lower_expr_at(cond, next)?,
                iftrue: self.lower_expr_at(iftrue, next)?,
                iffalse: self.lower_expr_at(iffalse, next)?,
            },
            Expr::CCall {
                callee,
                ret_ty,
                args,
            } => RawExpr::CCall {
                callee: callee.clone(),
                ret_ty: *ret_ty,
                args: self.lower_exprs_at(args, next)?,
            },
        };
        self.alloc_expr(raw)
    }

    /// Writes an owned statement into this arena in the canonical layout
    pub fn lower_stmt(&mut self, stmt: &Stmt) -> Result<StmtHandle> {
        let body = stmt.lower_body(self)?;
        let handle = self.alloc_stmt(body)?;
        tracing::trace!(tag = %stmt.tag_name(), index = handle.index(), "lowered statement");
        Ok(handle)
    }
}
