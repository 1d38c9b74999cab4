//! # Low-level node arena
//!
//! A `NodeArena` is the transient store a decoder fills while lifting one
//! block. Nodes are addressed by handles, laid out the way the canonical IR
//! lays them out: `Temp::INVALID` sentinels instead of options, nullable
//! handles, and out-of-line detail records for `PutI`, `CAS` and `Dirty`.
//!
//! A node may only reference handles that already exist, so arena graphs are
//! acyclic. Wrapping never mutates an arena; see [`ownership`] for the
//! borrowed views and the copy-out into owned trees.

pub mod ownership;

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ir::{
    Callee, Const, Effect, Endness, FxState, IrOp, IrType, JumpKind, MBusEvent, RegArray,
    StmtTag, Temp,
};

const STMT_BASE_ESTIMATED_BYTES: u64 = 32;
const EXPR_BASE_ESTIMATED_BYTES: u64 = 24;
const DETAILS_BASE_ESTIMATED_BYTES: u64 = 48;
const HANDLE_ESTIMATED_BYTES: u64 = 8;
const FX_STATE_ESTIMATED_BYTES: u64 = 8;

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            index: u32,
            arena: u32,
        }

        impl $name {
            const KIND: &'static str = $kind;

            /// Slot index inside the owning arena
            pub const fn index(self) -> u32 {
                self.index
            }

            /// Id of the arena that minted this handle
            pub const fn arena_id(self) -> u32 {
                self.arena
            }
        }
    };
}

arena_handle!(
    /// Handle to a raw statement
    StmtHandle,
    "statement"
);
arena_handle!(
    /// Handle to a raw expression
    ExprHandle,
    "expression"
);
arena_handle!(
    /// Handle to an out-of-line `PutI` record
    PutIHandle,
    "PutI details"
);
arena_handle!(
    /// Handle to an out-of-line `CAS` record
    CasHandle,
    "CAS details"
);
arena_handle!(
    /// Handle to an out-of-line `Dirty` record
    DirtyHandle,
    "Dirty details"
);

/// Budget dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaBudgetKind {
    /// Raw statements
    Statements,
    /// Raw expressions
    Expressions,
    /// Detail records
    Details,
    /// Estimated bytes
    Bytes,
    /// Expression nesting depth
    Depth,
}

/// Upper bounds on what one arena may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaBudget {
    /// Maximum raw statements
    pub max_statements: u32,
    /// Maximum raw expressions
    pub max_expressions: u32,
    /// Maximum detail records of all kinds
    pub max_details: u32,
    /// Maximum estimated bytes
    pub max_bytes: u64,
    /// Maximum expression nesting; a leaf has depth 1. Copy-out and
    /// lowering recurse once per level.
    pub max_expr_depth: u32,
}

impl Default for ArenaBudget {
    fn default() -> Self {
        Self {
            max_statements: 65_536,
            max_expressions: 262_144,
            max_details: 65_536,
            max_bytes: 16 * 1024 * 1024,
            max_expr_depth: 256,
        }
    }
}

/// Raw expression; children are handles into the same arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawExpr {
    /// Fixed-offset register read
    Get {
        /// Register-file offset
        offset: i32,
        /// Type read
        ty: IrType,
    },
    /// Indexed register read
    GetI {
        /// Array shape
        descr: RegArray,
        /// Index
        ix: ExprHandle,
        /// Bias
        bias: i32,
    },
    /// Temporary read
    RdTmp(Temp),
    /// Binary operation
    Binop {
        /// Operation
        op: IrOp,
        /// Left operand
        arg1: ExprHandle,
        /// Right operand
        arg2: ExprHandle,
    },
    /// Unary operation
    Unop {
        /// Operation
        op: IrOp,
        /// Operand
        arg: ExprHandle,
    },
    /// Memory load
    Load {
        /// Byte order
        end: Endness,
        /// Type loaded
        ty: IrType,
        /// Address
        addr: ExprHandle,
    },
    /// Constant
    Const(Const),
    /// If-then-else
    Ite {
        /// Condition
        cond: ExprHandle,
        /// Value when true
        iftrue: ExprHandle,
        /// Value when false
        iffalse: ExprHandle,
    },
    /// Pure helper call
    CCall {
        /// Helper
        callee: Callee,
        /// Return type
        ret_ty: IrType,
        /// Arguments
        args: Vec<ExprHandle>,
    },
}

impl RawExpr {
    fn children(&self) -> Vec<ExprHandle> {
        match self {
            RawExpr::Get { .. } | RawExpr::RdTmp(_) | RawExpr::Const(_) => Vec::new(),
            RawExpr::GetI { ix, .. } => vec![*ix],
            RawExpr::Binop { arg1, arg2, .. } => vec![*arg1, *arg2],
            RawExpr::Unop { arg, .. } => vec![*arg],
            RawExpr::Load { addr, .. } => vec![*addr],
            RawExpr::Ite {
                cond,
                iftrue,
                iffalse,
            } => vec![*cond, *iftrue, *iffalse],
            RawExpr::CCall { args, .. } => args.clone(),
        }
    }

    fn estimated_bytes(&self) -> u64 {
        EXPR_BASE_ESTIMATED_BYTES
            + match self {
                RawExpr::Binop { op, .. } | RawExpr::Unop { op, .. } => op.name().len() as u64,
                RawExpr::CCall { callee, args, .. } => {
                    callee.name().len() as u64 + args.len() as u64 * HANDLE_ESTIMATED_BYTES
                }
                _ => 0,
            }
    }
}

/// Out-of-line `PutI` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPutI {
    /// Array shape
    pub descr: RegArray,
    /// Index
    pub ix: ExprHandle,
    /// Bias
    pub bias: i32,
    /// Value written
    pub data: ExprHandle,
}

/// Out-of-line `CAS` record; a single CAS has `old_hi == Temp::INVALID`
/// and no `expd_hi`/`data_hi`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCas {
    /// High half of the old value
    pub old_hi: Temp,
    /// Low half of the old value
    pub old_lo: Temp,
    /// Byte order
    pub end: Endness,
    /// Address
    pub addr: ExprHandle,
    /// Expected high half
    pub expd_hi: Option<ExprHandle>,
    /// Expected low half
    pub expd_lo: ExprHandle,
    /// New high half
    pub data_hi: Option<ExprHandle>,
    /// New low half
    pub data_lo: ExprHandle,
}

/// Out-of-line `Dirty` record; `tmp == Temp::INVALID` means no result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDirty {
    /// Helper
    pub cee: Callee,
    /// Guard
    pub guard: ExprHandle,
    /// Arguments
    pub args: Vec<ExprHandle>,
    /// Result temporary
    pub tmp: Temp,
    /// Memory effect
    pub m_fx: Effect,
    /// Memory effect address
    pub m_addr: Option<ExprHandle>,
    /// Memory effect size
    pub m_size: u32,
    /// Guest-state effects
    pub fx_state: Vec<FxState>,
    /// Helper needs the guest state pointer
    pub needs_bbp: bool,
}

/// Raw statement body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStmtBody {
    /// `Ist_NoOp`
    NoOp,
    /// `Ist_IMark`
    IMark {
        /// Guest address
        addr: u64,
        /// Instruction length
        len: i32,
        /// PC delta
        delta: u8,
    },
    /// `Ist_AbiHint`
    AbiHint {
        /// Start of the undefined area
        base: ExprHandle,
        /// Length of the area
        len: i32,
        /// Next instruction address
        nia: ExprHandle,
    },
    /// `Ist_Put`
    Put {
        /// Register-file offset
        offset: i32,
        /// Value
        data: ExprHandle,
    },
    /// `Ist_PutI`
    PutI(PutIHandle),
    /// `Ist_WrTmp`
    WrTmp {
        /// Destination
        tmp: Temp,
        /// Value
        data: ExprHandle,
    },
    /// `Ist_Store`
    Store {
        /// Byte order
        end: Endness,
        /// Address
        addr: ExprHandle,
        /// Value
        data: ExprHandle,
    },
    /// `Ist_CAS`
    Cas(CasHandle),
    /// `Ist_LLSC`; `storedata: None` is a load-linked
    Llsc {
        /// Byte order
        end: Endness,
        /// Result temporary
        result: Temp,
        /// Address
        addr: ExprHandle,
        /// Value for store-conditional
        storedata: Option<ExprHandle>,
    },
    /// `Ist_Dirty`
    Dirty(DirtyHandle),
    /// `Ist_MBE`
    Mbe(MBusEvent),
    /// `Ist_Exit`
    Exit {
        /// Guard
        guard: ExprHandle,
        /// Jump kind
        jk: JumpKind,
        /// Destination
        dst: Const,
        /// Guest IP offset
        offs_ip: i32,
    },
    /// Body of a statement kind this crate has no layout for
    Opaque,
}

impl RawStmtBody {
    /// Tag a well-formed node with this body carries
    pub fn natural_tag(&self) -> Option<StmtTag> {
        Some(match self {
            RawStmtBody::NoOp => StmtTag::NoOp,
            RawStmtBody::IMark { .. } => StmtTag::IMark,
            RawStmtBody::AbiHint { .. } => StmtTag::AbiHint,
            RawStmtBody::Put { .. } => StmtTag::Put,
            RawStmtBody::PutI(_) => StmtTag::PutI,
            RawStmtBody::WrTmp { .. } => StmtTag::WrTmp,
            RawStmtBody::Store { .. } => StmtTag::Store,
            RawStmtBody::Cas(_) => StmtTag::Cas,
            RawStmtBody::Llsc { .. } => StmtTag::Llsc,
            RawStmtBody::Dirty(_) => StmtTag::Dirty,
            RawStmtBody::Mbe(_) => StmtTag::Mbe,
            RawStmtBody::Exit { .. } => StmtTag::Exit,
            RawStmtBody::Opaque => return None,
        })
    }

    /// Short description used in corruption reports
    pub fn kind_name(&self) -> &'static str {
        self.natural_tag().map_or("opaque", StmtTag::name)
    }
}

/// Raw statement: discriminant plus body, as produced by a decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStmt {
    /// Raw discriminant
    pub tag: u32,
    /// Payload
    pub body: RawStmtBody,
}

/// Transient low-level node store
#[derive(Debug)]
pub struct NodeArena {
    id: u32,
    stmts: Vec<RawStmt>,
    exprs: Vec<RawExpr>,
    expr_depths: Vec<u32>,
    put_is: Vec<RawPutI>,
    cases: Vec<RawCas>,
    dirties: Vec<RawDirty>,
    budget: ArenaBudget,
    bytes_used: u64,
}

impl NodeArena {
    /// Creates an arena with the default budget
    pub fn new() -> Self {
        Self::with_budget(ArenaBudget::default())
    }

    /// Creates an arena bounded by `budget`
    pub fn with_budget(budget: ArenaBudget) -> Self {
        Self {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            stmts: Vec::new(),
            exprs: Vec::new(),
            expr_depths: Vec::new(),
            put_is: Vec::new(),
            cases: Vec::new(),
            dirties: Vec::new(),
            budget,
            bytes_used: 0,
        }
    }

    /// Unique id stamped into every handle this arena mints
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Configured budget
    pub fn budget(&self) -> ArenaBudget {
        self.budget
    }

    /// Estimated bytes charged so far
    pub fn bytes_used(&self) -> u64 {
        self.bytes_used
    }

    /// Number of raw statements
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    /// Number of raw expressions
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Handles of all statements, in allocation order
    pub fn stmt_handles(&self) -> Vec<StmtHandle> {
        (0..self.stmts.len() as u32)
            .map(|index| StmtHandle {
                index,
                arena: self.id,
            })
            .collect()
    }

    /// Allocates an expression
    pub fn alloc_expr(&mut self, expr: RawExpr) -> Result<ExprHandle> {
        let mut depth = 1u32;
        for child in expr.children() {
            let slot = self.slot(ExprHandle::KIND, child.arena, child.index, self.exprs.len())?;
            depth = depth.max(self.expr_depths[slot].saturating_add(1));
        }
        self.check_depth(depth)?;
        let index = self.reserve(
            ArenaBudgetKind::Expressions,
            self.exprs.len(),
            self.budget.max_expressions,
            expr.estimated_bytes(),
        )?;
        self.exprs.push(expr);
        self.expr_depths.push(depth);
        Ok(ExprHandle {
            index,
            arena: self.id,
        })
    }

    /// Nesting depth of an expression; leaves are 1
    pub fn expr_depth(&self, handle: ExprHandle) -> Result<u32> {
        let slot = self.slot(ExprHandle::KIND, handle.arena, handle.index, self.exprs.len())?;
        Ok(self.expr_depths[slot])
    }

    /// Allocates a `PutI` record
    pub fn alloc_put_i(&mut self, details: RawPutI) -> Result<PutIHandle> {
        self.check_expr(details.ix)?;
        self.check_expr(details.data)?;
        self.reserve_details(DETAILS_BASE_ESTIMATED_BYTES)?;
        self.put_is.push(details);
        Ok(PutIHandle {
            index: index_of(self.put_is.len() - 1),
            arena: self.id,
        })
    }

    /// Allocates a `CAS` record
    pub fn alloc_cas(&mut self, details: RawCas) -> Result<CasHandle> {
        let handles = [
            Some(details.addr),
            details.expd_hi,
            Some(details.expd_lo),
            details.data_hi,
            Some(details.data_lo),
        ];
        for handle in handles.into_iter().flatten() {
            self.check_expr(handle)?;
        }
        self.reserve_details(DETAILS_BASE_ESTIMATED_BYTES)?;
        self.cases.push(details);
        Ok(CasHandle {
            index: index_of(self.cases.len() - 1),
            arena: self.id,
        })
    }

    /// Allocates a `Dirty` record
    pub fn alloc_dirty(&mut self, details: RawDirty) -> Result<DirtyHandle> {
        self.check_expr(details.guard)?;
        for handle in details.args.iter().copied().chain(details.m_addr) {
            self.check_expr(handle)?;
        }
        let bytes = DETAILS_BASE_ESTIMATED_BYTES
            + details.cee.name().len() as u64
            + details.args.len() as u64 * HANDLE_ESTIMATED_BYTES
            + details.fx_state.len() as u64 * FX_STATE_ESTIMATED_BYTES;
        self.reserve_details(bytes)?;
        self.dirties.push(details);
        Ok(DirtyHandle {
            index: index_of(self.dirties.len() - 1),
            arena: self.id,
        })
    }

    /// Allocates a statement tagged with its body's natural tag
    pub fn alloc_stmt(&mut self, body: RawStmtBody) -> Result<StmtHandle> {
        let tag = body
            .natural_tag()
            .ok_or_else(|| Error::invalid("tag", "opaque bodies need an explicit raw tag"))?;
        self.alloc_stmt_with_tag(tag.raw(), body)
    }

    /// Allocates a statement with an explicit raw tag, as a foreign decoder would
    pub fn alloc_stmt_with_tag(&mut self, tag: u32, body: RawStmtBody) -> Result<StmtHandle> {
        self.check_body(&body)?;
        let index = self.reserve(
            ArenaBudgetKind::Statements,
            self.stmts.len(),
            self.budget.max_statements,
            STMT_BASE_ESTIMATED_BYTES,
        )?;
        self.stmts.push(RawStmt { tag, body });
        Ok(StmtHandle {
            index,
            arena: self.id,
        })
    }

    /// Reads a statement
    pub fn stmt(&self, handle: StmtHandle) -> Result<&RawStmt> {
        let slot = self.slot(StmtHandle::KIND, handle.arena, handle.index, self.stmts.len())?;
        Ok(&self.stmts[slot])
    }

    /// Reads an expression
    pub fn expr(&self, handle: ExprHandle) -> Result<&RawExpr> {
        let slot = self.slot(ExprHandle::KIND, handle.arena, handle.index, self.exprs.len())?;
        Ok(&self.exprs[slot])
    }

    /// Reads a `PutI` record
    pub fn put_i(&self, handle: PutIHandle) -> Result<&RawPutI> {
        let slot = self.slot(PutIHandle::KIND, handle.arena, handle.index, self.put_is.len())?;
        Ok(&self.put_is[slot])
    }

    /// Reads a `CAS` record
    pub fn cas(&self, handle: CasHandle) -> Result<&RawCas> {
        let slot = self.slot(CasHandle::KIND, handle.arena, handle.index, self.cases.len())?;
        Ok(&self.cases[slot])
    }

    /// Reads a `Dirty` record
    pub fn dirty(&self, handle: DirtyHandle) -> Result<&RawDirty> {
        let slot = self.slot(DirtyHandle::KIND, handle.arena, handle.index, self.dirties.len())?;
        Ok(&self.dirties[slot])
    }

    fn check_depth(&self, depth: u32) -> Result<()> {
        let limit = self.budget.max_expr_depth;
        if depth > limit {
            tracing::debug!(limit, attempted = depth, "expression nesting too deep");
            return Err(Error::BudgetExceeded {
                kind: ArenaBudgetKind::Depth,
                limit: u64::from(limit),
                attempted: u64::from(depth),
            });
        }
        Ok(())
    }

    fn check_expr(&self, handle: ExprHandle) -> Result<()> {
        self.slot(ExprHandle::KIND, handle.arena, handle.index, self.exprs.len())
            .map(|_| ())
    }

    fn check_body(&self, body: &RawStmtBody) -> Result<()> {
        match body {
            RawStmtBody::NoOp
            | RawStmtBody::IMark { .. }
            | RawStmtBody::Mbe(_)
            | RawStmtBody::Opaque => Ok(()),
            RawStmtBody::AbiHint { base, nia, .. } => {
                self.check_expr(*base)?;
                self.check_expr(*nia)
            }
            RawStmtBody::Put { data, .. } | RawStmtBody::WrTmp { data, .. } => {
                self.check_expr(*data)
            }
            RawStmtBody::Store { addr, data, .. } => {
                self.check_expr(*addr)?;
                self.check_expr(*data)
            }
            RawStmtBody::Llsc {
                addr, storedata, ..
            } => {
                self.check_expr(*addr)?;
                storedata.map_or(Ok(()), |data| self.check_expr(data))
            }
            RawStmtBody::Exit { guard, .. } => self.check_expr(*guard),
            RawStmtBody::PutI(handle) => self.put_i(*handle).map(|_| ()),
            RawStmtBody::Cas(handle) => self.cas(*handle).map(|_| ()),
            RawStmtBody::Dirty(handle) => self.dirty(*handle).map(|_| ()),
        }
    }

    fn slot(&self, handle_kind: &'static str, arena: u32, index: u32, len: usize) -> Result<usize> {
        if arena != self.id {
            return Err(Error::ForeignHandle {
                handle_kind,
                expected: self.id,
                actual: arena,
                index,
            });
        }
        let slot = index as usize;
        if slot >= len {
            return Err(Error::DanglingHandle { handle_kind, index });
        }
        Ok(slot)
    }

    fn reserve_details(&mut self, bytes: u64) -> Result<u32> {
        let used = self.put_is.len() + self.cases.len() + self.dirties.len();
        self.reserve(
            ArenaBudgetKind::Details,
            used,
            self.budget.max_details,
            bytes,
        )
    }

    fn reserve(&mut self, kind: ArenaBudgetKind, used: usize, limit: u32, bytes: u64) -> Result<u32> {
        let attempted = used as u64 + 1;
        if attempted > u64::from(limit) {
            tracing::debug!(?kind, limit, attempted, "arena budget exhausted");
            return Err(Error::BudgetExceeded {
                kind,
                limit: u64::from(limit),
                attempted,
            });
        }
        let attempted_bytes = self.bytes_used.saturating_add(bytes);
        if attempted_bytes > self.budget.max_bytes {
            tracing::debug!(
                limit = self.budget.max_bytes,
                attempted = attempted_bytes,
                "arena byte budget exhausted"
            );
            return Err(Error::BudgetExceeded {
                kind: ArenaBudgetKind::Bytes,
                limit: self.budget.max_bytes,
                attempted: attempted_bytes,
            });
        }
        self.bytes_used = attempted_bytes;
        Ok(index_of(used))
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

fn index_of(slot: usize) -> u32 {
    u32::try_from(slot).unwrap_or(u32::MAX)
}
