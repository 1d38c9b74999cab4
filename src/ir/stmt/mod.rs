//! IR statements
//!
//! `Stmt` is a closed sum over the twelve statement kinds plus `Unknown`, the
//! degraded form the factory produces for a discriminant it has no variant
//! for. Each kind is its own struct implementing [`StmtVariant`], grouped by
//! family:
//!
//! | Module | Variants |
//! |--------|----------|
//! | `marks` | `NoOp`, `IMark`, `AbiHint`, `Mbe` |
//! | `registers` | `Put`, `PutI`, `WrTmp` |
//! | `memory` | `Store`, `Cas`, `Llsc` |
//! | `dirty` | `Dirty` |
//! | `control` | `Exit` |
//!
//! Statements own every expression they reference and are immutable once
//! built.

pub mod control;
pub mod dirty;
pub mod marks;
pub mod memory;
pub mod registers;

pub use control::Exit;
pub use dirty::{Dirty, FxState, MAX_FX_STATE};
pub use marks::{AbiHint, IMark, Mbe, NoOp};
pub use memory::{Cas, CasDetails, Llsc, LlscOp, Store};
pub use registers::{Put, PutI, PutIDetails, WrTmp};

use serde::Serialize;

use super::args::StmtArgs;
use super::enums::StmtTag;
use super::expr::Expr;
use crate::arena::ownership::BorrowedStmt;
use crate::arena::{NodeArena, RawStmtBody, StmtHandle};
use crate::error::{Error, Result};

/// Contract shared by every statement kind
pub trait StmtVariant: Sized + Clone + Into<Stmt> {
    /// Tag identifying the kind
    const TAG: StmtTag;

    /// Keyword names accepted by [`StmtVariant::from_args`]
    const FIELDS: &'static [&'static str];

    /// Keyword construction; validates every argument before building
    fn from_args(args: &StmtArgs) -> Result<Self>;

    /// Wrap construction: deep-copies the viewed node
    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self>;

    /// Expressions held directly by the statement
    fn sub_exprs(&self) -> Vec<&Expr>;

    /// Writes the payload into `arena` in the canonical layout
    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody>;

    /// The variant held by `stmt`, if it is this kind
    fn project(stmt: &Stmt) -> Option<&Self>;

    /// Every directly held expression is a temporary or a constant
    fn is_flat(&self) -> bool {
        self.sub_exprs().iter().all(|expr| expr.is_atom())
    }
}

/// Statement whose discriminant has no registered variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnknownStmt {
    raw_tag: u32,
}

impl UnknownStmt {
    /// Degraded statement carrying only its raw discriminant
    pub fn new(raw_tag: u32) -> Self {
        Self { raw_tag }
    }

    /// Raw discriminant
    pub fn raw_tag(&self) -> u32 {
        self.raw_tag
    }
}

/// IR statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stmt {
    /// `Ist_NoOp`
    NoOp(NoOp),
    /// `Ist_IMark`
    IMark(IMark),
    /// `Ist_AbiHint`
    AbiHint(AbiHint),
    /// `Ist_Put`
    Put(Put),
    /// `Ist_PutI`
    PutI(PutI),
    /// `Ist_WrTmp`
    WrTmp(WrTmp),
    /// `Ist_Store`
    Store(Store),
    /// `Ist_CAS`
    Cas(Cas),
    /// `Ist_LLSC`
    Llsc(Llsc),
    /// `Ist_Dirty`
    Dirty(Dirty),
    /// `Ist_MBE`
    Mbe(Mbe),
    /// `Ist_Exit`
    Exit(Exit),
    /// Discriminant outside the closed set
    Unknown(UnknownStmt),
}

macro_rules! with_variant {
    ($stmt:expr, $v:ident => $known:expr, $u:ident => $unknown:expr) => {
        match $stmt {
            Stmt::NoOp($v) => $known,
            Stmt::IMark($v) => $known,
            Stmt::AbiHint($v) => $known,
            Stmt::Put($v) => $known,
            Stmt::PutI($v) => $known,
            Stmt::WrTmp($v) => $known,
            Stmt::Store($v) => $known,
            Stmt::Cas($v) => $known,
            Stmt::Llsc($v) => $known,
            Stmt::Dirty($v) => $known,
            Stmt::Mbe($v) => $known,
            Stmt::Exit($v) => $known,
            Stmt::Unknown($u) => $unknown,
        }
    };
}

/// Reads the tag of a variant value without naming its type
fn tag_of<V: StmtVariant>(_: &V) -> StmtTag {
    V::TAG
}

impl Stmt {
    /// Known tag; `None` for [`Stmt::Unknown`]
    pub fn tag(&self) -> Option<StmtTag> {
        with_variant!(self, v => Some(tag_of(v)), _u => None)
    }

    /// Raw discriminant
    pub fn raw_tag(&self) -> u32 {
        with_variant!(self, v => tag_of(v).raw(), u => u.raw_tag())
    }

    /// Tag name, or the hex discriminant for an unknown statement
    pub fn tag_name(&self) -> String {
        match self.tag() {
            Some(tag) => tag.name().to_string(),
            None => format!("{:#x}", self.raw_tag()),
        }
    }

    /// Expressions held directly by the statement
    pub fn sub_exprs(&self) -> Vec<&Expr> {
        with_variant!(self, v => v.sub_exprs(), _u => Vec::new())
    }

    /// Whether every directly held expression is atomic
    pub fn is_flat(&self) -> bool {
        with_variant!(self, v => v.is_flat(), _u => true)
    }

    /// The payload as variant `V`, if the statement is that kind
    pub fn variant<V: StmtVariant>(&self) -> Option<&V> {
        V::project(self)
    }

    /// Borrowed view, without copying
    pub fn view(&self) -> BorrowedStmt<'_> {
        BorrowedStmt::Owned(self)
    }

    /// Writes the statement into `arena`
    pub fn materialize(&self, arena: &mut NodeArena) -> Result<StmtHandle> {
        arena.lower_stmt(self)
    }

    pub(crate) fn lower_body(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        with_variant!(
            self,
            v => v.lower(arena),
            u => Err(Error::UnsupportedVariant { raw_tag: u.raw_tag() })
        )
    }
}

macro_rules! stmt_from {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Stmt {
                fn from(v: $variant) -> Self {
                    Stmt::$variant(v)
                }
            }
        )+
    };
}

stmt_from!(NoOp, IMark, AbiHint, Put, PutI, WrTmp, Store, Cas, Llsc, Dirty, Mbe, Exit);

impl From<UnknownStmt> for Stmt {
    fn from(v: UnknownStmt) -> Self {
        Stmt::Unknown(v)
    }
}
