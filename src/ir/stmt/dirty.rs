//! Dirty helper calls
//!
//! A `Dirty` statement calls a helper with side effects the optimizer cannot
//! see, so it declares them: an optional memory range and up to
//! [`MAX_FX_STATE`] guest-state regions. The builders keep the declarations
//! consistent:
//!
//! - `mFx == Ifx_None` exactly when there is no memory address and size 0
//! - no guest-state entry uses `Ifx_None`
//! - a repeating entry (`n_repeats > 0`) has `repeat_len > size`; a
//!   non-repeating one has `repeat_len == 0`

use serde::{Deserialize, Serialize};

use super::{Stmt, StmtVariant};
use crate::arena::ownership::{malformed, BorrowedStmt, StmtPayload};
use crate::arena::{NodeArena, RawDirty, RawStmtBody};
use crate::error::{Error, Result};
use crate::ir::{Callee, Const, Effect, Expr, StmtArgs, StmtTag, Temp};

/// Highest number of guest-state effect entries
pub const MAX_FX_STATE: usize = 7;

/// Guest-state region a dirty helper reads or writes.
///
/// The region is `[offset, offset + size)`, repeated `n_repeats` more times
/// at a stride of `repeat_len` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FxState {
    /// Kind of access
    pub fx: Effect,
    /// Register-file offset
    pub offset: u16,
    /// Bytes accessed per repetition
    pub size: u16,
    /// Extra repetitions
    #[serde(rename = "nRepeats")]
    pub n_repeats: u8,
    /// Stride between repetitions
    #[serde(rename = "repeatLen")]
    pub repeat_len: u8,
}

impl FxState {
    /// Non-repeating region
    pub fn new(fx: Effect, offset: u16, size: u16) -> Self {
        Self {
            fx,
            offset,
            size,
            n_repeats: 0,
            repeat_len: 0,
        }
    }

    /// Region repeated `n_repeats` more times every `repeat_len` bytes
    pub fn repeating(fx: Effect, offset: u16, size: u16, n_repeats: u8, repeat_len: u8) -> Self {
        Self {
            fx,
            offset,
            size,
            n_repeats,
            repeat_len,
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        let field = || format!("fxState[{}]", index);
        if self.fx == Effect::None {
            return Err(Error::invalid(field(), "entry must not use Ifx_None"));
        }
        if self.n_repeats > 0 && u16::from(self.repeat_len) <= self.size {
            return Err(Error::invalid(
                field(),
                format!(
                    "repeatLen {} must exceed size {} when repeating",
                    self.repeat_len, self.size
                ),
            ));
        }
        if self.n_repeats == 0 && self.repeat_len != 0 {
            return Err(Error::invalid(field(), "repeatLen must be 0 without repeats"));
        }
        Ok(())
    }
}

/// Call to a helper with declared side effects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dirty {
    cee: Callee,
    guard: Expr,
    args: Vec<Expr>,
    tmp: Option<Temp>,
    m_fx: Effect,
    m_addr: Option<Expr>,
    m_size: u32,
    fx_state: Vec<FxState>,
    needs_bbp: bool,
}

impl Dirty {
    /// Call whose result is discarded
    pub fn new(cee: Callee, args: Vec<Expr>) -> Self {
        Self {
            cee,
            guard: Expr::constant(Const::U1(true)),
            args,
            tmp: None,
            m_fx: Effect::None,
            m_addr: None,
            m_size: 0,
            fx_state: Vec::new(),
            needs_bbp: false,
        }
    }

    /// Call whose result lands in `tmp`
    pub fn with_result(tmp: Temp, cee: Callee, args: Vec<Expr>) -> Result<Self> {
        if tmp.is_invalid() {
            return Err(Error::invalid("tmp", "temporary id is the INVALID sentinel"));
        }
        Ok(Self {
            tmp: Some(tmp),
            ..Self::new(cee, args)
        })
    }

    /// Only performs the call when `guard` is true
    pub fn with_guard(mut self, guard: Expr) -> Self {
        self.guard = guard;
        self
    }

    /// Declares the memory range the helper touches
    pub fn with_mem_effect(mut self, fx: Effect, addr: Option<Expr>, size: u32) -> Result<Self> {
        match (fx, &addr) {
            (Effect::None, None) if size == 0 => {}
            (Effect::None, _) => {
                return Err(Error::invalid(
                    "mFx",
                    "Ifx_None cannot carry a memory address or size",
                ))
            }
            (_, None) => {
                return Err(Error::invalid(
                    "mAddr",
                    format!("{} needs a memory address", fx),
                ))
            }
            (_, Some(_)) if size == 0 => {
                return Err(Error::invalid("mSize", format!("{} needs a non-zero size", fx)))
            }
            _ => {}
        }
        self.m_fx = fx;
        self.m_addr = addr;
        self.m_size = size;
        Ok(self)
    }

    /// Declares the guest-state regions the helper touches
    pub fn with_fx_state(mut self, entries: Vec<FxState>) -> Result<Self> {
        if entries.len() > MAX_FX_STATE {
            return Err(Error::invalid(
                "fxState",
                format!("at most {} entries, got {}", MAX_FX_STATE, entries.len()),
            ));
        }
        for (i, entry) in entries.iter().enumerate() {
            entry.validate(i)?;
        }
        self.fx_state = entries;
        Ok(self)
    }

    /// Whether the helper gets the guest state pointer as a hidden argument
    pub fn with_needs_bbp(mut self, needs_bbp: bool) -> Self {
        self.needs_bbp = needs_bbp;
        self
    }

    /// Helper being called
    pub fn cee(&self) -> &Callee {
        &self.cee
    }

    /// Call guard
    pub fn guard(&self) -> &Expr {
        &self.guard
    }

    /// Snapshot of the arguments
    pub fn args(&self) -> Vec<Expr> {
        self.args.clone()
    }

    /// Number of arguments
    pub fn n_args(&self) -> usize {
        self.args.len()
    }

    /// Result temporary, if the result is kept
    pub fn tmp(&self) -> Option<Temp> {
        self.tmp
    }

    /// Memory effect
    pub fn m_fx(&self) -> Effect {
        self.m_fx
    }

    /// Memory effect address
    pub fn m_addr(&self) -> Option<&Expr> {
        self.m_addr.as_ref()
    }

    /// Memory effect size in bytes
    pub fn m_size(&self) -> u32 {
        self.m_size
    }

    /// Snapshot of the guest-state effects
    pub fn fx_state(&self) -> Vec<FxState> {
        self.fx_state.clone()
    }

    /// Number of guest-state effects
    pub fn n_fx_state(&self) -> usize {
        self.fx_state.len()
    }

    /// Whether the helper needs the guest state pointer
    pub fn needs_bbp(&self) -> bool {
        self.needs_bbp
    }

    fn assemble(
        base: Dirty,
        guard: Option<Expr>,
        m_fx: Effect,
        m_addr: Option<Expr>,
        m_size: u32,
        fx_state: Vec<FxState>,
        needs_bbp: bool,
    ) -> Result<Self> {
        let dirty = match guard {
            Some(guard) => base.with_guard(guard),
            None => base,
        };
        dirty
            .with_mem_effect(m_fx, m_addr, m_size)?
            .with_fx_state(fx_state)
            .map(|d| d.with_needs_bbp(needs_bbp))
    }
}

impl StmtVariant for Dirty {
    const TAG: StmtTag = StmtTag::Dirty;
    const FIELDS: &'static [&'static str] = &[
        "regparms", "name", "addr", "args", "tmp", "guard", "mFx", "mAddr", "mSize", "needsBBP",
        "fxState",
    ];

    fn from_args(args: &StmtArgs) -> Result<Self> {
        let variant = Self::TAG.name();
        args.validate_fields(variant, Self::FIELDS)?;
        let regparms: i32 = args.int(variant, "regparms")?;
        let name = args.text(variant, "name")?.to_string();
        let addr: u64 = args.int(variant, "addr")?;
        let call_args = args.expr_seq(variant, "args")?;
        let tmp = args.opt_temp("tmp")?;
        let guard = args.opt_expr("guard")?;
        let m_addr = args.opt_expr("mAddr")?;
        let m_size: u32 = args.opt_int("mSize")?.unwrap_or(0);
        let needs_bbp = args.boolean("needsBBP")?.unwrap_or(false);
        let fx_state = args.opt_fx_state_seq("fxState")?.unwrap_or_default();
        let m_fx = args.opt_named_enum("mFx")?.unwrap_or(Effect::None);

        let cee = Callee::new(regparms, name, addr)?;
        let base = match tmp {
            Some(tmp) => Self::with_result(tmp, cee, call_args)?,
            None => Self::new(cee, call_args),
        };
        Self::assemble(base, guard, m_fx, m_addr, m_size, fx_state, needs_bbp)
    }

    fn from_borrowed(view: BorrowedStmt<'_>) -> Result<Self> {
        match view.payload(Self::TAG)? {
            StmtPayload::Owned(Stmt::Dirty(dirty)) => Ok(dirty.clone()),
            StmtPayload::Raw {
                arena,
                body: RawStmtBody::Dirty(handle),
            } => {
                let raw = arena.dirty(*handle)?;
                let call_args = arena.copy_exprs(&raw.args, "Dirty args")?;
                let mut fx_state = Vec::new();
                fx_state
                    .try_reserve_exact(raw.fx_state.len())
                    .map_err(|_| Error::AllocationFailure {
                        resource: "Dirty fxState",
                        requested: raw.fx_state.len(),
                    })?;
                fx_state.extend_from_slice(&raw.fx_state);

                let base = match raw.tmp.to_option() {
                    Some(tmp) => malformed(
                        Self::TAG,
                        Self::with_result(tmp, raw.cee.clone(), call_args),
                    )?,
                    None => Self::new(raw.cee.clone(), call_args),
                };
                let m_addr = raw.m_addr.map(|h| arena.copy_expr(h)).transpose()?;
                let assembled = Self::assemble(
                    base,
                    Some(arena.copy_expr(raw.guard)?),
                    raw.m_fx,
                    m_addr,
                    raw.m_size,
                    fx_state,
                    raw.needs_bbp,
                );
                malformed(Self::TAG, assembled)
            }
            other => Err(other.unexpected(Self::TAG)),
        }
    }

    fn sub_exprs(&self) -> Vec<&Expr> {
        let mut exprs = vec![&self.guard];
        exprs.extend(self.args.iter());
        exprs.extend(self.m_addr.as_ref());
        exprs
    }

    fn lower(&self, arena: &mut NodeArena) -> Result<RawStmtBody> {
        let guard = arena.lower_expr(&self.guard)?;
        let args = arena.lower_exprs(&self.args)?;
        let m_addr = self.m_addr.as_ref().map(|e| arena.lower_expr(e)).transpose()?;
        let handle = arena.alloc_dirty(RawDirty {
            cee: self.cee.clone(),
            guard,
            args,
            tmp: Temp::from_option(self.tmp),
            m_fx: self.m_fx,
            m_addr,
            m_size: self.m_size,
            fx_state: self.fx_state.clone(),
            needs_bbp: self.needs_bbp,
        })?;
        Ok(RawStmtBody::Dirty(handle))
    }

    fn project(stmt: &Stmt) -> Option<&Self> {
        match stmt {
            Stmt::Dirty(v) => Some(v),
            _ => None,
        }
    }
}
