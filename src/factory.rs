//! Statement dispatch
//!
//! A fixed table maps each of the twelve statement tags to its variant's
//! wrap and keyword constructors. Nothing else in the crate switches over
//! raw tags.
//!
//! ```
//! use vexir::arena::{NodeArena, RawStmtBody};
//! use vexir::factory;
//!
//! let mut arena = NodeArena::new();
//! let handle = arena.alloc_stmt_with_tag(0x1E0C, RawStmtBody::Opaque).unwrap();
//!
//! let wrapped = factory::wrap(arena.view_stmt(handle)).unwrap();
//! assert_eq!(wrapped.stmt.raw_tag(), 0x1E0C);
//! assert!(wrapped.diagnostic.is_some());
//! ```

use std::fmt;

use crate::arena::ownership::BorrowedStmt;
use crate::config::{IrConfig, UnknownTagPolicy};
use crate::error::{Error, ErrorSeverity, Result};
use crate::ir::{
    AbiHint, Cas, Dirty, Exit, IMark, Llsc, Mbe, NoOp, Put, PutI, Stmt, StmtArgs, StmtTag,
    StmtVariant, Store, UnknownStmt, WrTmp,
};

type WrapFn = fn(BorrowedStmt<'_>) -> Result<Stmt>;
type ConstructFn = fn(&StmtArgs) -> Result<Stmt>;

struct Entry {
    tag: StmtTag,
    wrap: WrapFn,
    construct: ConstructFn,
}

fn wrap_variant<V: StmtVariant>(view: BorrowedStmt<'_>) -> Result<Stmt> {
    V::from_borrowed(view).map(Into::into)
}

fn construct_variant<V: StmtVariant>(args: &StmtArgs) -> Result<Stmt> {
    V::from_args(args).map(Into::into)
}

const fn entry<V: StmtVariant>() -> Entry {
    Entry {
        tag: V::TAG,
        wrap: wrap_variant::<V>,
        construct: construct_variant::<V>,
    }
}

static TABLE: [Entry; 12] = [
    entry::<NoOp>(),
    entry::<IMark>(),
    entry::<AbiHint>(),
    entry::<Put>(),
    entry::<PutI>(),
    entry::<WrTmp>(),
    entry::<Store>(),
    entry::<Cas>(),
    entry::<Llsc>(),
    entry::<Dirty>(),
    entry::<Mbe>(),
    entry::<Exit>(),
];

fn lookup(raw_tag: u32) -> Option<&'static Entry> {
    TABLE.iter().find(|entry| entry.tag.raw() == raw_tag)
}

/// Non-fatal report attached to a wrap result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Raw discriminant that triggered the report
    pub raw_tag: u32,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    fn unsupported(raw_tag: u32) -> Self {
        Self {
            raw_tag,
            message: format!(
                "statement tag {:#x} has no registered variant; degraded to Unknown",
                raw_tag
            ),
        }
    }

    /// Always `Warning`: the statement was still produced
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }

    /// The error a rejecting policy would have returned
    pub fn into_error(self) -> Error {
        Error::UnsupportedVariant {
            raw_tag: self.raw_tag,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Owned statement plus an optional diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    /// The owned statement
    pub stmt: Stmt,
    /// Present when the statement was degraded
    pub diagnostic: Option<Diagnostic>,
}

impl Wrapped {
    /// Drops the diagnostic
    pub fn into_stmt(self) -> Stmt {
        self.stmt
    }
}

/// Dispatches wraps and keyword constructions to the statement variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StmtFactory {
    unknown_tags: UnknownTagPolicy,
}

impl StmtFactory {
    /// Factory with the given unknown-tag policy
    pub fn new(unknown_tags: UnknownTagPolicy) -> Self {
        Self { unknown_tags }
    }

    /// Factory configured from `config`
    pub fn from_config(config: &IrConfig) -> Self {
        Self::new(config.unknown_tags)
    }

    /// Unknown-tag policy in effect
    pub fn unknown_tags(&self) -> UnknownTagPolicy {
        self.unknown_tags
    }

    /// Deep-copies the viewed statement into its owned variant
    pub fn wrap(&self, view: BorrowedStmt<'_>) -> Result<Wrapped> {
        let raw_tag = view.raw_tag()?;
        let Some(entry) = lookup(raw_tag) else {
            return match self.unknown_tags {
                UnknownTagPolicy::Reject => Err(Error::UnsupportedVariant { raw_tag }),
                UnknownTagPolicy::Degrade => {
                    tracing::debug!(raw_tag, "degrading unknown statement tag");
                    Ok(Wrapped {
                        stmt: Stmt::Unknown(UnknownStmt::new(raw_tag)),
                        diagnostic: Some(Diagnostic::unsupported(raw_tag)),
                    })
                }
            };
        };
        let stmt = (entry.wrap)(view)?;
        tracing::trace!(tag = entry.tag.name(), "wrapped statement");
        Ok(Wrapped {
            stmt,
            diagnostic: None,
        })
    }

    /// Builds a statement of kind `tag` from keyword arguments
    pub fn construct(&self, tag: StmtTag, args: &StmtArgs) -> Result<Stmt> {
        match TABLE.iter().find(|entry| entry.tag == tag) {
            Some(entry) => (entry.construct)(args),
            None => Err(Error::UnsupportedVariant { raw_tag: tag.raw() }),
        }
    }

    /// Builds a statement from its tag name (`"Ist_Put"`)
    pub fn construct_named(&self, tag_name: &str, args: &StmtArgs) -> Result<Stmt> {
        self.construct(StmtTag::from_name(tag_name)?, args)
    }
}

/// Wraps with the default factory
pub fn wrap(view: BorrowedStmt<'_>) -> Result<Wrapped> {
    StmtFactory::default().wrap(view)
}

/// Constructs with the default factory
pub fn construct(tag: StmtTag, args: &StmtArgs) -> Result<Stmt> {
    StmtFactory::default().construct(tag, args)
}
