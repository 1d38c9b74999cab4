//! # vexir - VEX IR statement nodes
//!
//! An owned, strongly-typed model of VEX IR statements: the twelve statement
//! kinds a lifter emits, the enumerations they use, and the machinery that
//! copies them out of a transient low-level arena into owned trees.
//!
//! ## Features
//!
//! - **Closed statement sum type** - `Stmt` with one struct per kind and an
//!   `Unknown` fallback for discriminants outside the set
//! - **Two construction paths** - keyword arguments (`StmtArgs`) or wrapping
//!   a borrowed node, both validated
//! - **Ownership by construction** - wrapping deep-copies, so an arena can be
//!   dropped while its statements live on
//! - **VEX names and discriminants** - every enumeration round-trips through
//!   its `Ity_`/`Iend_`/`Ijk_`/`Ist_` name and raw value
//!
//! ## Quick Start
//!
//! ```rust
//! use vexir::arena::{NodeArena, RawExpr, RawStmtBody};
//! use vexir::ir::{Expr, Put, Stmt, StmtTag, Temp};
//! use vexir::factory;
//!
//! # fn main() -> vexir::Result<()> {
//! // A decoder fills an arena...
//! let mut arena = NodeArena::new();
//! let t0 = arena.alloc_expr(RawExpr::RdTmp(Temp(0)))?;
//! let handle = arena.alloc_stmt(RawStmtBody::Put { offset: 16, data: t0 })?;
//!
//! // ...and wrapping copies the node out
//! let stmt = factory::wrap(arena.view_stmt(handle))?.into_stmt();
//! drop(arena);
//!
//! assert_eq!(stmt.tag(), Some(StmtTag::Put));
//! assert!(stmt.is_flat());
//! assert_eq!(stmt.to_string(), "PUT(16) = t0");
//! assert_eq!(stmt, Stmt::from(Put::new(16, Expr::rd_tmp(0))));
//! # Ok(())
//! # }
//! ```
//!
//! ### Keyword Construction
//!
//! ```rust
//! use vexir::ir::{Const, Expr, StmtArgs, StmtTag};
//! use vexir::factory;
//!
//! # fn main() -> vexir::Result<()> {
//! let args = StmtArgs::new()
//!     .with("guard", Expr::rd_tmp(3))
//!     .with("jumpkind", "Ijk_Boring")
//!     .with("dst", Const::U64(0x1000))
//!     .with("offsIP", 184i64);
//! let exit = factory::construct(StmtTag::Exit, &args)?;
//! assert_eq!(exit.to_string(), "if (t3) { PUT(184) = 0x1000:I64; exit-Boring }");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! decoder ──> NodeArena ──> BorrowedStmt ──> StmtFactory ──> Stmt (owned)
//!                 ^                                              │
//!                 └──────────────── lower_stmt ──────────────────┘
//! ```
//!
//! ### Main Components
//!
//! - **`ir`** - enumerations, expressions, descriptors and the statement variants
//! - **`arena`** - the low-level node store, borrowed views and copy-out
//! - **`factory`** - tag dispatch for wrapping and keyword construction
//! - **`parallel`** - wrapping whole blocks on a rayon pool
//! - **`config`** - budgets and policies, loadable from JSON
//! - **`error`** - the crate-wide `Error` type
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. [`Error::classify`] tells
//! input errors (fix and retry) apart from fatal ones such as a corrupt arena
//! node or an exhausted budget. An unknown statement tag is a warning: the
//! default factory degrades it to `Stmt::Unknown` and returns a diagnostic.

#![allow(clippy::len_without_is_empty)] // IMark/AbiHint `len` is an instruction length

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod arena;
pub mod config;
pub mod error;
pub mod factory;
pub mod ir;
pub mod parallel;

// Re-export main types
pub use arena::ownership::{borrow_view, copy_out, copy_out_expr, BorrowedExpr, BorrowedStmt};
pub use arena::{ArenaBudget, NodeArena};
pub use config::{IrConfig, UnknownTagPolicy};
pub use error::{Error, ErrorSeverity, Result};
pub use factory::{construct, wrap, Diagnostic, StmtFactory, Wrapped};
pub use ir::{Expr, Stmt, StmtArgs, StmtTag, StmtVariant};
pub use parallel::{wrap_block, BlockWrap, ParallelConfig};
