//! VEX IR node model
//!
//! ## Module Organization
//!
//! | Module | Contents |
//! |--------|----------|
//! | `enums` | closed enumerations with VEX names and discriminants |
//! | `constant` | `Const` literals |
//! | `descr` | `RegArray` and `Callee` descriptors |
//! | `expr` | owned expression trees and temporaries |
//! | `args` | keyword arguments for statement construction |
//! | `stmt` | the statement sum type and its twelve variants |
//! | `display` | VEX pretty-printer rendering |

pub mod args;
pub mod constant;
pub mod descr;
mod display;
pub mod enums;
pub mod expr;
pub mod stmt;

pub use args::{ArgValue, StmtArgs, WRAP_KEYWORD};
pub use constant::Const;
pub use descr::{Callee, RegArray, MAX_REGPARMS};
pub use enums::{Effect, Endness, ExprTag, IrType, JumpKind, MBusEvent, StmtTag};
pub use expr::{Expr, IrOp, Temp};
pub use stmt::{
    AbiHint, Cas, CasDetails, Dirty, Exit, FxState, IMark, Llsc, LlscOp, Mbe, NoOp, Put, PutI,
    PutIDetails, Stmt, StmtVariant, Store, UnknownStmt, WrTmp, MAX_FX_STATE,
};
