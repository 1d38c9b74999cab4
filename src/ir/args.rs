//! Keyword arguments for statement construction
//!
//! Statements can be built from a set of named fields, the way a front end
//! would hand them over from a scripting layer or a textual description.
//! Every accessor here validates one field and reports the first problem.

use std::collections::BTreeMap;
use std::str::FromStr;

use super::constant::Const;
use super::descr::{Callee, RegArray};
use super::enums::{Effect, Endness, JumpKind, MBusEvent};
use super::expr::{Expr, Temp};
use super::stmt::{FxState, Stmt};
use crate::error::{Error, Result};

/// Keyword reserved for the wrap path
pub const WRAP_KEYWORD: &str = "wrap";

/// A single keyword argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Boolean flag
    Bool(bool),
    /// Text (enum names, callee names)
    Str(String),
    /// Expression node
    Expr(Expr),
    /// Constant node
    Const(Const),
    /// Register-array descriptor
    RegArray(RegArray),
    /// Callee descriptor
    Callee(Callee),
    /// Statement node (never accepted as a field, present for kind checks)
    Stmt(Box<Stmt>),
    /// Effect-state descriptor
    FxState(FxState),
    /// Ordered sequence
    Seq(Vec<ArgValue>),
}

impl ArgValue {
    /// Kind name used in type-mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            ArgValue::Int(_) | ArgValue::UInt(_) => "int",
            ArgValue::Bool(_) => "bool",
            ArgValue::Str(_) => "str",
            ArgValue::Expr(_) => "IRExpr",
            ArgValue::Const(_) => "IRConst",
            ArgValue::RegArray(_) => "IRRegArray",
            ArgValue::Callee(_) => "IRCallee",
            ArgValue::Stmt(_) => "IRStmt",
            ArgValue::FxState(_) => "IRFxState",
            ArgValue::Seq(_) => "sequence",
        }
    }
}

macro_rules! arg_from {
    ($($ty:ty => |$v:ident| $body:expr;)+) => {
        $(
            impl From<$ty> for ArgValue {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )+
    };
}

arg_from! {
    i32 => |v| ArgValue::Int(v as i64);
    i64 => |v| ArgValue::Int(v);
    u8 => |v| ArgValue::UInt(v as u64);
    u16 => |v| ArgValue::UInt(v as u64);
    u32 => |v| ArgValue::UInt(v as u64);
    u64 => |v| ArgValue::UInt(v);
    bool => |v| ArgValue::Bool(v);
    &str => |v| ArgValue::Str(v.to_string());
    String => |v| ArgValue::Str(v);
    Temp => |v| ArgValue::UInt(v.id() as u64);
    Expr => |v| ArgValue::Expr(v);
    Const => |v| ArgValue::Const(v);
    RegArray => |v| ArgValue::RegArray(v);
    Callee => |v| ArgValue::Callee(v);
    Stmt => |v| ArgValue::Stmt(Box::new(v));
    FxState => |v| ArgValue::FxState(v);
    Endness => |v| ArgValue::Str(v.name().to_string());
    JumpKind => |v| ArgValue::Str(v.name().to_string());
    MBusEvent => |v| ArgValue::Str(v.name().to_string());
    Effect => |v| ArgValue::Str(v.name().to_string());
    Vec<ArgValue> => |v| ArgValue::Seq(v);
    Vec<Expr> => |v| ArgValue::Seq(v.into_iter().map(ArgValue::Expr).collect());
    Vec<FxState> => |v| ArgValue::Seq(v.into_iter().map(ArgValue::FxState).collect());
}

/// Named construction arguments for one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StmtArgs {
    named: BTreeMap<String, ArgValue>,
}

impl StmtArgs {
    /// Creates an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces a field, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Option<ArgValue> {
        self.named.insert(name.into(), value.into())
    }

    /// Looks up a field
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.named.get(name)
    }

    /// Whether a field was supplied
    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Supplied field names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    /// Number of supplied fields
    pub fn len(&self) -> usize {
        self.named.len()
    }

    /// Whether no field was supplied
    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// Rejects the reserved wrap keyword and any field outside `allowed`
    pub(crate) fn validate_fields(&self, variant: &'static str, allowed: &[&str]) -> Result<()> {
        if self.contains(WRAP_KEYWORD) {
            return Err(Error::AmbiguousConstruction { variant });
        }
        match self.names().find(|name| !allowed.contains(name)) {
            Some(field) => Err(Error::UnexpectedArgument {
                variant,
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn require(&self, variant: &'static str, field: &'static str) -> Result<&ArgValue> {
        self.get(field)
            .ok_or(Error::MissingArgument { variant, field })
    }

    pub(crate) fn int<T>(&self, variant: &'static str, field: &'static str) -> Result<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        int_value(field, self.require(variant, field)?)
    }

    pub(crate) fn opt_int<T>(&self, field: &'static str) -> Result<Option<T>>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        self.get(field).map(|value| int_value(field, value)).transpose()
    }

    pub(crate) fn temp(&self, variant: &'static str, field: &'static str) -> Result<Temp> {
        temp_value(field, self.require(variant, field)?)
    }

    pub(crate) fn opt_temp(&self, field: &'static str) -> Result<Option<Temp>> {
        self.get(field).map(|value| temp_value(field, value)).transpose()
    }

    pub(crate) fn boolean(&self, field: &'static str) -> Result<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(ArgValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Error::mismatch(field, "bool", other.kind_name())),
        }
    }

    pub(crate) fn text(&self, variant: &'static str, field: &'static str) -> Result<&str> {
        match self.require(variant, field)? {
            ArgValue::Str(s) => Ok(s),
            other => Err(Error::mismatch(field, "str", other.kind_name())),
        }
    }

    /// Parses a textual enum field
    pub(crate) fn named_enum<E>(&self, variant: &'static str, field: &'static str) -> Result<E>
    where
        E: FromStr<Err = Error>,
    {
        self.text(variant, field)?.parse()
    }

    pub(crate) fn opt_named_enum<E>(&self, field: &'static str) -> Result<Option<E>>
    where
        E: FromStr<Err = Error>,
    {
        match self.get(field) {
            None => Ok(None),
            Some(ArgValue::Str(s)) => s.parse().map(Some),
            Some(other) => Err(Error::mismatch(field, "str", other.kind_name())),
        }
    }

    pub(crate) fn expr(&self, variant: &'static str, field: &'static str) -> Result<Expr> {
        expr_value(field, self.require(variant, field)?)
    }

    pub(crate) fn opt_expr(&self, field: &'static str) -> Result<Option<Expr>> {
        self.get(field).map(|value| expr_value(field, value)).transpose()
    }

    pub(crate) fn constant(&self, variant: &'static str, field: &'static str) -> Result<Const> {
        match self.require(variant, field)? {
            ArgValue::Const(c) => Ok(*c),
            other => Err(Error::mismatch(field, "IRConst", other.kind_name())),
        }
    }

    pub(crate) fn reg_array(&self, variant: &'static str, field: &'static str) -> Result<RegArray> {
        match self.require(variant, field)? {
            ArgValue::RegArray(descr) => Ok(descr.clone()),
            other => Err(Error::mismatch(field, "IRRegArray", other.kind_name())),
        }
    }

    /// Sequence of expressions; every element is kind-checked
    pub(crate) fn expr_seq(&self, variant: &'static str, field: &'static str) -> Result<Vec<Expr>> {
        let items = seq_value(field, self.require(variant, field)?)?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| expr_value(&format!("{}[{}]", field, i), item))
            .collect()
    }

    pub(crate) fn opt_fx_state_seq(&self, field: &'static str) -> Result<Option<Vec<FxState>>> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        seq_value(field, value)?
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                ArgValue::FxState(fx) => Ok(*fx),
                other => Err(Error::mismatch(
                    format!("{}[{}]", field, i),
                    "IRFxState",
                    other.kind_name(),
                )),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

fn int_value<T>(field: &str, value: &ArgValue) -> Result<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let converted = match value {
        ArgValue::Int(v) => <T as TryFrom<i64>>::try_from(*v).map_err(|_| v.to_string()),
        ArgValue::UInt(v) => <T as TryFrom<u64>>::try_from(*v).map_err(|_| v.to_string()),
        other => return Err(Error::mismatch(field, "int", other.kind_name())),
    };
    converted.map_err(|shown| {
        Error::invalid(
            field,
            format!("{} does not fit in {}", shown, std::any::type_name::<T>()),
        )
    })
}

fn temp_value(field: &str, value: &ArgValue) -> Result<Temp> {
    let tmp = Temp(int_value::<u32>(field, value)?);
    if tmp.is_invalid() {
        return Err(Error::invalid(field, "temporary id is the INVALID sentinel"));
    }
    Ok(tmp)
}

fn expr_value(field: &str, value: &ArgValue) -> Result<Expr> {
    match value {
        ArgValue::Expr(expr) => Ok(expr.clone()),
        other => Err(Error::mismatch(field, "IRExpr", other.kind_name())),
    }
}

fn seq_value<'a>(field: &str, value: &'a ArgValue) -> Result<&'a [ArgValue]> {
    match value {
        ArgValue::Seq(items) => Ok(items),
        other => Err(Error::mismatch(field, "sequence", other.kind_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_fields() {
        let args = StmtArgs::new().with("offset", 16).with("tmp", 3u32);
        let err = args.validate_fields("Ist_Put", &["offset", "data"]).unwrap_err();
        assert_eq!(
            err,
            Error::UnexpectedArgument {
                variant: "Ist_Put",
                field: "tmp".to_string()
            }
        );

        let args = StmtArgs::new().with(WRAP_KEYWORD, true);
        assert!(matches!(
            args.validate_fields("Ist_Put", &["offset", "data"]),
            Err(Error::AmbiguousConstruction { .. })
        ));
    }

    #[test]
    fn test_int_ranges() {
        let args = StmtArgs::new().with("delta", 300).with("len", -1);
        assert!(matches!(
            args.int::<u8>("Ist_IMark", "delta"),
            Err(Error::InvalidArgument { .. })
        ));
        assert_eq!(args.int::<i32>("Ist_IMark", "len").unwrap(), -1);
        assert!(matches!(
            args.int::<u64>("Ist_IMark", "addr"),
            Err(Error::MissingArgument { field: "addr", .. })
        ));
    }

    #[test]
    fn test_kind_checks() {
        let args = StmtArgs::new()
            .with("data", Const::U8(1))
            .with("args", vec![ArgValue::Expr(Expr::rd_tmp(1)), ArgValue::Int(2)]);

        let err = args.expr("Ist_Put", "data").unwrap_err();
        assert_eq!(err, Error::mismatch("data", "IRExpr", "IRConst"));

        let err = args.expr_seq("Ist_Dirty", "args").unwrap_err();
        assert_eq!(err, Error::mismatch("args[1]", "IRExpr", "int"));
    }

    #[test]
    fn test_temp_sentinel_rejected() {
        let args = StmtArgs::new().with("tmp", u32::MAX);
        assert!(matches!(
            args.temp("Ist_WrTmp", "tmp"),
            Err(Error::InvalidArgument { .. })
        ));
        let args = StmtArgs::new().with("tmp", 0u32);
        assert_eq!(args.opt_temp("tmp").unwrap(), Some(Temp(0)));
    }
}
