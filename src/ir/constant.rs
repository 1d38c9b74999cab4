//! IR constants

use std::fmt;

use serde::{Deserialize, Serialize};

use super::enums::IrType;

/// Literal value carried by `Const` expressions and exit destinations.
///
/// Floating-point payloads are kept as raw bit patterns so constants compare
/// and hash structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Const {
    /// 1-bit boolean
    U1(bool),
    /// 8-bit unsigned
    U8(u8),
    /// 16-bit unsigned
    U16(u16),
    /// 32-bit unsigned
    U32(u32),
    /// 64-bit unsigned
    U64(u64),
    /// IEEE single, raw bits
    F32(u32),
    /// IEEE double, raw bits
    F64(u64),
    /// 128-bit vector, one bit per byte lane
    V128(u16),
}

impl Const {
    /// Type of the constant
    pub fn ty(&self) -> IrType {
        match self {
            Const::U1(_) => IrType::I1,
            Const::U8(_) => IrType::I8,
            Const::U16(_) => IrType::I16,
            Const::U32(_) => IrType::I32,
            Const::U64(_) => IrType::I64,
            Const::F32(_) => IrType::F32,
            Const::F64(_) => IrType::F64,
            Const::V128(_) => IrType::V128,
        }
    }

    /// Value zero-extended to 64 bits
    pub fn as_u64(&self) -> u64 {
        match *self {
            Const::U1(b) => b as u64,
            Const::U8(v) => v as u64,
            Const::U16(v) => v as u64,
            Const::U32(v) => v as u64,
            Const::U64(v) => v,
            Const::F32(bits) => bits as u64,
            Const::F64(bits) => bits,
            Const::V128(lanes) => lanes as u64,
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Const::U1(b) => write!(f, "{}:I1", if b { 1 } else { 0 }),
            Const::U8(v) => write!(f, "{:#x}:I8", v),
            Const::U16(v) => write!(f, "{:#x}:I16", v),
            Const::U32(v) => write!(f, "{:#x}:I32", v),
            Const::U64(v) => write!(f, "{:#x}:I64", v),
            Const::F32(bits) => write!(f, "F32{{{:#x}}}", bits),
            Const::F64(bits) => write!(f, "F64{{{:#x}}}", bits),
            Const::V128(lanes) => write!(f, "V128{{{:#06x}}}", lanes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_types() {
        assert_eq!(Const::U1(true).ty(), IrType::I1);
        assert_eq!(Const::U64(0x1000).ty(), IrType::I64);
        assert_eq!(Const::F64(1.5f64.to_bits()).ty(), IrType::F64);
    }

    #[test]
    fn test_const_display() {
        assert_eq!(Const::U64(0x1000).to_string(), "0x1000:I64");
        assert_eq!(Const::U1(true).to_string(), "1:I1");
        assert_eq!(Const::U8(2).to_string(), "0x2:I8");
    }
}
