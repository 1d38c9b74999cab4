//! Closed IR enumerations and their textual names
//!
//! Every enumeration maps three ways: Rust variant, VEX discriminant value
//! (`raw`) and the stable VEX name (`Ity_I64`, `Ijk_Boring`, ...). Names are
//! matched case-sensitively.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

macro_rules! ir_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $raw:literal => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $raw, )+
        }

        impl $name {
            /// Every member, in discriminant order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Enumeration name used in diagnostics
            pub const ENUM_NAME: &'static str = $label;

            /// Stable textual name
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Parse a stable textual name
            pub fn from_name(name: &str) -> Result<Self> {
                lazy_static::lazy_static! {
                    static ref BY_NAME: HashMap<&'static str, $name> =
                        $name::ALL.iter().map(|v| (v.name(), *v)).collect();
                }
                BY_NAME.get(name).copied().ok_or_else(|| Error::UnknownName {
                    enumeration: $label,
                    name: name.to_string(),
                })
            }

            /// Raw discriminant value
            pub fn raw(self) -> u32 {
                self as u32
            }

            /// Decode a raw discriminant value
            pub fn from_raw(raw: u32) -> Result<Self> {
                match raw {
                    $($raw => Ok($name::$variant),)+
                    _ => Err(Error::UnknownDiscriminant {
                        enumeration: $label,
                        value: raw,
                    }),
                }
            }

            /// Name of a raw discriminant value
            pub fn name_of_raw(raw: u32) -> Result<&'static str> {
                Self::from_raw(raw).map(Self::name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_name(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::from_name(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

ir_enum! {
    /// Type of an IR value
    pub enum IrType as "IRType" {
        /// 1-bit boolean
        I1 = 0x1101 => "Ity_I1",
        /// 8-bit integer
        I8 = 0x1102 => "Ity_I8",
        /// 16-bit integer
        I16 = 0x1103 => "Ity_I16",
        /// 32-bit integer
        I32 = 0x1104 => "Ity_I32",
        /// 64-bit integer
        I64 = 0x1105 => "Ity_I64",
        /// 128-bit integer
        I128 = 0x1106 => "Ity_I128",
        /// IEEE single
        F32 = 0x1107 => "Ity_F32",
        /// IEEE double
        F64 = 0x1108 => "Ity_F64",
        /// 32-bit decimal float
        D32 = 0x1109 => "Ity_D32",
        /// 64-bit decimal float
        D64 = 0x110A => "Ity_D64",
        /// 128-bit decimal float
        D128 = 0x110B => "Ity_D128",
        /// 128-bit binary float
        F128 = 0x110C => "Ity_F128",
        /// 128-bit SIMD
        V128 = 0x110D => "Ity_V128",
        /// 256-bit SIMD
        V256 = 0x110E => "Ity_V256",
    }
}

impl IrType {
    /// Name without the `Ity_` prefix, as printed inside IR text
    pub fn short_name(self) -> &'static str {
        &self.name()[4..]
    }

    /// Size in bits
    pub fn bits(self) -> u32 {
        match self {
            IrType::I1 => 1,
            IrType::I8 => 8,
            IrType::I16 => 16,
            IrType::I32 | IrType::F32 | IrType::D32 => 32,
            IrType::I64 | IrType::F64 | IrType::D64 => 64,
            IrType::I128 | IrType::D128 | IrType::F128 | IrType::V128 => 128,
            IrType::V256 => 256,
        }
    }
}

ir_enum! {
    /// Byte order of a memory access
    pub enum Endness as "IREndness" {
        /// Little endian
        Le = 0x1200 => "Iend_LE",
        /// Big endian
        Be = 0x1201 => "Iend_BE",
    }
}

impl Endness {
    /// Lower-case suffix used in IR text (`STle`, `LDbe`)
    pub fn suffix(self) -> &'static str {
        match self {
            Endness::Le => "le",
            Endness::Be => "be",
        }
    }
}

ir_enum! {
    /// Kind of control transfer performed by an exit
    pub enum JumpKind as "IRJumpKind" {
        /// Ordinary jump
        Boring = 0x1A01 => "Ijk_Boring",
        /// Guest call
        Call = 0x1A02 => "Ijk_Call",
        /// Guest return
        Ret = 0x1A03 => "Ijk_Ret",
        /// Client request
        ClientReq = 0x1A04 => "Ijk_ClientReq",
        /// Yield to scheduler
        Yield = 0x1A05 => "Ijk_Yield",
        /// Emulation warning
        EmWarn = 0x1A06 => "Ijk_EmWarn",
        /// Emulation failure
        EmFail = 0x1A07 => "Ijk_EmFail",
        /// Undecodable instruction
        NoDecode = 0x1A08 => "Ijk_NoDecode",
        /// Mapping failure
        MapFail = 0x1A09 => "Ijk_MapFail",
        /// Invalidate icache
        InvalICache = 0x1A0A => "Ijk_InvalICache",
        /// Flush dcache
        FlushDCache = 0x1A0B => "Ijk_FlushDCache",
        /// Jump without redirection
        NoRedir = 0x1A0C => "Ijk_NoRedir",
        /// SIGILL
        SigIll = 0x1A0D => "Ijk_SigILL",
        /// SIGTRAP
        SigTrap = 0x1A0E => "Ijk_SigTRAP",
        /// SIGSEGV
        SigSegv = 0x1A0F => "Ijk_SigSEGV",
        /// SIGBUS
        SigBus = 0x1A10 => "Ijk_SigBUS",
        /// SIGFPE, integer divide
        SigFpeIntDiv = 0x1A11 => "Ijk_SigFPE_IntDiv",
        /// SIGFPE, integer overflow
        SigFpeIntOvf = 0x1A12 => "Ijk_SigFPE_IntOvf",
        /// `syscall`
        SysSyscall = 0x1A13 => "Ijk_Sys_syscall",
        /// `int $0x20`
        SysInt32 = 0x1A14 => "Ijk_Sys_int32",
        /// `int $0x80`
        SysInt128 = 0x1A15 => "Ijk_Sys_int128",
        /// `int $0x81`
        SysInt129 = 0x1A16 => "Ijk_Sys_int129",
        /// `int $0x82`
        SysInt130 = 0x1A17 => "Ijk_Sys_int130",
        /// `sysenter`
        SysSysenter = 0x1A18 => "Ijk_Sys_sysenter",
    }
}

ir_enum! {
    /// Memory/register effect declared by a dirty call
    pub enum Effect as "IREffect" {
        /// No effect
        None = 0x1B00 => "Ifx_None",
        /// Reads
        Read = 0x1B01 => "Ifx_Read",
        /// Writes
        Write = 0x1B02 => "Ifx_Write",
        /// Reads and writes
        Modify = 0x1B03 => "Ifx_Modify",
    }
}

ir_enum! {
    /// Memory-bus event
    pub enum MBusEvent as "IRMBusEvent" {
        /// Memory fence
        Fence = 0x1C00 => "Imbe_Fence",
        /// Cancel a load-linked reservation
        CancelReservation = 0x1C01 => "Imbe_CancelReservation",
    }
}

ir_enum! {
    /// Statement discriminant
    pub enum StmtTag as "IRStmtTag" {
        /// No operation
        NoOp = 0x1E00 => "Ist_NoOp",
        /// Instruction mark
        IMark = 0x1E01 => "Ist_IMark",
        /// ABI hint
        AbiHint = 0x1E02 => "Ist_AbiHint",
        /// Register write
        Put = 0x1E03 => "Ist_Put",
        /// Indexed register write
        PutI = 0x1E04 => "Ist_PutI",
        /// Temporary write
        WrTmp = 0x1E05 => "Ist_WrTmp",
        /// Memory store
        Store = 0x1E06 => "Ist_Store",
        /// Compare-and-swap
        Cas = 0x1E07 => "Ist_CAS",
        /// Load-linked / store-conditional
        Llsc = 0x1E08 => "Ist_LLSC",
        /// Dirty helper call
        Dirty = 0x1E09 => "Ist_Dirty",
        /// Memory-bus event
        Mbe = 0x1E0A => "Ist_MBE",
        /// Conditional exit
        Exit = 0x1E0B => "Ist_Exit",
    }
}

ir_enum! {
    /// Expression discriminant
    pub enum ExprTag as "IRExprTag" {
        /// Register read
        Get = 0x1901 => "Iex_Get",
        /// Indexed register read
        GetI = 0x1902 => "Iex_GetI",
        /// Temporary read
        RdTmp = 0x1903 => "Iex_RdTmp",
        /// Binary operation
        Binop = 0x1906 => "Iex_Binop",
        /// Unary operation
        Unop = 0x1907 => "Iex_Unop",
        /// Memory load
        Load = 0x1908 => "Iex_Load",
        /// Constant
        Const = 0x1909 => "Iex_Const",
        /// If-then-else
        Ite = 0x190A => "Iex_ITE",
        /// Clean helper call
        CCall = 0x190B => "Iex_CCall",
    }
}
