//! Register-array and callee descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

use super::enums::IrType;
use crate::error::{Error, Result};

/// Highest number of arguments passed in registers to a helper
pub const MAX_REGPARMS: i32 = 3;

/// Shape of a circular array in the guest register file (used by `GetI`/`PutI`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegArray {
    base: i32,
    elem_ty: IrType,
    n_elems: i32,
}

impl RegArray {
    /// Creates a descriptor for `n_elems` elements of `elem_ty` starting at `base`
    pub fn new(base: i32, elem_ty: IrType, n_elems: i32) -> Result<Self> {
        if n_elems <= 0 {
            return Err(Error::invalid("nElems", format!("must be positive, got {}", n_elems)));
        }
        if elem_ty == IrType::I1 {
            return Err(Error::invalid("elemTy", "Ity_I1 cannot be an array element"));
        }
        Ok(Self {
            base,
            elem_ty,
            n_elems,
        })
    }

    /// Register-file offset of element 0
    pub fn base(&self) -> i32 {
        self.base
    }

    /// Element type
    pub fn elem_ty(&self) -> IrType {
        self.elem_ty
    }

    /// Number of elements
    pub fn n_elems(&self) -> i32 {
        self.n_elems
    }
}

impl fmt::Display for RegArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}:{}x{})",
            self.base,
            self.n_elems,
            self.elem_ty.short_name()
        )
    }
}

/// Helper function called by `CCall` expressions and `Dirty` statements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Callee {
    regparms: i32,
    name: String,
    addr: u64,
    mcx_mask: u32,
}

impl Callee {
    /// Creates a callee descriptor
    pub fn new(regparms: i32, name: impl Into<String>, addr: u64) -> Result<Self> {
        if !(0..=MAX_REGPARMS).contains(&regparms) {
            return Err(Error::invalid(
                "regparms",
                format!("must be in 0..={}, got {}", MAX_REGPARMS, regparms),
            ));
        }
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("name", "callee name is empty"));
        }
        Ok(Self {
            regparms,
            name,
            addr,
            mcx_mask: 0,
        })
    }

    /// Sets the mask of arguments memcheck should not instrument
    pub fn with_mcx_mask(mut self, mcx_mask: u32) -> Self {
        self.mcx_mask = mcx_mask;
        self
    }

    /// Arguments passed in registers
    pub fn regparms(&self) -> i32 {
        self.regparms
    }

    /// Symbol name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host address of the helper
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// Memcheck exclusion mask
    pub fn mcx_mask(&self) -> u32 {
        self.mcx_mask
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{:#x}}}", self.name, self.addr)?;
        if self.regparms > 0 {
            write!(f, "[rp={}]", self.regparms)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regarray_validation() {
        let descr = RegArray::new(96, IrType::F64, 8).unwrap();
        assert_eq!(descr.to_string(), "(96:8xF64)");
        assert!(RegArray::new(96, IrType::F64, 0).is_err());
        assert!(RegArray::new(96, IrType::I1, 4).is_err());
    }

    #[test]
    fn test_callee_validation() {
        let cee = Callee::new(0, "helper", 0x7fff_0000).unwrap();
        assert_eq!(cee.to_string(), "helper{0x7fff0000}");
        assert!(Callee::new(4, "helper", 0).is_err());
        assert!(Callee::new(0, "", 0).is_err());
        assert_eq!(cee.with_mcx_mask(0b10).mcx_mask(), 2);
    }
}
