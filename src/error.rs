//! Error types for vexir

use thiserror::Error;

use crate::arena::ArenaBudgetKind;

/// IR node construction and ownership errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Argument validation
    /// Keyword argument not accepted by the variant
    ///
    /// **Triggered by:** Passing a field name the variant does not declare
    /// **Example:** `Put` built with `{offset, data, tmp}`
    #[error("Unexpected argument '{field}' for {variant}")]
    UnexpectedArgument {
        /// Variant being constructed
        variant: &'static str,
        /// Offending field name
        field: String,
    },

    /// Required keyword argument absent
    #[error("Missing argument '{field}' for {variant}")]
    MissingArgument {
        /// Variant being constructed
        variant: &'static str,
        /// Field that was not supplied
        field: &'static str,
    },

    /// Argument or node of the wrong kind
    ///
    /// **Triggered by:** Handing a constant where an expression is required,
    /// or wrapping a node whose body belongs to another variant
    /// **Example:** `AbiHint` with `base = Const(U64(0))`
    #[error("Type mismatch for '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        /// Field or node being checked
        field: String,
        /// Expected kind
        expected: &'static str,
        /// Actual kind
        got: String,
    },

    /// Argument has the right kind but an unusable value
    #[error("Invalid argument '{field}': {reason}")]
    InvalidArgument {
        /// Field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Keyword construction was handed the reserved `wrap` capsule
    ///
    /// **Prevention:** Use `from_borrowed` / `factory::wrap` to import nodes
    #[error("Ambiguous construction of {variant}: the 'wrap' keyword is reserved for the wrap path")]
    AmbiguousConstruction {
        /// Variant being constructed
        variant: &'static str,
    },

    // Enum codec
    /// Raw discriminant outside the closed enumeration
    #[error("Unknown {enumeration} discriminant: {value:#x}")]
    UnknownDiscriminant {
        /// Enumeration name
        enumeration: &'static str,
        /// Raw value
        value: u32,
    },

    /// Name not registered in the enumeration (case-sensitive)
    #[error("Unknown {enumeration} name: '{name}'")]
    UnknownName {
        /// Enumeration name
        enumeration: &'static str,
        /// Rejected text
        name: String,
    },

    // Ownership layer
    /// Copy-out could not obtain owned storage
    #[error("Allocation failure while copying {resource} ({requested} elements)")]
    AllocationFailure {
        /// What was being copied
        resource: &'static str,
        /// Number of elements requested
        requested: usize,
    },

    /// Arena allocation would exceed the configured budget
    #[error("Arena budget exceeded for {kind:?}: limit={limit}, attempted={attempted}")]
    BudgetExceeded {
        /// Budget dimension
        kind: ArenaBudgetKind,
        /// Configured limit
        limit: u64,
        /// Value the allocation would have reached
        attempted: u64,
    },

    /// Handle minted by a different arena
    #[error("Foreign {handle_kind} handle {index}: belongs to arena {actual}, used with arena {expected}")]
    ForeignHandle {
        /// Handle kind
        handle_kind: &'static str,
        /// Arena the handle was used with
        expected: u32,
        /// Arena that minted the handle
        actual: u32,
        /// Slot index
        index: u32,
    },

    /// Handle points past the end of its arena
    #[error("{handle_kind} handle points to missing index {index}")]
    DanglingHandle {
        /// Handle kind
        handle_kind: &'static str,
        /// Slot index
        index: u32,
    },

    /// Raw tag and raw body disagree
    #[error("Corrupt node: tag {tag} carries a {body} body")]
    CorruptNode {
        /// Tag name read from the node
        tag: &'static str,
        /// Body kind found
        body: &'static str,
    },

    // Dispatch
    /// Tag with no registered variant
    ///
    /// Degraded to a diagnostic by the default factory policy.
    #[error("Unknown/unsupported statement tag {raw_tag:#x}")]
    UnsupportedVariant {
        /// Raw tag value
        raw_tag: u32,
    },
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Fatal error that cannot be recovered from
    Fatal,
    /// Recoverable error: correct the input and call again
    Recoverable,
    /// Warning that doesn't prevent a result
    Warning,
}

impl Error {
    /// Create an invalid-argument error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a type-mismatch error
    pub fn mismatch(field: impl Into<String>, expected: &'static str, got: impl Into<String>) -> Self {
        Error::TypeMismatch {
            field: field.into(),
            expected,
            got: got.into(),
        }
    }

    /// Classify error severity
    pub fn classify(&self) -> ErrorSeverity {
        match self {
            Error::UnsupportedVariant { .. } => ErrorSeverity::Warning,

            Error::AllocationFailure { .. } => ErrorSeverity::Fatal,
            Error::BudgetExceeded { .. } => ErrorSeverity::Fatal,
            Error::CorruptNode { .. } => ErrorSeverity::Fatal,
            Error::ForeignHandle { .. } => ErrorSeverity::Fatal,
            Error::DanglingHandle { .. } => ErrorSeverity::Fatal,

            _ => ErrorSeverity::Recoverable,
        }
    }
}

/// Result type for vexir operations
pub type Result<T> = std::result::Result<T, Error>;
