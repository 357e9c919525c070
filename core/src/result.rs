//! The error taxonomy reported by public operations.
//!
//! Structural-hash lookups, trivial-fold identities, and traversal marks
//! are never error-bearing: they are contract-respecting operations with
//! well-defined results for every input. Errors only surface at the
//! boundary of a public transform or network-editing operation, and they
//! carry the structured data needed to render a diagnostic rather than a
//! pre-formatted string; rendering is a `Display` concern, kept separate
//! so a caller can format the same error differently (plain text, or with
//! ISA/annotation context) without re-deriving it.

use crate::ir::ObjId;
use std::fmt;

/// Convenience alias for this crate's fallible operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A single invariant violation found by [`crate::verifier::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantViolation {
    /// The object at which the violated invariant was detected.
    pub object: ObjId,
    /// Human-readable description of the invariant that failed.
    pub message: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "object {:?}: {}", self.object, self.message)
    }
}

/// The error taxonomy of the engine.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// A miter (or another two-network transform) was requested on
    /// networks whose primary I/O signatures do not match.
    #[error("signature mismatch: {reason}")]
    SignatureMismatch {
        /// Why the signatures were judged incompatible.
        reason: String,
    },

    /// `check()` found one or more broken invariants.
    #[error("{} invariant violation(s), first: {}", .violations.len(), .violations.first().map(ToString::to_string).unwrap_or_default())]
    InvariantViolation {
        /// Every violation found by the check pass (never empty).
        violations: Vec<InvariantViolation>,
    },

    /// The acyclicity check failed; `path` lists the objects on the cycle
    /// in the order they were encountered during the descent.
    #[error("combinational loop through: {}", path.iter().map(|o| format!("{:?}", o)).collect::<Vec<_>>().join(" -> "))]
    CombinationalLoop {
        /// The cycle, starting and ending at the object where it closed.
        path: Vec<ObjId>,
    },

    /// The requested `(kind, func)` pair is not in the compatibility
    /// matrix.
    #[error("{kind:?} networks cannot carry {func:?} functionality")]
    IncompatibleKindFunc {
        /// The requested network kind.
        kind: crate::ir::NtkKind,
        /// The requested function-manager kind.
        func: crate::ir::FuncKind,
    },

    /// A primary input, output, or latch name collided with an existing
    /// one.
    #[error("duplicate primary I/O name: {name}")]
    NameClash {
        /// The offending name.
        name: String,
    },

    /// An operation specific to one function kind (e.g. an AIG op) was
    /// invoked on a network carrying a different one.
    #[error("operation requires {expected:?}, network carries {actual:?}")]
    TypeMismatch {
        /// The function kind the operation requires.
        expected: crate::ir::FuncKind,
        /// The function kind the network actually carries.
        actual: crate::ir::FuncKind,
    },

    /// An internal allocation failed (hash-table resize, arena growth).
    /// Always fatal to the operation in progress.
    #[error("out of capacity: {reason}")]
    OutOfCapacity {
        /// What allocation failed.
        reason: String,
    },
}
