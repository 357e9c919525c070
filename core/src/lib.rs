//! A multi-level Boolean network engine: the structurally-hashed AIG core
//! that readers, writers, mappers, SAT glue, and command drivers built on
//! top of this crate all share.
//!
//! This crate owns the in-memory data model of a network (`ir`), the
//! structural-hash AIG engine (`aig`), the traversal primitives every
//! higher-level pass is built from (`traversal`), the invariant checker
//! (`verifier`), and the network-to-network transforms built on top of all
//! of the above (`transforms`).
//!
//! It does not read or write any file format, does not contain a BDD
//! package, a SOP/cover package, or a SAT solver; those are external
//! collaborators this crate only talks to through opaque handles.

pub mod aig;
pub mod ir;
pub mod result;
pub mod timing;
pub mod transforms;
pub mod traversal;
pub mod verifier;

pub use crate::result::{EngineError, EngineResult};
pub use crate::ir::{Network, NtkKind, FuncKind, Obj, ObjData, ObjId, ObjKind, Ref};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
