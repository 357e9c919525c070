//! Object identity and the tagged complement pointer.
//!
//! Every structural entity in a network (net, node, latch, PI, PO) is
//! addressed by a dense [`ObjId`]. A reference that may additionally carry
//! a logical-negation tag is an [`Ref`]: "the complement of object `o`"
//! denotes the logical negation of `o`'s function, with no distinct object
//! created for it.

use logex_entity::entity_impl;
use std::fmt;

/// A dense, stable index into a network's object arena.
///
/// Stable for the lifetime of the object it names; after deletion the slot
/// may be reused by a later allocation, so an `ObjId` from before a
/// `delete` must not be compared against one from after.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(u32);
entity_impl!(ObjId, "o");

/// A reference to an object, tagged with a one-bit logical-negation flag.
///
/// All AIG construction and traversal takes and returns `Ref`s rather than
/// bare `ObjId`s; [`regular`](Ref::regular) strips the tag,
/// [`is_complement`](Ref::is_complement) reads it, and
/// [`not`](Ref::not)/[`not_cond`](Ref::not_cond) toggle it.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    id: ObjId,
    compl: bool,
}

impl Ref {
    /// An uncomplemented reference to `id`.
    pub fn new(id: ObjId) -> Self {
        Self { id, compl: false }
    }

    /// A reference to `id` with the given polarity.
    pub fn with_polarity(id: ObjId, compl: bool) -> Self {
        Self { id, compl }
    }

    /// Strip the complement tag, returning the underlying object id.
    pub fn regular(self) -> ObjId {
        self.id
    }

    /// Whether this reference denotes the logical negation of the
    /// referenced object's function.
    pub fn is_complement(self) -> bool {
        self.compl
    }

    /// The logical negation of this reference.
    pub fn not(self) -> Self {
        Self {
            id: self.id,
            compl: !self.compl,
        }
    }

    /// The logical negation of this reference, if `cond` is true.
    pub fn not_cond(self, cond: bool) -> Self {
        if cond {
            self.not()
        } else {
            self
        }
    }
}

impl From<ObjId> for Ref {
    fn from(id: ObjId) -> Self {
        Ref::new(id)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.compl {
            write!(f, "!{:?}", self.id)
        } else {
            write!(f, "{:?}", self.id)
        }
    }
}
