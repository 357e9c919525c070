//! Fanin/fanout edges.
//!
//! A fanin edge carries a peer (folded together with its complement bit
//! into a [`Ref`]) and a sequential-AIG latch count. The mirrored fanout
//! edge does not duplicate
//! that state; it just remembers which of the user's fanin slots points
//! back here, so a position-preserving edit (`patchFanin`) can find it in
//! O(1) instead of a linear scan.

use crate::ir::{ObjId, Ref};

/// One fanin of an object: `peer` is the driver (possibly complemented),
/// `n_latches` is the number of latches folded into the edge (sequential
/// AIG only; zero elsewhere).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FaninEdge {
    pub peer: Ref,
    pub n_latches: u32,
}

impl FaninEdge {
    pub fn new(peer: Ref) -> Self {
        Self { peer, n_latches: 0 }
    }
}

/// One fanout of an object: `user` depends on this object through its
/// `slot`-th fanin.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FanoutEdge {
    pub user: ObjId,
    pub slot: usize,
}
