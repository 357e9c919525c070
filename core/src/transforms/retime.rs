//! Retiming (C6): move latches along the edges of a sequential AIG
//! (`NtkKind::Seq`) without changing the function computed, forward
//! (toward the outputs) or backward (toward the inputs). Operates in
//! place on the edge-latch-count representation [`crate::transforms::aig_to_seq`]
//! produces.

use crate::ir::{Network, NtkKind, ObjId, ObjKind};
use crate::result::{EngineError, EngineResult};

fn require_seq(ntk: &Network) -> EngineResult<()> {
    if ntk.kind != NtkKind::Seq {
        return Err(EngineError::IncompatibleKindFunc {
            kind: ntk.kind,
            func: ntk.func,
        });
    }
    Ok(())
}

/// Move `min(fanin latch counts)` latches from every fanin edge of a
/// node to every one of its fanout edges, repeating until no node has a
/// nonzero fanin minimum left. Pushes latches toward the outputs.
///
/// Uses `Marks.a` as the node's "on the work queue" bit, contractually
/// cleared before returning.
pub fn retime_forward(ntk: &mut Network) -> EngineResult<()> {
    let _t = crate::timing::scope("retime_forward");
    require_seq(ntk)?;
    let const1 = ntk.aig_const1()?.regular();

    let mut queue: Vec<ObjId> = Vec::new();
    for id in ntk.obj_ids().collect::<Vec<_>>() {
        if ntk.obj(id).kind == ObjKind::Node && id != const1 {
            ntk.obj_mut(id).marks.a = true;
            queue.push(id);
        }
    }

    let mut head = 0;
    while head < queue.len() {
        let node = queue[head];
        head += 1;
        if !ntk.obj(node).marks.a {
            continue;
        }
        let n_latches = ntk.fanin_latches_min(node);
        if n_latches == 0 {
            ntk.obj_mut(node).marks.a = false;
            continue;
        }
        let fanin_count = ntk.obj(node).fanins.len();
        for idx in 0..fanin_count {
            ntk.add_fanin_latches(node, idx, -(n_latches as i32));
        }
        let fanouts: Vec<(ObjId, usize)> = ntk.obj(node).fanouts.iter().map(|fo| (fo.user, fo.slot)).collect();
        for (user, slot) in fanouts {
            ntk.add_fanout_latches(user, slot, n_latches as i32);
            if ntk.obj(user).kind == ObjKind::Node && !ntk.obj(user).marks.a {
                ntk.obj_mut(user).marks.a = true;
                queue.push(user);
            }
        }
        ntk.obj_mut(node).marks.a = false;
    }

    for &id in &queue {
        ntk.obj_mut(id).marks.a = false;
    }
    Ok(())
}

/// The mirror of [`retime_forward`]: move `min(fanout latch counts)`
/// latches from every fanout edge of a node to every one of its fanin
/// edges, pushing latches toward the inputs.
pub fn retime_backward(ntk: &mut Network) -> EngineResult<()> {
    let _t = crate::timing::scope("retime_backward");
    require_seq(ntk)?;
    let const1 = ntk.aig_const1()?.regular();

    let mut queue: Vec<ObjId> = Vec::new();
    for id in ntk.obj_ids().collect::<Vec<_>>() {
        if ntk.obj(id).kind == ObjKind::Node && id != const1 {
            ntk.obj_mut(id).marks.a = true;
            queue.push(id);
        }
    }

    let mut head = 0;
    while head < queue.len() {
        let node = queue[head];
        head += 1;
        if !ntk.obj(node).marks.a {
            continue;
        }
        let n_latches = ntk.fanout_latches_min(node);
        if n_latches == 0 {
            ntk.obj_mut(node).marks.a = false;
            continue;
        }
        let fanouts: Vec<(ObjId, usize)> = ntk.obj(node).fanouts.iter().map(|fo| (fo.user, fo.slot)).collect();
        for (user, slot) in &fanouts {
            ntk.add_fanout_latches(*user, *slot, -(n_latches as i32));
        }
        let fanin_peers: Vec<ObjId> = ntk.obj(node).fanins.iter().map(|e| e.peer.regular()).collect();
        let fanin_count = ntk.obj(node).fanins.len();
        for idx in 0..fanin_count {
            ntk.add_fanin_latches(node, idx, n_latches as i32);
            let peer = fanin_peers[idx];
            if ntk.obj(peer).kind == ObjKind::Node && peer != const1 && !ntk.obj(peer).marks.a {
                ntk.obj_mut(peer).marks.a = true;
                queue.push(peer);
            }
        }
        ntk.obj_mut(node).marks.a = false;
    }

    for &id in &queue {
        ntk.obj_mut(id).marks.a = false;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncKind, Ref};

    /// A two-node chain PI -> n1 -> n2 -> PO, with a latch on each edge
    /// reaching n2. Forward retiming should push min(2,2)=... actually
    /// n2 only has one fanin here; build an AND with two latched fanins
    /// instead so there is a genuine min to move.
    #[test]
    fn forward_moves_shared_latch_to_fanout() {
        let mut ntk = Network::alloc(NtkKind::Seq, FuncKind::Aig).unwrap();
        let a = Ref::new(ntk.create_pi());
        let b = Ref::new(ntk.create_pi());
        let and = ntk.aig_and(a, b).unwrap();
        ntk.set_fanin_latches(and.regular(), 0, 1);
        ntk.set_fanin_latches(and.regular(), 1, 1);
        let po = ntk.create_po();
        ntk.add_fanin(po, and);
        ntk.set_fanin_latches(po, 0, 0);

        retime_forward(&mut ntk).unwrap();

        assert_eq!(ntk.fanin_latches_min(and.regular()), 0);
        assert_eq!(ntk.fanin_latches(po, 0), 1);
        assert!(!ntk.obj(and.regular()).marks.a);
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        assert!(retime_forward(&mut ntk).is_err());
    }
}
