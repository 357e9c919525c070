//! The traversal kernel (C5): every forward/reverse walk, levelization,
//! acyclicity check, support, and MFFC computation shares the `travId`
//! mechanism: bump the network's counter once per pass, then mark each
//! object's `trav_id` on first visit instead of maintaining a separate
//! visited set.

use crate::ir::{FuncKind, Network, ObjId, ObjKind, Ref};
use crate::result::{EngineError, EngineResult};
use std::collections::HashSet;

/// Topologically ordered internal (non-CI, non-CO) nodes reachable from
/// the drivers of every CO. If `collect_all`, every still-unvisited
/// internal node is appended afterward, in arena order, so dangling
/// sub-AIGs are not silently dropped.
pub fn dfs(ntk: &mut Network, collect_all: bool) -> Vec<ObjId> {
    ntk.increment_trav_id();
    let mut order = Vec::new();
    let roots: Vec<ObjId> = ntk.cos.clone();
    for co in roots {
        if let Some(edge) = ntk.obj(co).fanins.first() {
            dfs_visit(ntk, edge.peer.regular(), &mut order);
        }
    }
    if collect_all {
        let all: Vec<ObjId> = ntk.obj_ids().collect();
        for id in all {
            if ntk.obj(id).kind == ObjKind::Node && !ntk.is_trav_current(id) {
                dfs_visit(ntk, id, &mut order);
            }
        }
    }
    order
}

/// `dfs`, but rooted at an explicit set of objects rather than every CO.
pub fn dfs_nodes(ntk: &mut Network, roots: &[ObjId]) -> Vec<ObjId> {
    ntk.increment_trav_id();
    let mut order = Vec::new();
    for &root in roots {
        dfs_visit(ntk, root, &mut order);
    }
    order
}

/// Mark `id` visited and push it (and, recursively, every member of its
/// AIG choice class) onto the work stack. Choice members sit off to the
/// side of the ordinary fanin graph, reachable only through
/// `ObjData::ChoiceNext`, never as anyone's fanin, so without this a
/// member's own fanin cone would only surface via `collectAll`'s
/// unordered fallback sweep instead of alongside the rest of its class.
/// A no-op (`aig_choice_members` returns empty) on any non-AIG network.
fn push_with_choices(ntk: &mut Network, id: ObjId, stack: &mut Vec<(ObjId, usize)>) {
    if ntk.is_trav_current(id) {
        return;
    }
    ntk.mark_trav_current(id);
    stack.push((id, 0));
    for member in ntk.aig_choice_members(id) {
        push_with_choices(ntk, member, stack);
    }
}

fn dfs_visit(ntk: &mut Network, id: ObjId, order: &mut Vec<ObjId>) {
    // Explicit work stack of (object, next fanin index) rather than
    // recursion: deeply chained AIGs would otherwise blow the call stack.
    let mut stack: Vec<(ObjId, usize)> = Vec::new();
    if ntk.is_trav_current(id) {
        return;
    }
    push_with_choices(ntk, id, &mut stack);
    while let Some(&mut (top, ref mut next_idx)) = stack.last_mut() {
        let fanin_count = ntk.obj(top).fanins.len();
        if *next_idx < fanin_count {
            let edge = ntk.obj(top).fanins[*next_idx];
            *next_idx += 1;
            // An edge carrying a latch count is a registered boundary: the
            // value it delivers is a prior cycle's, so the producer needs
            // no topological precedence over `top` through this edge
            // (mirrors stopping descent at a CI).
            if edge.n_latches == 0 {
                let peer = edge.peer.regular();
                if ntk.obj(peer).kind == ObjKind::Node {
                    push_with_choices(ntk, peer, &mut stack);
                }
            }
        } else {
            if ntk.obj(top).kind == ObjKind::Node {
                order.push(top);
            }
            stack.pop();
        }
    }
}

/// Internal nodes in reverse topological order (every fanout-before-fanin
/// user appears before its producer), reached by walking `fanouts` from
/// every CI.
pub fn dfs_reverse(ntk: &mut Network) -> Vec<ObjId> {
    ntk.increment_trav_id();
    let mut order = Vec::new();
    let roots: Vec<ObjId> = ntk.cis.clone();
    for ci in roots {
        dfs_reverse_visit(ntk, ci, &mut order);
    }
    order
}

fn dfs_reverse_visit(ntk: &mut Network, id: ObjId, order: &mut Vec<ObjId>) {
    let mut stack: Vec<(ObjId, usize)> = Vec::new();
    if ntk.is_trav_current(id) {
        return;
    }
    stack.push((id, 0));
    ntk.mark_trav_current(id);
    while let Some(&mut (top, ref mut next_idx)) = stack.last_mut() {
        let fanout_count = ntk.obj(top).fanouts.len();
        if *next_idx < fanout_count {
            let fo = ntk.obj(top).fanouts[*next_idx];
            *next_idx += 1;
            let through_latch = ntk.obj(fo.user).fanins[fo.slot].n_latches > 0;
            if !through_latch && !ntk.is_trav_current(fo.user) && ntk.obj(fo.user).kind == ObjKind::Node {
                ntk.mark_trav_current(fo.user);
                stack.push((fo.user, 0));
            }
        } else {
            if ntk.obj(top).kind == ObjKind::Node {
                order.push(top);
            }
            stack.pop();
        }
    }
}

/// The transitive fanout of `root`, bucketed by level (`result[i]` holds
/// every node at level `i` above `root`'s own level). Requires
/// `compute_levels` to have been run since the last structural edit.
pub fn dfs_levelized(ntk: &mut Network, root: ObjId, reverse: bool) -> Vec<Vec<ObjId>> {
    ntk.increment_trav_id();
    let root_level = ntk.obj(root).level;
    let mut buckets: Vec<Vec<ObjId>> = Vec::new();
    let mut queue = vec![root];
    ntk.mark_trav_current(root);
    let mut head = 0;
    while head < queue.len() {
        let id = queue[head];
        head += 1;
        let next: Vec<ObjId> = if reverse {
            ntk.obj(id).fanins.iter().map(|e| e.peer.regular()).collect()
        } else {
            ntk.obj(id).fanouts.iter().map(|e| e.user).collect()
        };
        for n in next {
            if ntk.obj(n).kind != ObjKind::Node || ntk.is_trav_current(n) {
                continue;
            }
            ntk.mark_trav_current(n);
            let level = ntk.obj(n).level;
            let bucket = level.saturating_sub(root_level) as usize;
            if buckets.len() <= bucket {
                buckets.resize_with(bucket + 1, Vec::new);
            }
            buckets[bucket].push(n);
            queue.push(n);
        }
    }
    buckets
}

/// Assign `level(ci) = level(const) = 0`, `level(internal) = 1 +
/// max(fanin levels)`, by walking a topological DFS order. Returns the
/// network's maximum level.
pub fn compute_levels(ntk: &mut Network) -> u32 {
    for &ci in &ntk.cis.clone() {
        ntk.obj_mut(ci).level = 0;
    }
    let const1 = if ntk.func == FuncKind::Aig {
        ntk.aig_const1().ok().map(|r| r.regular())
    } else {
        None
    };
    let order = dfs(ntk, true);
    let mut max_level = 0;
    for id in order {
        if Some(id) == const1 {
            ntk.obj_mut(id).level = 0;
            continue;
        }
        let level = 1 + ntk
            .obj(id)
            .fanins
            .iter()
            .map(|e| ntk.obj(e.peer.regular()).level)
            .max()
            .unwrap_or(0);
        ntk.obj_mut(id).level = level;
        max_level = max_level.max(level);
    }
    max_level
}

/// Which direction an [`equalize_choice_levels`] pass rounds a choice
/// class's members to: the class's max level (required-time analysis,
/// so nothing downstream of any member is scheduled too early) or its
/// min level (arrival-time analysis).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChoiceLevelPolicy {
    Max,
    Min,
}

/// Overwrite every member of each `heads` entry's choice-equivalence
/// class (and the head itself) with one shared level: the class's max
/// or min, per `policy`. Run after [`compute_levels`] has given each
/// node its own structural level; a node outside every class keeps the
/// level `compute_levels` gave it.
pub fn equalize_choice_levels(ntk: &mut Network, heads: &[ObjId], policy: ChoiceLevelPolicy) {
    for &head in heads {
        let members = ntk.aig_choice_members(head);
        let mut target = ntk.obj(head).level;
        for &member in &members {
            let level = ntk.obj(member).level;
            target = match policy {
                ChoiceLevelPolicy::Max => target.max(level),
                ChoiceLevelPolicy::Min => target.min(level),
            };
        }
        ntk.obj_mut(head).level = target;
        for &member in &members {
            ntk.obj_mut(member).level = target;
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Color {
    OnPath,
    Done,
}

/// Two-color DFS. Each node is tagged "on the current descent path" or
/// "fully explored" in a local scratch map, mirroring the `travIds` /
/// `travIds - 1` discrimination the rest of this module uses, but kept
/// off the network itself so `check` (which must not mutate) can call
/// this too. Returns `Err` with the offending cycle's object path on the
/// first cycle found.
pub fn is_acyclic(ntk: &Network) -> EngineResult<()> {
    let mut color: std::collections::HashMap<ObjId, Color> = std::collections::HashMap::new();

    for &co in &ntk.cos {
        if let Some(edge) = ntk.obj(co).fanins.first() {
            let mut path = Vec::new();
            if let Err(mut cycle) = acyclic_visit(ntk, edge.peer.regular(), &mut color, &mut path) {
                cycle.push(co);
                return Err(EngineError::CombinationalLoop { path: cycle });
            }
        }
    }
    Ok(())
}

fn acyclic_visit(
    ntk: &Network,
    id: ObjId,
    color: &mut std::collections::HashMap<ObjId, Color>,
    path: &mut Vec<ObjId>,
) -> Result<(), Vec<ObjId>> {
    match color.get(&id) {
        Some(Color::OnPath) => return Err(vec![id]),
        Some(Color::Done) => return Ok(()),
        None => {}
    }
    if ntk.obj(id).kind != ObjKind::Node {
        return Ok(());
    }
    color.insert(id, Color::OnPath);
    path.push(id);
    for edge in &ntk.obj(id).fanins {
        // A latch-weighted edge breaks the combinational path: its value
        // is a prior cycle's, so it cannot itself form a zero-delay loop.
        if edge.n_latches > 0 {
            continue;
        }
        if let Err(mut cycle) = acyclic_visit(ntk, edge.peer.regular(), color, path) {
            cycle.push(id);
            return Err(cycle);
        }
    }
    path.pop();
    color.insert(id, Color::Done);
    Ok(())
}

/// The set of CIs reachable from `roots` via fanin edges.
pub fn support(ntk: &mut Network, roots: &[ObjId]) -> Vec<ObjId> {
    ntk.increment_trav_id();
    let mut cis = Vec::new();
    let mut stack: Vec<ObjId> = roots.to_vec();
    for &r in roots {
        ntk.mark_trav_current(r);
    }
    while let Some(id) = stack.pop() {
        if ntk.obj(id).is_ci() {
            cis.push(id);
            continue;
        }
        let fanins: Vec<ObjId> = ntk.obj(id).fanins.iter().map(|e| e.peer.regular()).collect();
        for peer in fanins {
            if !ntk.is_trav_current(peer) {
                ntk.mark_trav_current(peer);
                stack.push(peer);
            }
        }
    }
    cis
}

/// The maximum fanout-free cone *beneath* `n`: every node strictly below
/// the apex whose entire fanout stays within the cone plus `n` itself,
/// i.e. the support that would become dead if `n`'s fanins were cut.
/// `n` itself is not included; the full set that would die is this cone
/// plus `n`. Computed by a transient fanout-reference-count decrement, so
/// no separate "inside the cone" set beyond the counts is needed.
pub fn mffc_collect(ntk: &Network, n: ObjId) -> Vec<ObjId> {
    let mut refs: std::collections::HashMap<ObjId, usize> = std::collections::HashMap::new();
    let mut cone = Vec::new();
    let mut stack = vec![n];
    let mut visited = HashSet::new();
    visited.insert(n);
    while let Some(id) = stack.pop() {
        if ntk.obj(id).kind != ObjKind::Node {
            continue;
        }
        for edge in &ntk.obj(id).fanins {
            let peer = edge.peer.regular();
            let remaining = refs.entry(peer).or_insert_with(|| ntk.obj(peer).fanouts.len());
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 && !ntk.obj(peer).is_ci() && visited.insert(peer) {
                cone.push(peer);
                stack.push(peer);
            }
        }
    }
    cone
}

/// Number of nodes that would be removed by cutting at `n`: `n` itself
/// plus its MFFC.
pub fn mffc_size(ntk: &Network, n: ObjId) -> usize {
    mffc_collect(ntk, n).len() + 1
}

/// Mark `n` and every member of its MFFC with the network's current
/// `trav_id`. Caller must have called `increment_trav_id` first if a
/// fresh marking pass is wanted.
pub fn mffc_label(ntk: &mut Network, n: ObjId) {
    let cone = mffc_collect(ntk, n);
    ntk.mark_trav_current(n);
    for id in cone {
        ntk.mark_trav_current(id);
    }
}

/// `Ref`-returning convenience wrapper used by transforms that only
/// care about the driven reference, not the bare id.
pub fn driver_of(ntk: &Network, co: ObjId) -> Option<Ref> {
    ntk.obj(co).fanins.first().map(|e| e.peer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncKind, NtkKind};

    #[test]
    fn dfs_orders_producers_before_consumers() {
        let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        let a = Ref::new(ntk.create_pi());
        let b = Ref::new(ntk.create_pi());
        let ab = ntk.aig_and(a, b).unwrap();
        let c = Ref::new(ntk.create_pi());
        let abc = ntk.aig_and(ab, c).unwrap();
        let po = ntk.create_po();
        ntk.add_fanin(po, abc);

        let order = dfs(&mut ntk, false);
        let pos_ab = order.iter().position(|&x| x == ab.regular()).unwrap();
        let pos_abc = order.iter().position(|&x| x == abc.regular()).unwrap();
        assert!(pos_ab < pos_abc);
    }

    #[test]
    fn acyclic_combinational_aig() {
        let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        let a = Ref::new(ntk.create_pi());
        let b = Ref::new(ntk.create_pi());
        let ab = ntk.aig_and(a, b).unwrap();
        let po = ntk.create_po();
        ntk.add_fanin(po, ab);

        assert!(is_acyclic(&ntk).is_ok());
    }

    #[test]
    fn cycle_is_reported() {
        let mut ntk = Network::alloc(NtkKind::Logic, FuncKind::Sop).unwrap();
        let n1 = ntk.create_node();
        let n2 = ntk.create_node();
        ntk.add_fanin(n2, Ref::new(n1));
        ntk.add_fanin(n1, Ref::new(n2));
        let po = ntk.create_po();
        ntk.add_fanin(po, Ref::new(n2));

        let err = is_acyclic(&ntk).unwrap_err();
        match err {
            EngineError::CombinationalLoop { path } => {
                assert!(path.contains(&n1));
                assert!(path.contains(&n2));
            }
            other => panic!("expected CombinationalLoop, got {other:?}"),
        }
    }

    #[test]
    fn mffc_soundness() {
        let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        let a = Ref::new(ntk.create_pi());
        let b = Ref::new(ntk.create_pi());
        let c = Ref::new(ntk.create_pi());
        let ab = ntk.aig_and(a, b).unwrap();
        let abc = ntk.aig_and(ab, c).unwrap();
        let po = ntk.create_po();
        ntk.add_fanin(po, abc);

        let cone = mffc_collect(&ntk, abc.regular());
        let cone_set: HashSet<ObjId> = cone.iter().copied().collect();
        assert!(cone_set.contains(&ab.regular()));
        for &id in &cone {
            for edge in &ntk.obj(id).fanouts {
                assert!(cone_set.contains(&edge.user) || edge.user == abc.regular());
            }
        }
    }

    #[test]
    fn equalize_choice_levels_rounds_to_class_max() {
        let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        let a = Ref::new(ntk.create_pi());
        let b = Ref::new(ntk.create_pi());
        let c = Ref::new(ntk.create_pi());
        let direct = ntk.aig_and(a, ntk.aig_or(b, c).unwrap()).unwrap();
        let distributed = ntk
            .aig_or(ntk.aig_and(a, b).unwrap(), ntk.aig_and(a, c).unwrap())
            .unwrap();
        assert_ne!(direct.regular(), distributed.regular());
        let po = ntk.create_po();
        ntk.add_fanin(po, direct);
        let po2 = ntk.create_po();
        ntk.add_fanin(po2, distributed);
        compute_levels(&mut ntk);

        let direct_level = ntk.obj(direct.regular()).level;
        let distributed_level = ntk.obj(distributed.regular()).level;
        assert_ne!(direct_level, distributed_level);

        ntk.aig_create_choice(direct.regular(), distributed.regular(), false).unwrap();
        equalize_choice_levels(&mut ntk, &[direct.regular()], ChoiceLevelPolicy::Max);

        let expected = direct_level.max(distributed_level);
        assert_eq!(ntk.obj(direct.regular()).level, expected);
        assert_eq!(ntk.obj(distributed.regular()).level, expected);
    }

    #[test]
    fn compute_levels_assigns_constant_level_zero() {
        let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        let a = Ref::new(ntk.create_pi());
        let const1 = ntk.aig_const1().unwrap();
        let po = ntk.create_po();
        ntk.add_fanin(po, const1.not());
        let po2 = ntk.create_po();
        ntk.add_fanin(po2, a);

        compute_levels(&mut ntk);
        assert_eq!(ntk.obj(const1.regular()).level, 0);
    }
}
