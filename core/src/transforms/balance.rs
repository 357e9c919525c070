//! Balance (C6): rebuild each output's driving AND-tree as a balanced
//! tree, shrinking the critical path through long single-phase chains
//! without changing the function computed.

use crate::ir::{FuncKind, Network, ObjId, ObjKind, Ref};
use crate::result::{EngineError, EngineResult};
use crate::transforms::strash_copy;
use rustc_hash::FxHashMap;

/// Knobs for [`balance`].
#[derive(Clone, Debug)]
pub struct BalanceOptions {
    /// Expand through nodes with more than one fanout, duplicating their
    /// logic into every supergate that reaches them. Off by default:
    /// balancing is a level-reduction pass, not a fanout-blowup one.
    pub duplicate: bool,
    /// Seed for randomizing the tie-break among same-level leaves when
    /// rebuilding a supergate. `None` (the default) always breaks ties by
    /// original collection order, which is deterministic but otherwise
    /// arbitrary.
    pub seed: Option<u64>,
}

impl Default for BalanceOptions {
    fn default() -> Self {
        Self {
            duplicate: false,
            seed: None,
        }
    }
}

/// A small xorshift generator, used only to make the tie-break
/// randomization knob itself reproducible given a seed.
struct XorShift64(u64);

impl XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

/// Rebuild every output's driving AND-tree as a balanced tree.
pub fn balance(src: &mut Network, opts: &BalanceOptions) -> EngineResult<Network> {
    let _t = crate::timing::scope("balance");
    if src.func != FuncKind::Aig {
        return Err(EngineError::TypeMismatch {
            expected: FuncKind::Aig,
            actual: src.func,
        });
    }

    let mut dst = Network::start_from(src, src.kind, src.func)?;
    let mut cache = FxHashMap::default();
    let mut rng = opts.seed.map(XorShift64);

    for co in src.cos.clone() {
        let driver = src
            .obj(co)
            .fanins
            .first()
            .expect("CO has a driver")
            .peer;
        let new_driver = rebalance(src, &mut dst, &mut cache, driver, opts, &mut rng)?;

        match src.obj(co).kind {
            ObjKind::Po => {
                let new_po = dst.create_po();
                if let Some(name) = src.io_name(co) {
                    let _ = dst.set_io_name(new_po, name);
                }
                dst.add_fanin(new_po, new_driver);
            }
            ObjKind::Latch => {
                let dst_latch = src
                    .obj(co)
                    .copy
                    .expand()
                    .expect("latch CI already has its destination copy from start_from");
                dst.add_fanin(dst_latch, new_driver);
            }
            other => unreachable!("CO with unexpected kind {other:?}"),
        }
    }

    dst.check()?;
    Ok(dst)
}

fn is_and_node(ntk: &Network, id: ObjId) -> bool {
    ntk.obj(id).kind == ObjKind::Node && ntk.obj(id).fanins.len() == 2
}

/// Collect the nodes reachable from `node_ref` by descending through
/// uncomplemented 2-input ANDs (the "supergate"). A node with more than
/// one fanout ends the descent unless `duplicate` is set; a complemented
/// reference always ends it, since the complement bit blocks further
/// distribution into the AND structure.
fn collect_supergate(src: &Network, node_ref: Ref, root: ObjId, duplicate: bool, leaves: &mut Vec<Ref>) {
    let id = node_ref.regular();
    if node_ref.is_complement() || !is_and_node(src, id) {
        leaves.push(node_ref);
        return;
    }
    if id != root && !duplicate && src.obj(id).fanouts.len() > 1 {
        leaves.push(node_ref);
        return;
    }
    let (p0, p1) = {
        let obj = src.obj(id);
        (obj.fanins[0].peer, obj.fanins[1].peer)
    };
    collect_supergate(src, p0, root, duplicate, leaves);
    collect_supergate(src, p1, root, duplicate, leaves);
}

fn rebalance(
    src: &Network,
    dst: &mut Network,
    cache: &mut FxHashMap<ObjId, Ref>,
    driver: Ref,
    opts: &BalanceOptions,
    rng: &mut Option<XorShift64>,
) -> EngineResult<Ref> {
    if driver.is_complement() || !is_and_node(src, driver.regular()) {
        return strash_copy(src, dst, cache, driver);
    }

    let mut leaves = Vec::new();
    collect_supergate(src, driver, driver.regular(), opts.duplicate, &mut leaves);

    let mut dest_leaves: Vec<Ref> = leaves
        .into_iter()
        .map(|r| strash_copy(src, dst, cache, r))
        .collect::<EngineResult<_>>()?;

    while dest_leaves.len() > 1 {
        let (hi, lo) = pick_two_highest(dst, &dest_leaves, rng);
        let b = dest_leaves.remove(hi);
        let a = dest_leaves.remove(lo);
        let combined = dst.aig_and(a, b)?;
        dest_leaves.push(combined);
    }
    Ok(dest_leaves[0])
}

/// Index pair `(hi, lo)` with `hi > lo`, naming the two leaves with the
/// highest level (ties broken by original order, or, if a seed is set,
/// by a reproducible shuffle of the tied group).
fn pick_two_highest(dst: &Network, leaves: &[Ref], rng: &mut Option<XorShift64>) -> (usize, usize) {
    let mut idx: Vec<usize> = (0..leaves.len()).collect();
    idx.sort_by_key(|&i| std::cmp::Reverse(dst.obj(leaves[i].regular()).level));

    if let Some(rng) = rng {
        let top_level = dst.obj(leaves[idx[0]].regular()).level;
        let tie_len = idx
            .iter()
            .take_while(|&&i| dst.obj(leaves[i].regular()).level == top_level)
            .count();
        for k in (1..tie_len).rev() {
            let j = (rng.next_u64() as usize) % (k + 1);
            idx[..tie_len].swap(k, j);
        }
    }

    let (first, second) = (idx[0], idx[1]);
    if first > second {
        (first, second)
    } else {
        (second, first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NtkKind;

    #[test]
    fn left_chain_becomes_balanced_tree() {
        let mut src = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        let a = Ref::new(src.create_pi());
        let b = Ref::new(src.create_pi());
        let c = Ref::new(src.create_pi());
        let d = Ref::new(src.create_pi());

        let ab = src.aig_and(a, b).unwrap();
        let abc = src.aig_and(ab, c).unwrap();
        let abcd = src.aig_and(abc, d).unwrap();
        let po = src.create_po();
        src.add_fanin(po, abcd);
        crate::traversal::compute_levels(&mut src);

        let dst = balance(&mut src, &BalanceOptions::default()).unwrap();
        let driver = dst.obj(dst.cos[0]).fanins[0].peer;
        assert_eq!(dst.obj(driver.regular()).level, 2);
    }
}
