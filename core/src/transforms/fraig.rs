//! FRAIG miter wrapper: build the miter of two networks, partition its
//! outputs into cones whose supports overlap enough to be worth reducing
//! together, and fold each cone's functionally-equivalent node pairs
//! into choices; a thin driver over the structural-hash engine and the
//! traversal kernel. Deciding equivalence normally means handing a cone
//! to an external SAT solver; that solver is not part of this crate, so
//! candidate pairs are judged by an [`EquivalenceOracle`] the caller
//! supplies instead.

use crate::ir::{FuncKind, Network, ObjId, ObjKind};
use crate::result::{EngineError, EngineResult};
use crate::transforms::miter;
use crate::traversal;
use rustc_hash::{FxHashMap, FxHashSet};

/// Knobs for [`fraig_miter`].
#[derive(Clone, Copy, Debug)]
pub struct FraigOptions {
    /// A candidate output is folded into an existing cone once its
    /// support shares at least this fraction (of the smaller of the two
    /// supports) with that cone's accumulated support; otherwise it
    /// starts a new cone.
    pub cone_overlap_threshold: f64,
    /// Forwarded to [`miter::miter`]: whether the miter built from the
    /// two input networks is combinational-only or keeps latches.
    pub combinational: bool,
}

impl Default for FraigOptions {
    fn default() -> Self {
        Self {
            cone_overlap_threshold: 0.3,
            combinational: true,
        }
    }
}

/// How two candidate nodes relate, as decided by an external oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Equivalence {
    /// The two nodes compute the same function.
    Same,
    /// The two nodes compute complementary functions.
    Complementary,
}

/// Decides whether a candidate pair of AIG nodes are functionally
/// equivalent. Answering this normally means handing a miter of the two
/// nodes' cones to a SAT solver; that solver is an opaque external
/// collaborator this crate only ever talks to through a handle, so the
/// decision procedure itself lives on the caller's side of this trait.
/// Returning `None` means the question was not settled (e.g. the solver
/// hit a resource bound); the pair is left alone, not merged.
pub trait EquivalenceOracle {
    fn check(&mut self, ntk: &Network, a: ObjId, b: ObjId) -> Option<Equivalence>;
}

/// Build the miter of `ntk1`/`ntk2` and fold each support-cone's
/// equivalent node pairs into AIG choices.
pub fn fraig_miter(
    ntk1: &mut Network,
    ntk2: &mut Network,
    options: &FraigOptions,
    oracle: &mut dyn EquivalenceOracle,
) -> EngineResult<Network> {
    let _t = crate::timing::scope("fraig_miter");
    if ntk1.func != FuncKind::Aig || ntk2.func != FuncKind::Aig {
        return Err(EngineError::TypeMismatch {
            expected: FuncKind::Aig,
            actual: if ntk1.func != FuncKind::Aig { ntk1.func } else { ntk2.func },
        });
    }

    let mut dst = miter::miter(ntk1, ntk2, options.combinational)?;

    let po_ids: Vec<ObjId> = dst
        .cos
        .iter()
        .copied()
        .filter(|&id| dst.obj(id).kind == ObjKind::Po)
        .collect();
    let cones = partition_by_support(&mut dst, &po_ids, options.cone_overlap_threshold);

    let mut all_heads = Vec::new();
    for cone in &cones {
        all_heads.extend(fraig_cone(&mut dst, cone, oracle)?);
    }
    log::debug!(
        "fraig_miter: {} cone(s) over {} output(s), {} choice class(es) added",
        cones.len(),
        po_ids.len(),
        all_heads.len()
    );

    // A choice class collapses several structurally distinct nodes onto
    // one equivalence class; re-equalize each class's level to the max
    // across its members so a later required-time analysis sees the
    // class as a single node rather than whichever member happened to be
    // picked as head.
    traversal::equalize_choice_levels(&mut dst, &all_heads, traversal::ChoiceLevelPolicy::Max);

    dst.check()?;
    Ok(dst)
}

/// Greedily assign each output's driver to the first cone whose
/// accumulated support it overlaps enough with, opening a new cone
/// otherwise. A first-fit rule rather than an optimal partition: this
/// crate bounds cones by support overlap, not by a target node count.
fn partition_by_support(ntk: &mut Network, po_ids: &[ObjId], threshold: f64) -> Vec<Vec<ObjId>> {
    let mut accum: Vec<(FxHashSet<ObjId>, Vec<ObjId>)> = Vec::new();
    for &po in po_ids {
        let Some(driver) = traversal::driver_of(ntk, po) else {
            continue;
        };
        let root = driver.regular();
        let supp: FxHashSet<ObjId> = traversal::support(ntk, &[root]).into_iter().collect();

        let mut placed = false;
        for (acc_supp, roots) in &mut accum {
            if supp.is_empty() || acc_supp.is_empty() {
                continue;
            }
            let shared = supp.intersection(acc_supp).count();
            let frac = shared as f64 / supp.len().min(acc_supp.len()) as f64;
            if frac >= threshold {
                acc_supp.extend(supp.iter().copied());
                roots.push(root);
                placed = true;
                break;
            }
        }
        if !placed {
            accum.push((supp, vec![root]));
        }
    }

    accum
        .into_iter()
        .map(|(_, roots)| traversal::dfs_nodes(ntk, &roots))
        .collect()
}

/// Within one cone's node set, ask the oracle about every same-level
/// pair not already folded into another pair's class (structural
/// hashing has already merged identical subgraphs, so surviving
/// candidates differ in structure; real FRAIG narrows the search with
/// simulation signatures first, which, like the SAT call itself, lives
/// outside this crate). Confirmed pairs become an AIG choice
/// rooted at the first-seen (lower-id) member; they are not replaced,
/// so both structures remain available to a later mapping pass.
fn fraig_cone(ntk: &mut Network, nodes: &[ObjId], oracle: &mut dyn EquivalenceOracle) -> EngineResult<Vec<ObjId>> {
    let mut by_level: FxHashMap<u32, Vec<ObjId>> = FxHashMap::default();
    for &id in nodes {
        by_level.entry(ntk.obj(id).level).or_default().push(id);
    }

    let mut already_member: FxHashSet<ObjId> = FxHashSet::default();
    let mut heads = Vec::new();
    for bucket in by_level.into_values() {
        for i in 0..bucket.len() {
            let head = bucket[i];
            if already_member.contains(&head) {
                continue;
            }
            for &member in &bucket[i + 1..] {
                if already_member.contains(&member) {
                    continue;
                }
                match oracle.check(ntk, head, member) {
                    Some(eq) => {
                        let inverse = eq == Equivalence::Complementary;
                        ntk.aig_create_choice(head, member, inverse)?;
                        already_member.insert(member);
                        if !heads.contains(&head) {
                            heads.push(head);
                        }
                    }
                    None => {}
                }
            }
        }
    }
    Ok(heads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{NtkKind, Ref};

    /// An oracle that only ever confirms one specific pair, standing in
    /// for a SAT call that proved exactly that pair equivalent.
    struct FixedOracle {
        pair: (ObjId, ObjId),
        verdict: Equivalence,
        asked: Vec<(ObjId, ObjId)>,
    }

    impl EquivalenceOracle for FixedOracle {
        fn check(&mut self, _ntk: &Network, a: ObjId, b: ObjId) -> Option<Equivalence> {
            self.asked.push((a, b));
            if (a, b) == self.pair || (b, a) == self.pair {
                Some(self.verdict)
            } else {
                None
            }
        }
    }

    #[test]
    fn cone_stitches_confirmed_pair_as_choice() {
        let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        let a = Ref::new(ntk.create_pi());
        let b = Ref::new(ntk.create_pi());
        let c = Ref::new(ntk.create_pi());

        // Two different structures for a*(b+c) = a*b + a*c, both level 2.
        let direct = ntk.aig_and(a, ntk.aig_or(b, c).unwrap()).unwrap();
        let distributed = ntk
            .aig_or(ntk.aig_and(a, b).unwrap(), ntk.aig_and(a, c).unwrap())
            .unwrap();
        assert_ne!(direct.regular(), distributed.regular());

        let mut oracle = FixedOracle {
            pair: (direct.regular(), distributed.regular()),
            verdict: Equivalence::Same,
            asked: Vec::new(),
        };
        let nodes = vec![direct.regular(), distributed.regular()];
        let heads = fraig_cone(&mut ntk, &nodes, &mut oracle).unwrap();

        assert_eq!(heads, vec![direct.regular()]);
        let members = ntk.aig_choice_members(direct.regular());
        assert!(members.contains(&distributed.regular()));
    }

    #[test]
    fn partitioning_separates_disjoint_supports() {
        let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
        let a = Ref::new(ntk.create_pi());
        let b = Ref::new(ntk.create_pi());
        let c = Ref::new(ntk.create_pi());
        let d = Ref::new(ntk.create_pi());
        let ab = ntk.aig_and(a, b).unwrap();
        let cd = ntk.aig_and(c, d).unwrap();
        let po1 = ntk.create_po();
        ntk.add_fanin(po1, ab);
        let po2 = ntk.create_po();
        ntk.add_fanin(po2, cd);

        let cones = partition_by_support(&mut ntk, &[po1, po2], 0.5);
        assert_eq!(cones.len(), 2);
    }
}
