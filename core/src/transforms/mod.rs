//! Network-to-network transforms built on top of C1-C5 (C6).
//!
//! Every transform here follows the same shape: allocate a destination
//! network with [`crate::ir::Network::start_from`], walk the source,
//! materialize structure on the destination (via the AIG engine for AIG
//! targets, or direct fanin wiring for SOP/logic targets), wire the
//! destination's outputs, and finish with [`crate::ir::Network::check`].
//! A failed check drops the partially-built destination and surfaces the
//! error rather than handing back a broken network.

pub mod balance;
pub mod convert;
pub mod fraig;
pub mod frames;
pub mod miter;
pub mod retime;

pub use balance::{balance, BalanceOptions};
pub use convert::{aig_to_logic_sop, aig_to_seq, logic_sop_to_netlist, make_comb, make_seq, seq_to_logic_sop, LatchBackup};
pub use fraig::{fraig_miter, Equivalence, EquivalenceOracle, FraigOptions};
pub use frames::{frames, InitialValuePolicy};
pub use miter::miter;
pub use retime::{retime_backward, retime_forward};

use crate::ir::{Network, ObjId, ObjKind, Ref};
use crate::result::{EngineError, EngineResult, InvariantViolation};
use rustc_hash::FxHashMap;

/// Recursively copy the fanin cone of `r` from `src` onto `dst`'s AIG
/// engine, memoizing in `cache` by source id. A source object that
/// already carries a `copy` (set by `Network::start_from` for every CI)
/// seeds the cache on first use so CIs need no special-casing here.
///
/// The cache stores each id's image as a `Ref` rather than a bare
/// `ObjId` so that a trivial Boolean fold (e.g. `and(x, not x) = not
/// const1`) that introduces an extra complement is remembered correctly:
/// a later reference to the same source id composes its own complement
/// bit against the cached one instead of silently dropping it.
pub(crate) fn strash_copy(
    src: &Network,
    dst: &mut Network,
    cache: &mut FxHashMap<ObjId, Ref>,
    r: Ref,
) -> EngineResult<Ref> {
    let id = r.regular();
    if let Some(&cached) = cache.get(&id) {
        return Ok(Ref::with_polarity(
            cached.regular(),
            cached.is_complement() ^ r.is_complement(),
        ));
    }
    if let Some(copy) = src.obj(id).copy.expand() {
        cache.insert(id, Ref::new(copy));
        return Ok(Ref::with_polarity(copy, r.is_complement()));
    }
    let obj = src.obj(id);
    if obj.kind != ObjKind::Node || obj.fanins.len() != 2 {
        return Err(EngineError::InvariantViolation {
            violations: vec![InvariantViolation {
                object: id,
                message: "strashing source has no destination image and is not a 2-input AIG node"
                    .into(),
            }],
        });
    }
    let (p0, p1) = (obj.fanins[0].peer, obj.fanins[1].peer);
    let c0 = strash_copy(src, dst, cache, p0)?;
    let c1 = strash_copy(src, dst, cache, p1)?;
    let combined = dst.aig_and(c0, c1)?;
    cache.insert(id, combined);
    Ok(combined)
}

/// Validate that two networks have the same primary-IO signature: equal
/// PI/PO/latch counts and matching names in order, the same check the
/// original system ran before building a miter. `combinational`-mode
/// miter additionally requires both networks to be PI/PO-only (no
/// latches).
pub(crate) fn check_matching_signature(a: &Network, b: &Network) -> EngineResult<()> {
    let names = |ntk: &Network, kind: ObjKind| -> Vec<Option<String>> {
        let ids: Vec<ObjId> = match kind {
            ObjKind::Pi => ntk
                .cis
                .iter()
                .copied()
                .filter(|&id| ntk.obj(id).kind == ObjKind::Pi)
                .collect(),
            ObjKind::Po => ntk
                .cos
                .iter()
                .copied()
                .filter(|&id| ntk.obj(id).kind == ObjKind::Po)
                .collect(),
            ObjKind::Latch => ntk.latches.clone(),
            _ => Vec::new(),
        };
        ids.iter().map(|&id| ntk.io_name(id).map(str::to_owned)).collect()
    };
    for kind in [ObjKind::Pi, ObjKind::Po, ObjKind::Latch] {
        let (na, nb) = (names(a, kind), names(b, kind));
        if na.len() != nb.len() {
            return Err(EngineError::SignatureMismatch {
                reason: format!("{kind:?} count differs: {} vs {}", na.len(), nb.len()),
            });
        }
        if na != nb {
            return Err(EngineError::SignatureMismatch {
                reason: format!("{kind:?} names differ in order or content"),
            });
        }
    }
    Ok(())
}
