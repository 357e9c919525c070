//! Miter construction (C6): combine two networks with a matching IO
//! signature into a single-output network whose output is true exactly
//! where the two disagree on some shared primary output.

use crate::ir::{FuncKind, LatchInit, Network, NtkKind, ObjData, ObjKind, Ref};
use crate::result::{EngineError, EngineResult};
use crate::transforms::{check_matching_signature, strash_copy};
use rustc_hash::FxHashMap;

/// Build the miter of `ntk1` and `ntk2`. Both must already be strashed
/// AIGs with a matching PI/PO/latch signature (in name and order);
/// `combinational` selects whether the result is expected to carry no
/// latches at all, or to keep each side's latches as distinct explicit
/// sequential elements, suffixed `_1`/`_2`. Either way the result is an
/// [`NtkKind::Strash`] network: `NtkKind::Seq` is reserved for the
/// edge-latch-count representation built by
/// [`crate::transforms::aig_to_seq`], which has no explicit latch
/// objects at all.
pub fn miter(ntk1: &mut Network, ntk2: &mut Network, combinational: bool) -> EngineResult<Network> {
    let _t = crate::timing::scope("miter");
    if ntk1.func != FuncKind::Aig || ntk2.func != FuncKind::Aig {
        return Err(EngineError::TypeMismatch {
            expected: FuncKind::Aig,
            actual: if ntk1.func != FuncKind::Aig { ntk1.func } else { ntk2.func },
        });
    }
    check_matching_signature(ntk1, ntk2)?;
    if combinational && (!ntk1.latches.is_empty() || !ntk2.latches.is_empty()) {
        return Err(EngineError::SignatureMismatch {
            reason: "combinational miter requires both inputs to carry no latches".into(),
        });
    }

    let mut dst = Network::alloc(NtkKind::Strash, FuncKind::Aig)?;
    dst.name = format!("miter_{}_{}", ntk1.name, ntk2.name);

    // Shared PIs: one destination PI per matched pair, pointed at by both
    // sides' `copy` so `strash_copy` sees a single shared source image.
    let pis1: Vec<_> = ntk1
        .cis
        .iter()
        .copied()
        .filter(|&id| ntk1.obj(id).kind == ObjKind::Pi)
        .collect();
    let pis2: Vec<_> = ntk2
        .cis
        .iter()
        .copied()
        .filter(|&id| ntk2.obj(id).kind == ObjKind::Pi)
        .collect();
    for (&p1, &p2) in pis1.iter().zip(pis2.iter()) {
        let shared = dst.create_pi();
        if let Some(name) = ntk1.io_name(p1) {
            let _ = dst.set_io_name(shared, name);
        }
        ntk1.obj_mut(p1).copy = Some(shared).into();
        ntk2.obj_mut(p2).copy = Some(shared).into();
    }

    // Latches are kept distinct per side, not shared like the PIs.
    for (ntk, suffix) in [(&mut *ntk1, "_1"), (&mut *ntk2, "_2")] {
        for &latch in &ntk.latches.clone() {
            let init = match &ntk.obj(latch).data {
                ObjData::LatchInit(i) => *i,
                _ => LatchInit::DontCare,
            };
            let new_latch = dst.create_latch(init);
            if let Some(name) = ntk.io_name(latch) {
                let _ = dst.set_io_name(new_latch, format!("{name}{suffix}"));
            }
            ntk.obj_mut(latch).copy = Some(new_latch).into();
        }
    }

    // Separate memoization caches per source network: `strash_copy`'s
    // cache key is a source `ObjId`, which is only unique within the
    // network that handed it out, so `ntk1` and `ntk2` (both densely
    // numbered from 0) must not share one cache or an unrelated node
    // pair that happens to collide on id would be folded together.
    let mut cache1 = FxHashMap::default();
    let mut cache2 = FxHashMap::default();
    let pos1: Vec<_> = ntk1
        .cos
        .iter()
        .copied()
        .filter(|&id| ntk1.obj(id).kind == ObjKind::Po)
        .collect();
    let pos2: Vec<_> = ntk2
        .cos
        .iter()
        .copied()
        .filter(|&id| ntk2.obj(id).kind == ObjKind::Po)
        .collect();

    let mut diffs = Vec::with_capacity(pos1.len());
    for (&po1, &po2) in pos1.iter().zip(pos2.iter()) {
        let d1 = ntk1.obj(po1).fanins.first().expect("PO has a driver").peer;
        let d2 = ntk2.obj(po2).fanins.first().expect("PO has a driver").peer;
        let c1 = strash_copy(ntk1, &mut dst, &mut cache1, d1)?;
        let c2 = strash_copy(ntk2, &mut dst, &mut cache2, d2)?;
        diffs.push(dst.aig_xor(c1, c2)?);
    }

    // Each side's latch data-input also needs strashing, and its result
    // wired into the corresponding destination latch, even though it
    // contributes nothing to the miter signal itself.
    for (ntk, cache) in [(&mut *ntk1, &mut cache1), (&mut *ntk2, &mut cache2)] {
        for &latch in &ntk.latches.clone() {
            let driver = ntk.obj(latch).fanins.first().expect("latch has a data input").peer;
            let copy = strash_copy(ntk, &mut dst, cache, driver)?;
            let dst_latch = ntk.obj(latch).copy.expand().expect("latch copy was set above");
            dst.add_fanin(dst_latch, copy);
        }
    }

    let const1 = dst.aig_const1()?;
    let out = diffs
        .into_iter()
        .try_fold(const1.not(), |acc, d| dst.aig_or(acc, d))?;
    let po = dst.create_po();
    dst.add_fanin(po, out);

    dst.check()?;
    Ok(dst)
}
