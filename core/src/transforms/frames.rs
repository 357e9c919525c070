//! Time-frame unrolling (C6): build a purely combinational network whose
//! structure is `k` copies of a sequential network's logic, one per
//! cycle, with each frame's latch outputs fed by the previous frame's
//! latch-driver values.

use crate::ir::{FuncKind, LatchInit, Network, NtkKind, ObjData, ObjId, ObjKind, Ref};
use crate::result::{EngineError, EngineResult};
use rustc_hash::FxHashMap;

/// How a latch's value entering frame 0 is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialValuePolicy {
    /// Keep the latches: the unrolled network is itself sequential
    /// (`NtkKind::Strash`, carrying explicit latch objects same as any
    /// other sequential strashed AIG), with one latch per original,
    /// driven by the value computed in the final frame.
    KeepAsLatches,
    /// Drop the latches: a `Zero`/`One`-initialized latch becomes the
    /// matching constant in frame 0; a `DontCare`-initialized latch
    /// becomes a fresh free primary input instead, and the result is
    /// purely combinational (`NtkKind::Strash`).
    Initialize,
}

/// Unroll `src` (a strashed sequential AIG) into `k` combinational
/// copies. Every PI/PO is duplicated once per frame with a `_NN` name
/// suffix (`_00`, `_01`, ...).
pub fn frames(src: &mut Network, k: u32, initial: InitialValuePolicy) -> EngineResult<Network> {
    let _t = crate::timing::scope("frames");
    if src.func != FuncKind::Aig {
        return Err(EngineError::TypeMismatch {
            expected: FuncKind::Aig,
            actual: src.func,
        });
    }
    if k == 0 {
        return Err(EngineError::SignatureMismatch {
            reason: "frames() requires at least one time frame".into(),
        });
    }

    let dst_kind = NtkKind::Strash;
    let mut dst = Network::alloc(dst_kind, FuncKind::Aig)?;
    dst.name = format!("{}_{}frames", src.name, k);

    let const1 = src.aig_const1()?;
    let dst_const1 = dst.aig_const1()?;

    // A latch's value as frame 0 reads it: either its own freshly
    // duplicated latch object (KeepAsLatches) or a constant/fresh PI
    // drawn from its initial value (Initialize). Re-seeded after every
    // frame to that frame's computed driver value.
    let mut latch_value: FxHashMap<ObjId, Ref> = FxHashMap::default();
    let mut dst_latch_of: FxHashMap<ObjId, ObjId> = FxHashMap::default();
    let mut free_inits = 0u32;

    for &latch in &src.latches.clone() {
        let init = match &src.obj(latch).data {
            ObjData::LatchInit(i) => *i,
            _ => LatchInit::DontCare,
        };
        match initial {
            InitialValuePolicy::KeepAsLatches => {
                let new_latch = dst.create_latch(init);
                if let Some(name) = src.io_name(latch) {
                    let _ = dst.set_io_name(new_latch, name);
                }
                dst_latch_of.insert(latch, new_latch);
                latch_value.insert(latch, Ref::new(new_latch));
            }
            InitialValuePolicy::Initialize => match init {
                LatchInit::Zero => {
                    latch_value.insert(latch, dst_const1.not());
                }
                LatchInit::One => {
                    latch_value.insert(latch, dst_const1);
                }
                LatchInit::DontCare => {
                    let pi = dst.create_pi();
                    let base = src.io_name(latch).map(str::to_owned).unwrap_or_else(|| latch.to_string());
                    let _ = dst.set_io_name(pi, format!("{base}_init"));
                    latch_value.insert(latch, Ref::new(pi));
                    free_inits += 1;
                }
            },
        }
    }
    if free_inits > 0 {
        log::warn!("frames(): {free_inits} don't-care latch init(s) became free primary inputs");
    }

    let order = crate::traversal::dfs(src, true);
    let pi_ids: Vec<ObjId> = src
        .cis
        .iter()
        .copied()
        .filter(|&id| src.obj(id).kind == ObjKind::Pi)
        .collect();
    let po_ids: Vec<ObjId> = src
        .cos
        .iter()
        .copied()
        .filter(|&id| src.obj(id).kind == ObjKind::Po)
        .collect();

    for frame in 0..k {
        let mut images: FxHashMap<ObjId, Ref> = FxHashMap::default();
        images.insert(const1.regular(), dst_const1);
        for &latch in &src.latches {
            images.insert(latch, latch_value[&latch]);
        }
        for &pi in &pi_ids {
            let new_pi = dst.create_pi();
            if let Some(name) = src.io_name(pi) {
                let _ = dst.set_io_name(new_pi, format!("{name}_{frame:02}"));
            }
            images.insert(pi, Ref::new(new_pi));
        }

        for &id in &order {
            if id == const1.regular() {
                continue;
            }
            let fanins = src.obj(id).fanins.clone();
            if fanins.len() != 2 {
                continue;
            }
            let c0 = images[&fanins[0].peer.regular()].not_cond(fanins[0].peer.is_complement());
            let c1 = images[&fanins[1].peer.regular()].not_cond(fanins[1].peer.is_complement());
            let combined = dst.aig_and(c0, c1)?;
            images.insert(id, combined);
        }

        for &po in &po_ids {
            let driver = src.obj(po).fanins.first().expect("PO has a driver").peer;
            let img = images[&driver.regular()].not_cond(driver.is_complement());
            let new_po = dst.create_po();
            if let Some(name) = src.io_name(po) {
                let _ = dst.set_io_name(new_po, format!("{name}_{frame:02}"));
            }
            dst.add_fanin(new_po, img);
        }

        for &latch in &src.latches {
            let driver = src.obj(latch).fanins.first().expect("latch has a data input").peer;
            let img = images[&driver.regular()].not_cond(driver.is_complement());
            latch_value.insert(latch, img);
        }
    }

    if initial == InitialValuePolicy::KeepAsLatches {
        for &latch in &src.latches {
            let new_latch = dst_latch_of[&latch];
            dst.add_fanin(new_latch, latch_value[&latch]);
        }
    }

    dst.check()?;
    Ok(dst)
}
