//! Representation conversions (C6): toggling a network between its
//! sequential and combinational views, and between its AIG/SOP/Netlist
//! function representations.

use crate::ir::{FuncKind, LatchInit, Network, NtkKind, ObjData, ObjId, ObjKind, Ref};
use crate::result::{EngineError, EngineResult};
use crate::transforms::strash_copy;
use rustc_hash::FxHashMap;

/// What [`make_comb`] replaced a latch with, so [`make_seq`] can put it
/// back.
#[derive(Clone, Copy, Debug)]
pub struct LatchBackup {
    /// The latch's former object id (dead after `make_comb`; kept only
    /// so its name can be recovered for the restored latch).
    pub latch_id: ObjId,
    pub init: LatchInit,
    /// The PI that took over the latch's former fanout.
    pub pi: ObjId,
    /// The PO that took over the latch's former data input.
    pub po: ObjId,
}

/// Make `ntk` purely combinational in place: every latch is replaced by
/// a matched PI/PO pair, the PI taking over its readers and the PO
/// taking over its driver. Returns the information [`make_seq`] needs to
/// restore the original latches; empty if `ntk` already has none.
pub fn make_comb(ntk: &mut Network) -> EngineResult<Vec<LatchBackup>> {
    let _t = crate::timing::scope("make_comb");
    if ntk.kind != NtkKind::Strash {
        return Err(EngineError::IncompatibleKindFunc {
            kind: ntk.kind,
            func: ntk.func,
        });
    }
    if ntk.latches.is_empty() {
        return Ok(Vec::new());
    }
    warn_self_feeding_latches(ntk);

    let latches = ntk.latches.clone();
    let mut backups = Vec::with_capacity(latches.len());
    for latch in latches {
        let init = match &ntk.obj(latch).data {
            ObjData::LatchInit(i) => *i,
            _ => LatchInit::DontCare,
        };
        let driver = *ntk.obj(latch).fanins.first().expect("latch has a data input");
        let base_name = ntk.io_name(latch).map(str::to_owned);

        let pi = ntk.create_pi();
        if let Some(name) = &base_name {
            let _ = ntk.set_io_name(pi, format!("{name}_pi"));
        }
        ntk.transfer_fanout(latch, Ref::new(pi));

        let po = ntk.create_po();
        if let Some(name) = &base_name {
            let _ = ntk.set_io_name(po, format!("{name}_po"));
        }
        ntk.add_fanin(po, driver.peer);

        ntk.delete_obj(latch);
        ntk.cis.retain(|&id| id != latch);
        ntk.cos.retain(|&id| id != latch);

        backups.push(LatchBackup {
            latch_id: latch,
            init,
            pi,
            po,
        });
    }
    ntk.latches.clear();
    ntk.check()?;
    Ok(backups)
}

/// Undo [`make_comb`], restoring every latch it replaced.
pub fn make_seq(ntk: &mut Network, backups: &[LatchBackup]) -> EngineResult<()> {
    let _t = crate::timing::scope("make_seq");
    if ntk.kind != NtkKind::Strash {
        return Err(EngineError::IncompatibleKindFunc {
            kind: ntk.kind,
            func: ntk.func,
        });
    }
    for backup in backups {
        let new_latch = ntk.create_latch(backup.init);
        if let Some(name) = ntk.io_name(backup.pi) {
            let base = name.strip_suffix("_pi").unwrap_or(name).to_string();
            let _ = ntk.set_io_name(new_latch, base);
        }

        ntk.transfer_fanout(backup.pi, Ref::new(new_latch));
        ntk.delete_obj(backup.pi);
        ntk.cis.retain(|&id| id != backup.pi);

        let driver = *ntk.obj(backup.po).fanins.first().expect("stand-in PO has a driver");
        ntk.add_fanin(new_latch, driver.peer);
        ntk.delete_obj(backup.po);
        ntk.cos.retain(|&id| id != backup.po);
    }
    ntk.check()?;
    Ok(())
}

/// A latch chain feeding only itself (no combinational logic in the
/// loop) is almost certainly a modeling mistake, but not one worth
/// rejecting a network over; it is reported, never an error.
fn warn_self_feeding_latches(ntk: &Network) {
    let count = ntk.latches.iter().filter(|&&l| is_self_feed(ntk, l)).count();
    if count > 0 {
        log::warn!("{count} latch(es) feed only themselves through other latches");
    }
}

fn is_self_feed(ntk: &Network, latch: ObjId) -> bool {
    let mut cur = latch;
    loop {
        let Some(edge) = ntk.obj(cur).fanins.first() else {
            return false;
        };
        let driver = edge.peer.regular();
        if driver == latch {
            return true;
        }
        if ntk.obj(driver).kind != ObjKind::Latch {
            return false;
        }
        cur = driver;
    }
}

/// Convert a structurally-hashed AIG into an equivalent SOP logic
/// network. Every AND node becomes a `"11 1\n"` gate; a complemented
/// fanin not absorbed by a CO-driver edge becomes an explicit `"0 1\n"`
/// inverter (cached per source id so repeated uses share one gate); an
/// AIG choice class becomes an explicit OR gate across its members,
/// each wired through an inverter first if its phase runs inverse to
/// the class representative.
pub fn aig_to_logic_sop(src: &mut Network) -> EngineResult<Network> {
    let _t = crate::timing::scope("aig_to_logic_sop");
    if src.func != FuncKind::Aig {
        return Err(EngineError::TypeMismatch {
            expected: FuncKind::Aig,
            actual: src.func,
        });
    }

    let mut dst = Network::start_from(src, NtkKind::Logic, FuncKind::Sop)?;
    let const1 = src.aig_const1()?.regular();
    let mut inv_cache: FxHashMap<ObjId, ObjId> = FxHashMap::default();
    let order = crate::traversal::dfs(src, true);

    for &id in &order {
        if id == const1 {
            let node = dst.create_node();
            dst.obj_mut(node).data = ObjData::Sop(" 1\n".into());
            src.obj_mut(id).copy = Some(node).into();
            continue;
        }
        let fanins = src.obj(id).fanins.clone();
        if fanins.len() != 2 {
            continue;
        }
        let c0 = sop_image(src, &mut dst, &mut inv_cache, fanins[0].peer)?;
        let c1 = sop_image(src, &mut dst, &mut inv_cache, fanins[1].peer)?;
        let node = dst.create_node();
        dst.obj_mut(node).data = ObjData::Sop("11 1\n".into());
        dst.add_fanin(node, Ref::new(c0));
        dst.add_fanin(node, Ref::new(c1));
        src.obj_mut(id).copy = Some(node).into();
    }

    // Second pass: a choice class becomes an OR across its members, now
    // that every member (wherever it sits in `order`) has its own image.
    for &id in &order {
        let members = src.aig_choice_members(id);
        if members.is_empty() {
            continue;
        }
        let head_img = src.obj(id).copy.expand().expect("head image built above");
        let mut or_inputs = vec![head_img];
        for member in members {
            let phase = src.obj(member).phase;
            or_inputs.push(sop_image(src, &mut dst, &mut inv_cache, Ref::with_polarity(member, phase))?);
        }
        let or_node = dst.create_node();
        dst.obj_mut(or_node).data = ObjData::Sop(or_cube(or_inputs.len()));
        for &input in &or_inputs {
            dst.add_fanin(or_node, Ref::new(input));
        }
        src.obj_mut(id).copy = Some(or_node).into();
    }

    for &latch in &src.latches.clone() {
        let driver = *src.obj(latch).fanins.first().expect("latch has a data input");
        let img = sop_image(src, &mut dst, &mut inv_cache, driver.peer)?;
        let dst_latch = src.obj(latch).copy.expand().expect("latch copy set by start_from");
        dst.add_fanin(dst_latch, Ref::new(img));
    }

    Network::finalize(src, &mut dst);
    dst.check()?;
    Ok(dst)
}

fn sop_image(
    src: &Network,
    dst: &mut Network,
    inv_cache: &mut FxHashMap<ObjId, ObjId>,
    r: Ref,
) -> EngineResult<ObjId> {
    let base = src
        .obj(r.regular())
        .copy
        .expand()
        .expect("fanin visited before its consumer in DFS order");
    if !r.is_complement() {
        return Ok(base);
    }
    if let Some(&inv) = inv_cache.get(&r.regular()) {
        return Ok(inv);
    }
    let inv = dst.create_node();
    dst.obj_mut(inv).data = ObjData::Sop("0 1\n".into());
    dst.add_fanin(inv, Ref::new(base));
    inv_cache.insert(r.regular(), inv);
    Ok(inv)
}

/// An `n`-input SOP OR cube set: one cube per input, `1` at that input's
/// position and `-` elsewhere, output `1`.
fn or_cube(n: usize) -> String {
    let mut s = String::new();
    for i in 0..n {
        for j in 0..n {
            s.push(if i == j { '1' } else { '-' });
        }
        s.push_str(" 1\n");
    }
    s
}

/// Convert an SOP logic network into an explicit netlist: every node and
/// CI gets a named net carrying its output, and every fanin is rewired
/// through that net. A complemented CO-driver edge (legal on SOP logic
/// but not on a netlist's single-driver nets) is materialized as an
/// explicit inverter gate and net.
pub fn logic_sop_to_netlist(src: &mut Network) -> EngineResult<Network> {
    let _t = crate::timing::scope("logic_sop_to_netlist");
    if src.kind != NtkKind::Logic || src.func != FuncKind::Sop {
        return Err(EngineError::TypeMismatch {
            expected: FuncKind::Sop,
            actual: src.func,
        });
    }

    let mut dst = Network::start_from(src, NtkKind::Netlist, FuncKind::Sop)?;
    let mut nets: FxHashMap<ObjId, ObjId> = FxHashMap::default();
    let mut inv_nets: FxHashMap<ObjId, ObjId> = FxHashMap::default();

    for &ci in &src.cis.clone() {
        let dst_ci = src.obj(ci).copy.expand().expect("start_from set every CI's copy");
        let name = src.io_name(ci).map(str::to_owned).unwrap_or_else(|| dst_ci.to_string());
        let net = dst.find_or_create_net(&name);
        dst.add_fanin(net, Ref::new(dst_ci));
        nets.insert(dst_ci, net);
    }

    let mut node_order = Vec::new();
    for id in src.obj_ids().collect::<Vec<_>>() {
        let obj = src.obj(id);
        if obj.kind != ObjKind::Node || (obj.fanins.is_empty() && obj.fanouts.is_empty()) {
            continue;
        }
        let dst_node = dst.create_node();
        dst.obj_mut(dst_node).data = src.obj(id).data.clone();
        src.obj_mut(id).copy = Some(dst_node).into();
        node_order.push(id);
    }

    for &po in &src.cos.clone() {
        if src.obj(po).kind != ObjKind::Po {
            continue;
        }
        let driver = *src.obj(po).fanins.first().expect("PO has a driver");
        let dst_driver = src
            .obj(driver.peer.regular())
            .copy
            .expand()
            .expect("driver processed before its reader");
        let net = net_for(&mut dst, &mut nets, &mut inv_nets, dst_driver, driver.peer.is_complement());
        let new_po = dst.create_po();
        if let Some(name) = src.io_name(po) {
            let _ = dst.set_io_name(new_po, name);
        }
        dst.add_fanin(new_po, Ref::new(net));
    }

    for &latch in &src.latches.clone() {
        let driver = *src.obj(latch).fanins.first().expect("latch has a data input");
        let dst_driver = src
            .obj(driver.peer.regular())
            .copy
            .expand()
            .expect("driver processed before its reader");
        let net = net_for(&mut dst, &mut nets, &mut inv_nets, dst_driver, driver.peer.is_complement());
        let dst_latch = src.obj(latch).copy.expand().expect("latch copy set by start_from");
        dst.add_fanin(dst_latch, Ref::new(net));
    }

    for id in node_order {
        let dst_node = src.obj(id).copy.expand().expect("created above");
        let fanins = src.obj(id).fanins.clone();
        for edge in fanins {
            let dst_driver = src
                .obj(edge.peer.regular())
                .copy
                .expand()
                .expect("driver processed before its reader");
            // Internal SOP fanins never carry a complement bit: only
            // CO-driver edges do, and those are handled above.
            let net = net_for(&mut dst, &mut nets, &mut inv_nets, dst_driver, false);
            dst.add_fanin(dst_node, Ref::new(net));
        }
    }

    dst.check()?;
    Ok(dst)
}

fn net_for(
    dst: &mut Network,
    nets: &mut FxHashMap<ObjId, ObjId>,
    inv_nets: &mut FxHashMap<ObjId, ObjId>,
    dst_driver: ObjId,
    complemented: bool,
) -> ObjId {
    let net = *nets.entry(dst_driver).or_insert_with(|| {
        let n = dst.find_or_create_net(&format!("{dst_driver}_net"));
        dst.add_fanin(n, Ref::new(dst_driver));
        n
    });
    if !complemented {
        return net;
    }
    if let Some(&inv_net) = inv_nets.get(&dst_driver) {
        return inv_net;
    }
    let inv = dst.create_node();
    dst.obj_mut(inv).data = ObjData::Sop("0 1\n".into());
    dst.add_fanin(inv, Ref::new(net));
    let inv_net = dst.find_or_create_net(&format!("{dst_driver}_inv"));
    dst.add_fanin(inv_net, Ref::new(inv));
    inv_nets.insert(dst_driver, inv_net);
    inv_net
}

/// Erase every explicit latch object, folding each one into a latch
/// count on the edge directly connecting its former driver to its
/// former readers, the representation [`crate::transforms::retime_forward`]/
/// [`crate::transforms::retime_backward`] operate on. A chain of
/// latches collapses into a single edge whose count is the chain's
/// length.
pub fn aig_to_seq(src: &mut Network) -> EngineResult<Network> {
    let _t = crate::timing::scope("aig_to_seq");
    if src.func != FuncKind::Aig {
        return Err(EngineError::TypeMismatch {
            expected: FuncKind::Aig,
            actual: src.func,
        });
    }

    let mut dst = Network::alloc(NtkKind::Seq, FuncKind::Aig)?;
    dst.name = format!("{}_seq", src.name);

    for &pi in &src.cis.clone() {
        if src.obj(pi).kind != ObjKind::Pi {
            continue;
        }
        let new_pi = dst.create_pi();
        if let Some(name) = src.io_name(pi) {
            let _ = dst.set_io_name(new_pi, name);
        }
        src.obj_mut(pi).copy = Some(new_pi).into();
    }

    let mut cache: FxHashMap<ObjId, Ref> = FxHashMap::default();
    let const1 = src.aig_const1()?;
    let dst_const1 = dst.aig_const1()?;
    cache.insert(const1.regular(), dst_const1);

    let order = crate::traversal::dfs(src, true);
    for id in order {
        let fanins = src.obj(id).fanins.clone();
        if fanins.len() != 2 {
            continue;
        }
        let (img0, d0) = resolve_through_latches(src, &mut dst, &mut cache, fanins[0].peer)?;
        let (img1, d1) = resolve_through_latches(src, &mut dst, &mut cache, fanins[1].peer)?;
        let combined = dst.aig_and(img0, img1)?;
        dst.set_fanin_latches(combined.regular(), 0, d0);
        dst.set_fanin_latches(combined.regular(), 1, d1);
        cache.insert(id, combined);
    }

    for &po in &src.cos.clone() {
        if src.obj(po).kind != ObjKind::Po {
            continue;
        }
        let driver = src.obj(po).fanins.first().expect("PO has a driver").peer;
        let (img, depth) = resolve_through_latches(src, &mut dst, &mut cache, driver)?;
        let new_po = dst.create_po();
        if let Some(name) = src.io_name(po) {
            let _ = dst.set_io_name(new_po, name);
        }
        dst.add_fanin(new_po, img);
        dst.set_fanin_latches(new_po, 0, depth);
    }

    dst.check()?;
    Ok(dst)
}

/// Walk backward through a chain of latch objects (a register has no
/// function of its own, its output is its input delayed one cycle),
/// returning the eventual combinational driver's destination image and
/// the chain length, which becomes the spliced edge's latch count.
fn resolve_through_latches(
    src: &Network,
    dst: &mut Network,
    cache: &mut FxHashMap<ObjId, Ref>,
    r: Ref,
) -> EngineResult<(Ref, u32)> {
    let mut cur = r;
    let mut depth = 0u32;
    while src.obj(cur.regular()).kind == ObjKind::Latch {
        let fanin = src.obj(cur.regular()).fanins.first().expect("latch has a data input").peer;
        cur = Ref::with_polarity(fanin.regular(), fanin.is_complement() ^ cur.is_complement());
        depth += 1;
    }
    let img = strash_copy(src, dst, cache, cur)?;
    Ok((img, depth))
}

/// The inverse of [`aig_to_seq`]: materialize every edge's latch count
/// back into an explicit chain of (don't-care-initialized) latch
/// objects, in a freshly built `Logic`/`Sop` network.
pub fn seq_to_logic_sop(src: &mut Network) -> EngineResult<Network> {
    let _t = crate::timing::scope("seq_to_logic_sop");
    if src.kind != NtkKind::Seq || src.func != FuncKind::Aig {
        return Err(EngineError::TypeMismatch {
            expected: FuncKind::Aig,
            actual: src.func,
        });
    }

    let mut dst = Network::alloc(NtkKind::Logic, FuncKind::Sop)?;
    dst.name = format!("{}_logic", src.name);

    for &pi in &src.cis.clone() {
        let new_pi = dst.create_pi();
        if let Some(name) = src.io_name(pi) {
            let _ = dst.set_io_name(new_pi, name);
        }
        src.obj_mut(pi).copy = Some(new_pi).into();
    }

    let const1 = src.aig_const1()?.regular();
    let mut node_images: FxHashMap<ObjId, ObjId> = FxHashMap::default();
    for &pi in &src.cis.clone() {
        node_images.insert(pi, src.obj(pi).copy.expand().unwrap());
    }
    let mut splice_cache: FxHashMap<(ObjId, bool, u32), ObjId> = FxHashMap::default();

    let order = crate::traversal::dfs(src, true);
    for id in order {
        if id == const1 {
            let node = dst.create_node();
            dst.obj_mut(node).data = ObjData::Sop(" 1\n".into());
            node_images.insert(id, node);
            continue;
        }
        let fanins = src.obj(id).fanins.clone();
        if fanins.len() != 2 {
            continue;
        }
        let mut children = [ObjId::from_u32(0); 2];
        for (slot, edge) in fanins.iter().enumerate() {
            let producer = node_images[&edge.peer.regular()];
            children[slot] = splice_edge(&mut dst, &mut splice_cache, producer, edge.peer.is_complement(), edge.n_latches);
        }
        let node = dst.create_node();
        dst.obj_mut(node).data = ObjData::Sop("11 1\n".into());
        dst.add_fanin(node, Ref::new(children[0]));
        dst.add_fanin(node, Ref::new(children[1]));
        node_images.insert(id, node);
    }

    for &po in &src.cos.clone() {
        if src.obj(po).kind != ObjKind::Po {
            continue;
        }
        let edge = *src.obj(po).fanins.first().expect("PO has a driver");
        let producer = node_images[&edge.peer.regular()];
        let img = splice_edge(&mut dst, &mut splice_cache, producer, edge.peer.is_complement(), edge.n_latches);
        let new_po = dst.create_po();
        if let Some(name) = src.io_name(po) {
            let _ = dst.set_io_name(new_po, name);
        }
        dst.add_fanin(new_po, Ref::new(img));
    }

    dst.check()?;
    Ok(dst)
}

/// Wire a single fanin edge's worth of inversion and latch chain onto
/// `producer`'s image, sharing the result across edges with an
/// identical `(producer, complement, n_latches)` shape.
fn splice_edge(
    dst: &mut Network,
    cache: &mut FxHashMap<(ObjId, bool, u32), ObjId>,
    producer: ObjId,
    complement: bool,
    n_latches: u32,
) -> ObjId {
    let key = (producer, complement, n_latches);
    if let Some(&cached) = cache.get(&key) {
        return cached;
    }
    let mut cur = producer;
    if complement {
        let inv = dst.create_node();
        dst.obj_mut(inv).data = ObjData::Sop("0 1\n".into());
        dst.add_fanin(inv, Ref::new(cur));
        cur = inv;
    }
    for _ in 0..n_latches {
        let latch = dst.create_latch(LatchInit::DontCare);
        dst.add_fanin(latch, Ref::new(cur));
        cur = latch;
    }
    cache.insert(key, cur);
    cur
}
