//! The network container (C2): owns all objects, tracks CIs/COs/latches,
//! name tables, per-kind live counts, and the per-network traversal-id
//! counter.

use crate::aig::AigManager;
use crate::ir::edge::{FaninEdge, FanoutEdge};
use crate::ir::object::{BddHandle, GateHandle, LatchInit, Marks, ObjData, ObjKind};
use crate::ir::{Obj, ObjId, Ref};
use crate::result::{EngineError, EngineResult};
use logex_entity::{PrimaryMap, SecondaryMap};
use rustc_hash::FxHashMap;

/// The structural kind of a network: what its objects may represent.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum NtkKind {
    /// Explicit nets wiring nodes together.
    Netlist,
    /// Logic nodes with no explicit net objects.
    Logic,
    /// A structurally-hashed AIG; always paired with `FuncKind::Aig`.
    Strash,
    /// A sequential structurally-hashed AIG; always paired with
    /// `FuncKind::Aig`.
    Seq,
}

/// The function representation an object's `data` slot holds, network-wide.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FuncKind {
    None,
    Sop,
    Bdd,
    Aig,
    Map,
}

/// Returns whether `(kind, func)` is one of the legal pairs the network
/// container accepts.
fn kind_func_compatible(kind: NtkKind, func: FuncKind) -> bool {
    matches!(
        (kind, func),
        (NtkKind::Netlist, FuncKind::Sop)
            | (NtkKind::Netlist, FuncKind::Map)
            | (NtkKind::Logic, FuncKind::Sop)
            | (NtkKind::Logic, FuncKind::Bdd)
            | (NtkKind::Logic, FuncKind::Map)
            | (NtkKind::Strash, FuncKind::Aig)
            | (NtkKind::Seq, FuncKind::Aig)
    )
}

/// Per-kind live-object counts, maintained incrementally rather than
/// recomputed by scanning `objs` (mirrors `Abc_Ntk_t_`'s `nObjs`/`nNets`/
/// `nNodes`/`nLatches`/`nPis`/`nPos` fields).
#[derive(Default, Clone, Debug)]
pub struct ObjCounters {
    pub objs: u32,
    pub nets: u32,
    pub nodes: u32,
    pub latches: u32,
    pub pis: u32,
    pub pos: u32,
}

impl ObjCounters {
    fn bump(&mut self, kind: ObjKind, delta: i32) {
        let field = match kind {
            ObjKind::Net => &mut self.nets,
            ObjKind::Node => &mut self.nodes,
            ObjKind::Latch => &mut self.latches,
            ObjKind::Pi => &mut self.pis,
            ObjKind::Po => &mut self.pos,
        };
        *field = (*field as i32 + delta) as u32;
        self.objs = (self.objs as i32 + delta) as u32;
    }
}

/// The function-manager handle stored on a network, selected by `func`.
/// The BDD and technology-mapped-gate managers live outside this crate;
/// only their opaque handles are kept here. The AIG manager (C4) is the
/// one piece of function-representation machinery this crate actually
/// implements.
pub enum FuncManager {
    None,
    /// An external SOP/cover arena. Presence is a marker; the cubes
    /// themselves live in each node's `ObjData::Sop`.
    Sop,
    /// An external BDD manager handle.
    Bdd(Option<BddHandle>),
    /// The structural-hash AIG engine.
    Aig(AigManager),
    /// An external technology-mapping handle.
    Map(Option<GateHandle>),
}

/// A multi-level Boolean network.
pub struct Network {
    pub kind: NtkKind,
    pub func: FuncKind,
    pub name: String,
    pub spec: String,
    objs: PrimaryMap<ObjId, Obj>,
    /// Parallel to `objs`: whether each slot currently holds a live object.
    /// Checked on every `obj_ids()` filter, so kept as a flat `Vec<bool>`
    /// rather than scanning `free_slots` (the freelist itself is a stack,
    /// not a membership-testable set).
    live: Vec<bool>,
    free_slots: Vec<ObjId>,
    pub cis: Vec<ObjId>,
    pub cos: Vec<ObjId>,
    pub latches: Vec<ObjId>,
    pub counters: ObjCounters,
    pub func_manager: FuncManager,
    pub exdc: Option<Box<Network>>,
    pub trav_ids: u64,
    net_names: FxHashMap<String, ObjId>,
    io_names: SecondaryMap<ObjId, Option<String>>,
    pub prev_backup: Option<Box<Network>>,
    pub backup_generation: u64,
}

impl Network {
    /// Allocate a new, empty network. Fails if `(kind, func)` is not a
    /// legal pair.
    pub fn alloc(kind: NtkKind, func: FuncKind) -> EngineResult<Self> {
        if !kind_func_compatible(kind, func) {
            return Err(EngineError::IncompatibleKindFunc { kind, func });
        }
        let func_manager = match func {
            FuncKind::None => FuncManager::None,
            FuncKind::Sop => FuncManager::Sop,
            FuncKind::Bdd => FuncManager::Bdd(None),
            FuncKind::Aig => FuncManager::Aig(AigManager::new()),
            FuncKind::Map => FuncManager::Map(None),
        };
        Ok(Self {
            kind,
            func,
            name: String::new(),
            spec: String::new(),
            objs: PrimaryMap::new(),
            live: Vec::new(),
            free_slots: Vec::new(),
            cis: Vec::new(),
            cos: Vec::new(),
            latches: Vec::new(),
            counters: ObjCounters::default(),
            func_manager,
            exdc: None,
            trav_ids: 0,
            net_names: FxHashMap::default(),
            io_names: SecondaryMap::new(),
            prev_backup: None,
            backup_generation: 0,
        })
    }

    // -- object access ----------------------------------------------------

    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id]
    }

    pub fn obj_mut(&mut self, id: ObjId) -> &mut Obj {
        &mut self.objs[id]
    }

    pub fn num_objs(&self) -> usize {
        self.objs.len()
    }

    /// Iterate every live object id in arena order (dead slots excluded).
    pub fn obj_ids(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.objs.keys().filter(move |&id| !self.is_recycled(id))
    }

    pub(crate) fn is_recycled(&self, id: ObjId) -> bool {
        !self.live[id.as_u32() as usize]
    }

    // -- allocation (C1/C2) ------------------------------------------------

    /// Hand out a slot for `kind`: reuse the most recently freed one if the
    /// arena has one. Only grows the underlying arena when no freed slot
    /// is available.
    fn alloc_obj(&mut self, kind: ObjKind) -> ObjId {
        let id = if let Some(id) = self.free_slots.pop() {
            self.objs[id] = Obj::new(kind, id);
            self.live[id.as_u32() as usize] = true;
            id
        } else {
            let id = self.objs.push(Obj::new(kind, ObjId::from_u32(0)));
            self.objs[id].id = id;
            self.live.push(true);
            id
        };
        self.counters.bump(kind, 1);
        id
    }

    /// Create a primary input, registering it as a CI.
    pub fn create_pi(&mut self) -> ObjId {
        let id = self.alloc_obj(ObjKind::Pi);
        self.cis.push(id);
        id
    }

    /// Create a primary output, registering it as a CO. Its driver must
    /// still be attached with [`Network::add_fanin`].
    pub fn create_po(&mut self) -> ObjId {
        let id = self.alloc_obj(ObjKind::Po);
        self.cos.push(id);
        id
    }

    /// Create a latch with the given initial value, registering it in
    /// both CIs (as output) and COs (as input).
    pub fn create_latch(&mut self, init: LatchInit) -> ObjId {
        let id = self.alloc_obj(ObjKind::Latch);
        self.objs[id].data = ObjData::LatchInit(init);
        self.cis.push(id);
        self.cos.push(id);
        self.latches.push(id);
        id
    }

    /// Create an internal combinational node (an AIG AND, a logic-SOP
    /// gate, or a mapped gate, depending on the network's `func`).
    pub fn create_node(&mut self) -> ObjId {
        self.alloc_obj(ObjKind::Node)
    }

    /// Find the net named `name`, creating it (as a fanoutless, faninless
    /// `Net` object) if it does not already exist. `Netlist`-only.
    pub fn find_or_create_net(&mut self, name: &str) -> ObjId {
        if let Some(&id) = self.net_names.get(name) {
            return id;
        }
        let id = self.alloc_obj(ObjKind::Net);
        self.net_names.insert(name.to_string(), id);
        id
    }

    pub fn find_node(&self, name: &str) -> Option<ObjId> {
        self.net_names.get(name).copied()
    }

    /// Look up a primary input/output/latch by its registered name.
    pub fn find_ci_or_co(&self, name: &str) -> Option<ObjId> {
        self.cis
            .iter()
            .chain(self.cos.iter())
            .copied()
            .find(|&id| self.io_names.get(id).and_then(|n| n.as_deref()) == Some(name))
    }

    /// Assign a display name to a CI/CO object, failing on collision with
    /// an existing primary-IO name.
    pub fn set_io_name(&mut self, id: ObjId, name: impl Into<String>) -> EngineResult<()> {
        let name = name.into();
        if self.find_ci_or_co(&name).is_some() {
            return Err(EngineError::NameClash { name });
        }
        self.io_names[id] = Some(name);
        Ok(())
    }

    pub fn io_name(&self, id: ObjId) -> Option<&str> {
        self.io_names.get(id).and_then(|n| n.as_deref())
    }

    // -- fanin/fanout graph & complement-edge algebra (C3) -----------------

    /// Append a fanin edge to `peer`'s reference onto `obj`, and the
    /// mirrored fanout edge onto `peer.regular()`.
    pub fn add_fanin(&mut self, obj: ObjId, peer: Ref) {
        let slot = self.objs[obj].fanins.len();
        self.objs[obj].fanins.push(FaninEdge::new(peer));
        self.objs[peer.regular()]
            .fanouts
            .push(FanoutEdge { user: obj, slot });
    }

    /// Remove the fanin edge on `obj` pointing at `peer`, and the mirrored
    /// fanout edge, keeping both sides' slot bookkeeping consistent.
    pub fn delete_fanin(&mut self, obj: ObjId, peer: ObjId) {
        let Some(idx) = self.objs[obj]
            .fanins
            .iter()
            .position(|e| e.peer.regular() == peer)
        else {
            return;
        };
        self.remove_fanout_entry(peer, obj, idx);
        self.objs[obj].fanins.remove(idx);
        self.renumber_fanout_slots_after_removal(obj, idx);
    }

    /// Replace a single fanin edge's peer in place, preserving its slot
    /// position. Used by [`crate::aig::AigManager::replace`].
    pub fn patch_fanin(&mut self, obj: ObjId, old: ObjId, new: Ref) {
        let Some(idx) = self.objs[obj]
            .fanins
            .iter()
            .position(|e| e.peer.regular() == old)
        else {
            return;
        };
        let old_compl = self.objs[obj].fanins[idx].peer.is_complement();
        let corrected = Ref::with_polarity(new.regular(), old_compl ^ new.is_complement());
        self.remove_fanout_entry(old, obj, idx);
        self.objs[obj].fanins[idx].peer = corrected;
        self.objs[new.regular()]
            .fanouts
            .push(FanoutEdge { user: obj, slot: idx });
    }

    /// Move every incoming edge of `from` onto `to`, preserving each
    /// edge's own complement bit composed against `to`'s polarity. After
    /// this call `from` has no fanout.
    pub fn transfer_fanout(&mut self, from: ObjId, to: Ref) {
        let fanouts = std::mem::take(&mut self.objs[from].fanouts);
        for fo in fanouts {
            let old_compl = self.objs[fo.user].fanins[fo.slot].peer.is_complement();
            let corrected = Ref::with_polarity(to.regular(), old_compl ^ to.is_complement());
            self.objs[fo.user].fanins[fo.slot].peer = corrected;
            self.objs[to.regular()]
                .fanouts
                .push(FanoutEdge { user: fo.user, slot: fo.slot });
        }
    }

    /// Swap fanin slots `i` and `j` of `obj`, fixing the corresponding
    /// fanout entries on both peers. Used by the AIG engine to restore
    /// canonical (smaller-regular-id-first) fanin order after an
    /// in-place patch moves a peer to a new id.
    pub(crate) fn swap_fanins(&mut self, obj: ObjId, i: usize, j: usize) {
        if i == j {
            return;
        }
        let peer_i = self.objs[obj].fanins[i].peer.regular();
        let peer_j = self.objs[obj].fanins[j].peer.regular();
        self.objs[obj].fanins.swap(i, j);
        if let Some(e) = self.objs[peer_i]
            .fanouts
            .iter_mut()
            .find(|e| e.user == obj && e.slot == i)
        {
            e.slot = j;
        }
        if let Some(e) = self.objs[peer_j]
            .fanouts
            .iter_mut()
            .find(|e| e.user == obj && e.slot == j)
        {
            e.slot = i;
        }
    }

    fn remove_fanout_entry(&mut self, peer: ObjId, user: ObjId, slot: usize) {
        if let Some(pos) = self.objs[peer]
            .fanouts
            .iter()
            .position(|e| e.user == user && e.slot == slot)
        {
            self.objs[peer].fanouts.swap_remove(pos);
        }
    }

    /// After removing fanin slot `removed_idx` from `obj`, every
    /// remaining fanin at a higher index shifted down by one; fix up the
    /// corresponding entries in each peer's fanout list.
    fn renumber_fanout_slots_after_removal(&mut self, obj: ObjId, removed_idx: usize) {
        for idx in removed_idx..self.objs[obj].fanins.len() {
            let peer = self.objs[obj].fanins[idx].peer.regular();
            if let Some(entry) = self.objs[peer]
                .fanouts
                .iter_mut()
                .find(|e| e.user == obj && e.slot == idx + 1)
            {
                entry.slot = idx;
            }
        }
    }

    /// Generic (non-AIG) replace: transfer every fanout of `old` onto
    /// `new`, then recursively delete `old` and any fanin that becomes
    /// orphaned (zero fanout, not a CI/PI/constant). AIG networks use
    /// [`crate::aig::AigManager::replace`] instead, which layers
    /// re-hashing of now-identical fanouts on top of this.
    pub fn replace(&mut self, old: ObjId, new: Ref) {
        self.transfer_fanout(old, new);
        self.delete_cascade(old);
    }

    fn delete_cascade(&mut self, start: ObjId) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !self.objs[id].fanouts.is_empty() {
                continue;
            }
            if self.objs[id].is_ci() || self.is_recycled(id) {
                continue;
            }
            let fanin_peers: Vec<ObjId> =
                self.objs[id].fanins.iter().map(|e| e.peer.regular()).collect();
            self.delete_obj(id);
            stack.extend(fanin_peers);
        }
    }

    /// Detach `obj` from every fanin peer's fanout list and every fanout
    /// user's fanin list, then recycle its slot. The caller is
    /// responsible for ensuring `obj` has no remaining fanouts if it
    /// wants a "dangling-free" network; bulk teardown does not require
    /// that.
    pub fn delete_obj(&mut self, obj: ObjId) {
        let fanin_peers: Vec<ObjId> =
            self.objs[obj].fanins.iter().map(|e| e.peer.regular()).collect();
        for peer in fanin_peers {
            self.objs[peer].fanouts.retain(|e| e.user != obj);
        }
        let fanout_users: Vec<ObjId> = self.objs[obj].fanouts.iter().map(|e| e.user).collect();
        for user in fanout_users {
            self.objs[user].fanins.retain(|e| e.peer.regular() != obj);
        }
        let kind = self.objs[obj].kind;
        self.objs[obj] = Obj::new(kind, obj);
        self.live[obj.as_u32() as usize] = false;
        self.counters.bump(kind, -1);
        self.free_slots.push(obj);
    }

    // -- per-edge latch count (sequential AIG, C3) -------------------------
    //
    // The fanout side does not duplicate this count (see `FanoutEdge`'s
    // doc comment), so a "fanout latch count" query is just the matching
    // fanin entry read through the user's own fanin list.

    pub fn fanin_latches(&self, obj: ObjId, idx: usize) -> u32 {
        self.objs[obj].fanins[idx].n_latches
    }

    pub fn set_fanin_latches(&mut self, obj: ObjId, idx: usize, n: u32) {
        self.objs[obj].fanins[idx].n_latches = n;
    }

    pub fn add_fanin_latches(&mut self, obj: ObjId, idx: usize, delta: i32) {
        let cur = self.objs[obj].fanins[idx].n_latches as i32;
        self.objs[obj].fanins[idx].n_latches = (cur + delta).max(0) as u32;
    }

    /// The minimum per-edge latch count across every fanin of `obj`;
    /// `0` for a fanin-less node.
    pub fn fanin_latches_min(&self, obj: ObjId) -> u32 {
        self.objs[obj]
            .fanins
            .iter()
            .map(|e| e.n_latches)
            .min()
            .unwrap_or(0)
    }

    /// The per-edge latch count of the fanout edge from `obj` to
    /// `user`'s fanin slot `slot`.
    pub fn fanout_latches(&self, user: ObjId, slot: usize) -> u32 {
        self.objs[user].fanins[slot].n_latches
    }

    pub fn add_fanout_latches(&mut self, user: ObjId, slot: usize, delta: i32) {
        self.add_fanin_latches(user, slot, delta);
    }

    /// The minimum per-edge latch count across every fanout of `obj`;
    /// `0` for a fanout-less node.
    pub fn fanout_latches_min(&self, obj: ObjId) -> u32 {
        self.objs[obj]
            .fanouts
            .iter()
            .map(|fo| self.objs[fo.user].fanins[fo.slot].n_latches)
            .min()
            .unwrap_or(0)
    }

    // -- traversal-id counter ------------------------------------------------

    /// Bump the traversal-id counter, returning the new value. Every
    /// recursive walker marks `obj.trav_id = current` on first visit.
    pub fn increment_trav_id(&mut self) -> u64 {
        self.trav_ids += 1;
        self.trav_ids
    }

    pub fn is_trav_current(&self, id: ObjId) -> bool {
        self.objs[id].trav_id == self.trav_ids
    }

    pub fn mark_trav_current(&mut self, id: ObjId) {
        let t = self.trav_ids;
        self.objs[id].trav_id = t;
    }

    // -- C2 transform scaffolding ------------------------------------------

    /// Allocate a fresh `(kind, func)` network, prepopulating its CIs and
    /// latches by duplicating those of `src`, and pointing every
    /// duplicated `src` object's `copy` at its image in the new network.
    /// The first step of every transform in [`crate::transforms`].
    pub fn start_from(src: &mut Network, kind: NtkKind, func: FuncKind) -> EngineResult<Network> {
        let mut dst = Network::alloc(kind, func)?;
        dst.name = src.name.clone();
        dst.spec = src.spec.clone();

        for &ci in &src.cis.clone() {
            let new_id = match src.obj(ci).kind {
                ObjKind::Pi => dst.create_pi(),
                ObjKind::Latch => {
                    let init = match &src.obj(ci).data {
                        ObjData::LatchInit(i) => *i,
                        _ => LatchInit::DontCare,
                    };
                    dst.create_latch(init)
                }
                _ => unreachable!("CIs are only PIs or latches"),
            };
            if let Some(name) = src.io_name(ci) {
                let _ = dst.set_io_name(new_id, name);
            }
            src.obj_mut(ci).copy = Some(new_id).into();
        }
        Ok(dst)
    }

    /// Connect every CO of `dst` to `src.co.driver.copy`, preserving the
    /// driver's complement. Run after the transform has strashed/built
    /// `dst`'s internal logic and populated every source object's `copy`.
    pub fn finalize(src: &Network, dst: &mut Network) {
        for &co in &src.cos {
            if src.obj(co).kind == ObjKind::Latch {
                // Latches are already both CIs and COs of `dst`; their
                // input edge is wired by the transform itself (it knows
                // the new driver), not generically here.
                continue;
            }
            let new_po = dst.create_po();
            if let Some(name) = src.io_name(co) {
                let _ = dst.set_io_name(new_po, name);
            }
            let driver_edge = src.obj(co).fanins.first().expect("CO has a driver");
            let driver_copy = src
                .obj(driver_edge.peer.regular())
                .copy
                .expand()
                .expect("driver was visited before finalize");
            dst.add_fanin(new_po, Ref::with_polarity(driver_copy, driver_edge.peer.is_complement()));
        }
    }

    /// Duplicate `src` into a fresh network of the same `(kind, func)`,
    /// preserving every object, fanin (with complement and per-edge latch
    /// count), and name. Internal AIG nodes are rebuilt one at a time in
    /// `src`'s own `dfs` order, so `dfs(dup(src))` walks in exactly the
    /// same structural order as `dfs(src)` itself.
    pub fn dup(src: &mut Network) -> EngineResult<Network> {
        let _t = crate::timing::scope("dup");
        let mut dst = Network::start_from(src, src.kind, src.func)?;

        if src.func == FuncKind::Aig {
            let const1 = src.aig_const1()?;
            let dst_const1 = dst.aig_const1()?;
            src.obj_mut(const1.regular()).copy = Some(dst_const1.regular()).into();

            let order = crate::traversal::dfs(src, true);
            for id in order {
                if id == const1.regular() {
                    continue;
                }
                let fanins = src.obj(id).fanins.clone();
                if fanins.len() != 2 {
                    continue;
                }
                let c0 = Network::copy_ref(src, fanins[0].peer);
                let c1 = Network::copy_ref(src, fanins[1].peer);
                let combined = dst.aig_and(c0, c1)?;
                if src.kind == NtkKind::Seq {
                    dst.set_fanin_latches(combined.regular(), 0, fanins[0].n_latches);
                    dst.set_fanin_latches(combined.regular(), 1, fanins[1].n_latches);
                }
                src.obj_mut(id).copy = Some(combined.regular()).into();
            }
        } else {
            // Net/Node objects carry no hash-consing of their own: copy
            // every one of them first (so every producer has a `copy`
            // before it's needed), then wire fanins in a second pass.
            let ids: Vec<ObjId> = src
                .obj_ids()
                .filter(|&id| matches!(src.obj(id).kind, ObjKind::Net | ObjKind::Node))
                .collect();
            for &id in &ids {
                let new_id = match src.obj(id).kind {
                    ObjKind::Net => {
                        let name = src
                            .net_names
                            .iter()
                            .find(|&(_, &v)| v == id)
                            .map(|(k, _)| k.clone())
                            .unwrap_or_else(|| format!("n{}", id.as_u32()));
                        dst.find_or_create_net(&name)
                    }
                    ObjKind::Node => dst.create_node(),
                    _ => unreachable!("filtered to Net and Node above"),
                };
                dst.obj_mut(new_id).data = src.obj(id).data.clone();
                src.obj_mut(id).copy = Some(new_id).into();
            }
            for &id in &ids {
                let fanins = src.obj(id).fanins.clone();
                let new_id = src.obj(id).copy.expand().expect("copy set above");
                for edge in &fanins {
                    let peer_copy = Network::copy_ref(src, edge.peer);
                    dst.add_fanin(new_id, peer_copy);
                }
            }
        }

        // Explicit latch objects (Strash/Logic/Netlist networks, as
        // opposed to `NtkKind::Seq`'s edge-latch-count representation)
        // are already both CIs and COs of `dst`; `finalize` skips their
        // data-input wiring on purpose, so it's done here instead.
        for &latch in &src.latches.clone() {
            let driver = *src.obj(latch).fanins.first().expect("latch has a data input");
            let dst_latch = src.obj(latch).copy.expand().expect("start_from copied every latch");
            let peer_copy = Network::copy_ref(src, driver.peer);
            dst.add_fanin(dst_latch, peer_copy);
        }

        Network::finalize(src, &mut dst);

        if src.kind == NtkKind::Seq {
            // `finalize` wires PO drivers but not their per-edge latch
            // counts; patch those in, matching POs up positionally since
            // `finalize` creates them in the same order it iterates
            // `src.cos`.
            let src_pos: Vec<ObjId> = src.cos.iter().copied().filter(|&id| src.obj(id).kind == ObjKind::Po).collect();
            let dst_pos: Vec<ObjId> = dst.cos.iter().copied().filter(|&id| dst.obj(id).kind == ObjKind::Po).collect();
            for (&sp, &dp) in src_pos.iter().zip(dst_pos.iter()) {
                let n = src.obj(sp).fanins.first().expect("PO has a driver").n_latches;
                dst.set_fanin_latches(dp, 0, n);
            }
        }

        dst.check()?;
        Ok(dst)
    }

    /// Resolve `r`'s regular endpoint to its already-populated `copy`,
    /// reapplying `r`'s own complement on top. Shared by `dup`'s AIG and
    /// generic (Net/Node) copy passes.
    fn copy_ref(src: &Network, r: Ref) -> Ref {
        let copy = src
            .obj(r.regular())
            .copy
            .expand()
            .expect("producer was visited before its consumer");
        Ref::with_polarity(copy, r.is_complement())
    }

    /// Validate every structural invariant of this network. Never mutates.
    pub fn check(&self) -> EngineResult<()> {
        crate::verifier::check(self)
    }

    // -- AIG engine access (C4) --------------------------------------------
    //
    // The AIG manager lives inside `func_manager` rather than being passed
    // around separately, so every op here must borrow `self` and the
    // manager simultaneously. `with_aig` lends the manager out by swapping
    // it for `FuncManager::None`, invokes the closure with both halves as
    // independent `&mut` borrows, then restores it: an ordinary
    // take-then-restore dance, not a borrow-checker workaround specific to
    // this crate.

    fn with_aig<T>(
        &mut self,
        f: impl FnOnce(&mut AigManager, &mut Network) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut mgr = match std::mem::replace(&mut self.func_manager, FuncManager::None) {
            FuncManager::Aig(mgr) => mgr,
            other => {
                let actual = self.func;
                self.func_manager = other;
                return Err(EngineError::TypeMismatch {
                    expected: FuncKind::Aig,
                    actual,
                });
            }
        };
        let result = f(&mut mgr, self);
        self.func_manager = FuncManager::Aig(mgr);
        result
    }

    pub fn aig_const1(&mut self) -> EngineResult<Ref> {
        self.with_aig(|aig, ntk| Ok(aig.const1(ntk)))
    }

    pub fn aig_and(&mut self, p0: Ref, p1: Ref) -> EngineResult<Ref> {
        self.with_aig(|aig, ntk| Ok(aig.and(ntk, p0, p1)))
    }

    pub fn aig_or(&mut self, p0: Ref, p1: Ref) -> EngineResult<Ref> {
        self.with_aig(|aig, ntk| Ok(aig.or(ntk, p0, p1)))
    }

    pub fn aig_xor(&mut self, p0: Ref, p1: Ref) -> EngineResult<Ref> {
        self.with_aig(|aig, ntk| Ok(aig.xor(ntk, p0, p1)))
    }

    pub fn aig_miter_signal(&mut self, pairs: &[(Ref, Ref)]) -> EngineResult<Ref> {
        self.with_aig(|aig, ntk| Ok(aig.miter(ntk, pairs)))
    }

    pub fn aig_replace(&mut self, old: ObjId, new: Ref) -> EngineResult<()> {
        self.with_aig(|aig, ntk| {
            aig.replace(ntk, old, new);
            Ok(())
        })
    }

    pub fn aig_cleanup(&mut self) -> EngineResult<usize> {
        self.with_aig(|aig, ntk| Ok(aig.cleanup(ntk)))
    }

    pub fn aig_create_choice(
        &mut self,
        head: ObjId,
        member: ObjId,
        inverse_of_head: bool,
    ) -> EngineResult<()> {
        self.with_aig(|aig, ntk| {
            aig.create_choice(ntk, head, member, inverse_of_head);
            Ok(())
        })
    }

    pub fn aig_choice_members(&self, head: ObjId) -> Vec<ObjId> {
        match &self.func_manager {
            FuncManager::Aig(aig) => aig.choice_members(self, head),
            _ => Vec::new(),
        }
    }
}
