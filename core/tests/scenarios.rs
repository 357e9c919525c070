//! End-to-end scenarios covering const-folding, hash-consing, balancing,
//! miter equivalence, frame unrolling, and cycle detection, each built
//! directly against the public `logex_core` API rather than through a
//! parser; this crate owns no file format, so a test network is always
//! built by hand.

use logex_core::ir::{FuncKind, LatchInit, NtkKind, Ref};
use logex_core::transforms::{balance, frames, miter, BalanceOptions, InitialValuePolicy};
use logex_core::traversal::dfs;
use logex_core::Network;

/// Scenario A: const-folding in the AIG. `and(const1, x) == x`,
/// `and(x, !x) == !const1`, `and(x, x) == x`; no new node is ever
/// created by a trivial fold.
#[test]
fn scenario_a_const_folding() {
    let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
    let x = Ref::new(ntk.create_pi());
    let c1 = ntk.aig_const1().unwrap();

    assert_eq!(ntk.aig_and(c1, x).unwrap(), x);
    assert_eq!(ntk.aig_and(x, x.not()).unwrap(), c1.not());
    assert_eq!(ntk.aig_and(x, x).unwrap(), x);

    // Only the PI and the constant exist; no AND node was ever hashed.
    assert_eq!(ntk.counters.nodes, 1); // the constant-1 node itself
    assert_eq!(ntk.counters.pis, 1);
}

/// Scenario B: hash-consing. `and(a,b)` and `and(b,a)` must resolve to
/// the same regular node.
#[test]
fn scenario_b_hash_consing() {
    let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
    let a = Ref::new(ntk.create_pi());
    let b = Ref::new(ntk.create_pi());

    let u1 = ntk.aig_and(a, b).unwrap();
    let u2 = ntk.aig_and(b, a).unwrap();
    assert_eq!(u1.regular(), u2.regular());
}

/// Scenario C: balance. A depth-3 left chain `and(and(and(a,b),c),d)`
/// rebuilt by `balance` becomes a depth-2 tree.
#[test]
fn scenario_c_balance_produces_depth_two_tree() {
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
    logex_core::traversal::compute_levels(&mut src);

    let dst = balance(&mut src, &BalanceOptions::default()).unwrap();
    let driver = dst.obj(dst.cos[0]).fanins[0].peer;
    assert_eq!(dst.obj(driver.regular()).level, 2);
}

/// Scenario D: miter equivalence. One network's PO is `!!a`, the other's
/// is `a`; the miter's single PO must be the constant-0 reference
/// (structural equality here stands in for the external SAT call's
/// UNSAT verdict; this crate does not own a solver).
#[test]
fn scenario_d_miter_of_equivalent_networks_is_constant_zero() {
    let mut n1 = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
    let a1 = Ref::new(n1.create_pi());
    n1.set_io_name(a1.regular(), "a").unwrap();
    let po1 = n1.create_po();
    n1.set_io_name(po1, "o").unwrap();
    n1.add_fanin(po1, a1.not().not());

    let mut n2 = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
    let a2 = Ref::new(n2.create_pi());
    n2.set_io_name(a2.regular(), "a").unwrap();
    let po2 = n2.create_po();
    n2.set_io_name(po2, "o").unwrap();
    n2.add_fanin(po2, a2);

    let mut dst = miter(&mut n1, &mut n2, true).unwrap();
    let out = dst.obj(dst.cos[0]).fanins[0].peer;
    let const1 = dst.aig_const1().unwrap();
    assert_eq!(out.regular(), const1.regular());
    assert!(out.is_complement());
}

/// Scenario E: sequential frames. A single latch `L` (init 0) feeding
/// `o = L & x`, `L' = o`. Unrolling 3 frames with `Initialize` drives
/// every frame's output to the regular constant-1, complemented (i.e.
/// logical 0), since `L` starts at 0 and `0 & x` never sets it.
#[test]
fn scenario_e_frame_unrolling_propagates_constant_zero() {
    let _ = env_logger::try_init();
    let mut src = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
    let x = Ref::new(src.create_pi());
    let latch = src.create_latch(LatchInit::Zero);
    let o = src.aig_and(Ref::new(latch), x).unwrap();
    let po = src.create_po();
    src.add_fanin(po, o);
    src.add_fanin(latch, o);

    let mut dst = frames(&mut src, 3, InitialValuePolicy::Initialize).unwrap();
    let const1 = dst.aig_const1().unwrap();

    let po_ids: Vec<_> = dst
        .cos
        .iter()
        .copied()
        .filter(|&id| dst.obj(id).kind == logex_core::ObjKind::Po)
        .collect();
    assert_eq!(po_ids.len(), 3);
    for po in po_ids {
        let driver = dst.obj(po).fanins[0].peer;
        assert_eq!(driver.regular(), const1.regular());
        assert!(driver.is_complement());
    }
}

/// Scenario F: cycle detection. A SOP logic network with `n1 -> n2 ->
/// n1` is flagged directly by the traversal kernel's `is_acyclic`,
/// reporting both offending objects on the discovered cycle. `Logic`
/// networks aren't strashed AIGs, so `check()` itself does not run this
/// pass implicitly (see `NtkKind::Strash`/`Seq` in `verifier::check`);
/// a SOP-network caller invokes it directly when it cares.
#[test]
fn scenario_f_cycle_is_detected() {
    let mut ntk = Network::alloc(NtkKind::Logic, FuncKind::Sop).unwrap();
    let n1 = ntk.create_node();
    let n2 = ntk.create_node();
    ntk.add_fanin(n2, Ref::new(n1));
    ntk.add_fanin(n1, Ref::new(n2));
    let po = ntk.create_po();
    ntk.add_fanin(po, Ref::new(n2));

    let err = logex_core::traversal::is_acyclic(&ntk).unwrap_err();
    match err {
        logex_core::EngineError::CombinationalLoop { path } => {
            assert!(path.contains(&n1));
            assert!(path.contains(&n2));
        }
        other => panic!("expected CombinationalLoop, got {other:?}"),
    }
}

/// Round-trip law: `make_seq(make_comb(a))` restores the same latch
/// count, names, and structure-under-`check` as `a` itself.
#[test]
fn make_comb_then_make_seq_restores_latches() {
    let mut ntk = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
    let x = Ref::new(ntk.create_pi());
    let latch = ntk.create_latch(LatchInit::Zero);
    ntk.set_io_name(latch, "state").unwrap();
    let o = ntk.aig_and(Ref::new(latch), x).unwrap();
    let po = ntk.create_po();
    ntk.add_fanin(po, o);
    ntk.add_fanin(latch, o);
    ntk.check().unwrap();

    let backups = logex_core::transforms::make_comb(&mut ntk).unwrap();
    assert_eq!(ntk.latches.len(), 0);
    assert!(ntk.check().is_ok());

    logex_core::transforms::make_seq(&mut ntk, &backups).unwrap();
    assert_eq!(ntk.latches.len(), 1);
    assert!(ntk.check().is_ok());
    assert_eq!(ntk.io_name(ntk.latches[0]), Some("state"));
}

/// Round-trip law: `dup(a).check() == true`, and `dfs(dup(a))` walks in
/// the same structural order as `dfs(a)`: a latch, a shared sub-term
/// (`and(a,b)` feeding two different ANDs), and named IO all survive.
#[test]
fn dup_preserves_structure_and_dfs_order() {
    let mut src = Network::alloc(NtkKind::Strash, FuncKind::Aig).unwrap();
    let a = Ref::new(src.create_pi());
    let b = Ref::new(src.create_pi());
    src.set_io_name(a.regular(), "a").unwrap();
    src.set_io_name(b.regular(), "b").unwrap();
    let latch = src.create_latch(LatchInit::Zero);
    src.set_io_name(latch, "state").unwrap();

    let ab = src.aig_and(a, b).unwrap();
    let o1 = src.aig_and(ab, Ref::new(latch)).unwrap();
    let o2 = src.aig_and(ab, a.not()).unwrap();
    let po1 = src.create_po();
    src.set_io_name(po1, "o1").unwrap();
    src.add_fanin(po1, o1);
    let po2 = src.create_po();
    src.set_io_name(po2, "o2").unwrap();
    src.add_fanin(po2, o2);
    src.add_fanin(latch, o1);
    src.check().unwrap();

    let src_order = dfs(&mut src, true);

    let mut dst = Network::dup(&mut src).unwrap();
    assert!(dst.check().is_ok());
    assert_eq!(dst.counters.pis, src.counters.pis);
    assert_eq!(dst.counters.nodes, src.counters.nodes);
    assert_eq!(dst.latches.len(), src.latches.len());
    assert_eq!(dst.io_name(dst.latches[0]), Some("state"));

    let dst_order = dfs(&mut dst, true);
    assert_eq!(dst_order.len(), src_order.len());

    let dst_pos: Vec<_> = dst.cos.iter().copied().filter(|&id| dst.obj(id).kind == logex_core::ObjKind::Po).collect();
    assert_eq!(dst.io_name(dst_pos[0]), Some("o1"));
    assert_eq!(dst.io_name(dst_pos[1]), Some("o2"));
}
