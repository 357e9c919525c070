//! The object: net, node, latch, PI, or PO.

use crate::ir::edge::{FaninEdge, FanoutEdge};
use crate::ir::ObjId;
use logex_entity::PackedOption;
use smallvec::SmallVec;

/// The semantic kind of an object.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ObjKind {
    /// A net in a `Netlist` network: a named wire with no function of its
    /// own, just a single driver and any number of readers.
    Net,
    /// A combinational node: an AIG AND, a logic-SOP gate, or a
    /// technology-mapped gate, depending on the owning network's `func`.
    Node,
    /// A latch. Appears in the owner's CIs (as its output) and COs (as its
    /// input); `fanin[0]` is the latch's data input, `fanout[0]` reaches
    /// every reader of the latch's current state.
    Latch,
    /// A primary input.
    Pi,
    /// A primary output. `fanin[0]` is its (only) driver.
    Po,
}

/// Tri-state initial value of a latch.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum LatchInit {
    Zero,
    One,
    DontCare,
}

/// Opaque handle into an external BDD manager. The manager itself is out
/// of scope for this crate; only the handle is stored here.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BddHandle(pub u32);

/// Opaque handle into an external technology-mapping gate library.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct GateHandle(pub u32);

/// The function-kind-specific payload of an object's `data` slot.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ObjData {
    /// No function payload (nets, PIs, POs, and Strash/Seq latches carry
    /// none beyond what the edges already encode).
    None,
    /// A sum-of-products cube string (Logic/Netlist, `Sop` func).
    Sop(String),
    /// A handle into an external BDD manager (Logic, `Bdd` func).
    Bdd(BddHandle),
    /// A handle into an external technology-mapped gate library (`Map`
    /// func).
    Gate(GateHandle),
    /// AIG choice-class link: `Some(next)` if this node has another class
    /// member, `None` at the end of the chain. Absent (`None` variant of
    /// `ObjData`, not to be confused with this field) on non-choice nodes.
    ChoiceNext(Option<ObjId>),
    /// A latch's initial value.
    LatchInit(LatchInit),
}

/// Single-bit scratch marks, cleared-on-exit by contract.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct Marks {
    pub a: bool,
    pub b: bool,
    pub c: bool,
}

/// One structural entity owned by a [`crate::ir::Network`].
#[derive(Clone, Debug)]
pub struct Obj {
    pub kind: ObjKind,
    pub id: ObjId,
    /// Longest path from the CIs: 0 for CIs and the AIG constant, else
    /// `1 + max(fanin levels)`.
    pub level: u32,
    pub marks: Marks,
    /// For an AIG choice-class member, whether its output is equivalent
    /// (false) or inverse-equivalent (true) to the class representative.
    pub phase: bool,
    pub trav_id: u64,
    /// Set if this AIG node is the recognized apex of an EXOR.
    pub f_exor: bool,
    pub fanins: SmallVec<[FaninEdge; 2]>,
    pub fanouts: Vec<FanoutEdge>,
    pub data: ObjData,
    /// Scratch link to this object's image in a network under
    /// construction by a transform. Contractually cleared by the
    /// transform before it returns (the transform owns the clear, not the
    /// object).
    pub copy: PackedOption<ObjId>,
}

impl Obj {
    pub fn new(kind: ObjKind, id: ObjId) -> Self {
        Self {
            kind,
            id,
            level: 0,
            marks: Marks::default(),
            phase: false,
            trav_id: 0,
            f_exor: false,
            fanins: SmallVec::new(),
            fanouts: Vec::new(),
            data: ObjData::None,
            copy: None.into(),
        }
    }

    pub fn is_ci(&self) -> bool {
        matches!(self.kind, ObjKind::Pi | ObjKind::Latch)
    }

    pub fn is_co(&self) -> bool {
        matches!(self.kind, ObjKind::Po | ObjKind::Latch)
    }
}
