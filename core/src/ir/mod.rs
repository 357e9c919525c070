//! The object model (C1/C2/C3): entities, edges, objects, and the
//! network container that owns them.

mod edge;
mod entities;
mod network;
mod object;

pub use edge::{FaninEdge, FanoutEdge};
pub use entities::{ObjId, Ref};
pub use network::{FuncKind, FuncManager, Network, NtkKind, ObjCounters};
pub use object::{BddHandle, GateHandle, LatchInit, Marks, Obj, ObjData, ObjKind};
