//! Placement of a cluster's logical networks onto node interfaces.
//!
//! # Architecture
//!
//! ```text
//! NodeData.interfaces ─┐
//!                      ├─► resolve() ─► allowance ─► plan() ─► NodePlacement
//! cluster catalog ─────┘                                          │
//!                                                                 ▼
//!                                         Bindings::replace() / Bindings::clear()
//! ```
//!
//! `resolve` and `plan` are pure functions of a node and its cluster's catalog, so the
//! state machine produces identical rows on every Raft member. `Bindings` owns the two
//! derived relations (AllowedNetworks, NetworkAssignment) and is only ever rewritten per
//! node as a whole.

mod error;
mod planner;
mod reconciler;
mod resolver;

use std::collections::BTreeMap;

pub use error::AssignmentError;
pub use planner::{plan, primary_interface};
pub use reconciler::{Bindings, NodePlacement, Transition, place};
pub use resolver::{bound_interface, resolve};

/// Interface ID → network IDs, each list in catalog order.
pub type NetworkMap = BTreeMap<String, Vec<String>>;
