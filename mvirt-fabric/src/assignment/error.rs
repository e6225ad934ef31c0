//! Assignment engine errors.

use thiserror::Error;

/// An invariant of the derived relations would be violated.
///
/// These never describe bad user input: they mean the resolver or planner produced a
/// placement that cannot be persisted. The triggering command is rejected as a whole.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentError {
    /// A network was planned onto an interface that may not carry it.
    #[error("network {network_id} planned on interface {interface_id} outside its allowed networks")]
    OutsideAllowance {
        network_id: String,
        interface_id: String,
    },

    /// A network was placed on more than one interface of the same node.
    #[error("network {network_id} assigned {count} times on node {node_id}")]
    DuplicateAssignment {
        node_id: String,
        network_id: String,
        count: usize,
    },

    /// A catalog network has no interface on the node.
    #[error("network {network_id} not assigned on node {node_id}")]
    Unassigned { node_id: String, network_id: String },

    /// The plan references an interface or network the node/catalog does not have.
    #[error("{kind} {id} is unknown to node {node_id}")]
    UnknownReference {
        node_id: String,
        kind: &'static str,
        id: String,
    },
}
