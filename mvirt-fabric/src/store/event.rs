//! Events emitted by state machine changes.

use crate::command::{ClusterData, NetworkData, NodeData};

/// Events emitted when state changes occur.
///
/// These events are dispatched via broadcast channels to subscribers.
/// They are only emitted on the leader node after commands are applied.
#[derive(Debug, Clone)]
pub enum Event {
    // Cluster events
    /// A new cluster was created.
    ClusterCreated(ClusterData),
    /// A cluster was deleted after its members were released.
    ClusterDeleted {
        id: String,
        released_nodes: Vec<String>,
    },

    // Network events
    /// A network was added to a cluster's catalog.
    NetworkCreated(NetworkData),
    /// A network was removed from a cluster's catalog.
    NetworkDeleted { id: String, cluster_id: String },

    // Node events
    /// A new node was registered.
    NodeRegistered(NodeData),
    /// A node was updated (membership, interfaces).
    NodeUpdated {
        id: String,
        old: NodeData,
        new: NodeData,
    },
    /// A node was deregistered.
    NodeDeregistered { id: String },

    // Membership events
    NodeJoinedCluster { node_id: String, cluster_id: String },
    NodeLeftCluster { node_id: String, cluster_id: String },
    /// AllowedNetworks and NetworkAssignment rows of a node were rebuilt.
    NetworksPlaced {
        node_id: String,
        cluster_id: String,
        allowed_rows: usize,
        assigned_rows: usize,
    },
    /// All derived rows of a node were removed.
    NetworksCleared { node_id: String, rows_removed: usize },
}

impl Event {
    /// Get the resource type for this event.
    pub fn resource_type(&self) -> &'static str {
        match self {
            Event::ClusterCreated(_) | Event::ClusterDeleted { .. } => "cluster",
            Event::NetworkCreated(_) | Event::NetworkDeleted { .. } => "network",
            Event::NodeRegistered(_)
            | Event::NodeUpdated { .. }
            | Event::NodeDeregistered { .. }
            | Event::NodeJoinedCluster { .. }
            | Event::NodeLeftCluster { .. } => "node",
            Event::NetworksPlaced { .. } | Event::NetworksCleared { .. } => "network_assignment",
        }
    }

    /// Get the resource ID for this event.
    pub fn resource_id(&self) -> &str {
        match self {
            Event::ClusterCreated(c) => &c.id,
            Event::ClusterDeleted { id, .. } => id,
            Event::NetworkCreated(n) => &n.id,
            Event::NetworkDeleted { id, .. } => id,
            Event::NodeRegistered(n) => &n.id,
            Event::NodeUpdated { id, .. } => id,
            Event::NodeDeregistered { id } => id,
            Event::NodeJoinedCluster { node_id, .. }
            | Event::NodeLeftCluster { node_id, .. }
            | Event::NetworksPlaced { node_id, .. }
            | Event::NetworksCleared { node_id, .. } => node_id,
        }
    }
}
