use serde::{Deserialize, Serialize};

/// Commands that can be replicated through Raft
///
/// IMPORTANT: All IDs and timestamps must be generated BEFORE the command is submitted to Raft.
/// The state machine derives AllowedNetworks/NetworkAssignment rows from the command alone, so
/// every node computes the same placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    // Cluster operations
    CreateCluster {
        request_id: String,
        /// Pre-generated ID for the cluster (deterministic across nodes)
        id: String,
        /// Timestamp when command was created (set before Raft replication)
        timestamp: String,
        name: String,
        /// Initial network catalog, in placement order
        networks: Vec<NetworkSpec>,
        /// Nodes joining the cluster on creation
        node_ids: Vec<String>,
    },
    SetClusterNodes {
        request_id: String,
        cluster_id: String,
        timestamp: String,
        node_ids: Vec<String>,
    },
    DeleteCluster {
        request_id: String,
        id: String,
        timestamp: String,
    },

    // Network catalog operations
    CreateNetwork {
        request_id: String,
        timestamp: String,
        cluster_id: String,
        network: NetworkSpec,
    },
    DeleteNetwork {
        request_id: String,
        id: String,
        timestamp: String,
    },

    // Node operations
    RegisterNode {
        request_id: String,
        id: String,
        timestamp: String,
        name: String,
        /// MAC the node registered with; selects the primary interface
        mac: String,
        interfaces: Vec<InterfaceSpec>,
        cluster_id: Option<String>,
    },
    SetNodeClusters {
        request_id: String,
        timestamp: String,
        changes: Vec<NodeClusterChange>,
    },
    UpdateNodeInterfaces {
        request_id: String,
        node_id: String,
        timestamp: String,
        interfaces: Vec<InterfaceSpec>,
    },
    DeregisterNode {
        request_id: String,
        node_id: String,
    },
}

impl Command {
    pub fn request_id(&self) -> &str {
        match self {
            Command::CreateCluster { request_id, .. } => request_id,
            Command::SetClusterNodes { request_id, .. } => request_id,
            Command::DeleteCluster { request_id, .. } => request_id,
            Command::CreateNetwork { request_id, .. } => request_id,
            Command::DeleteNetwork { request_id, .. } => request_id,
            Command::RegisterNode { request_id, .. } => request_id,
            Command::SetNodeClusters { request_id, .. } => request_id,
            Command::UpdateNodeInterfaces { request_id, .. } => request_id,
            Command::DeregisterNode { request_id, .. } => request_id,
        }
    }
}

/// A network to add to a cluster's catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkSpec {
    pub id: String,
    pub name: String,
    pub vlan_id: Option<u16>,
    pub cidr: Option<String>,
    /// Restricts the network to interfaces with one of these MACs
    pub bound_macs: Vec<String>,
}

/// A discovered interface as reported for a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub id: String,
    pub name: String,
    pub mac: String,
}

/// Cluster membership change for one node (`None` leaves the current cluster).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeClusterChange {
    pub node_id: String,
    pub cluster_id: Option<String>,
}

// =============================================================================
// Cluster Types
// =============================================================================

/// Cluster data stored in the state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterData {
    pub id: String,
    pub name: String,
    /// Network catalog in insertion order
    pub network_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Logical network of a cluster's catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkData {
    pub id: String,
    pub cluster_id: String,
    pub name: String,
    pub vlan_id: Option<u16>,
    pub cidr: Option<String>,
    pub bound_macs: Vec<String>,
    pub created_at: String,
}

impl NetworkData {
    /// Whether the network may only be placed on specific MACs.
    pub fn is_mac_bound(&self) -> bool {
        !self.bound_macs.is_empty()
    }

    pub fn binds(&self, mac: &str) -> bool {
        self.bound_macs.iter().any(|m| m.eq_ignore_ascii_case(mac))
    }

    pub fn to_ref(&self) -> NetworkRef {
        NetworkRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Reference to a network in query results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkRef {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Node Types
// =============================================================================

/// Node data stored in the state machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeData {
    pub id: String,
    pub name: String,
    /// Registration MAC
    pub mac: String,
    pub cluster_id: Option<String>,
    /// Discovered interfaces, in discovery order
    pub interfaces: Vec<InterfaceData>,
    pub created_at: String,
    pub updated_at: String,
}

/// Physical interface of a node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterfaceData {
    pub id: String,
    pub name: String,
    pub mac: String,
}

impl InterfaceData {
    pub fn has_mac(&self, mac: &str) -> bool {
        self.mac.eq_ignore_ascii_case(mac)
    }
}

impl From<InterfaceSpec> for InterfaceData {
    fn from(spec: InterfaceSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name,
            mac: spec.mac,
        }
    }
}

// =============================================================================
// Derived Relations
// =============================================================================

/// Networks an interface may carry (one row per interface)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowedNetworksData {
    pub node_id: String,
    pub interface_id: String,
    pub network_ids: Vec<String>,
}

/// A network placed on an interface (one row per pair)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkAssignmentData {
    pub node_id: String,
    pub interface_id: String,
    pub network_id: String,
}

/// Interface of a node together with its allowed and assigned networks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeNicData {
    pub interface_id: String,
    pub name: String,
    pub mac: String,
    pub is_primary: bool,
    pub assigned_networks: Vec<NetworkRef>,
    pub allowed_networks: Vec<NetworkRef>,
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Cluster(ClusterData),
    Network(NetworkData),
    Node(NodeData),
    Nodes(Vec<NodeData>),
    Deleted { id: String },
    ClusterDeleted { id: String, nodes_released: u32 },
    Error { code: u32, message: String },
}

impl Default for Response {
    fn default() -> Self {
        Response::Error {
            code: 0,
            message: "No response".to_string(),
        }
    }
}
