//! DataStore trait definitions.
//!
//! These traits abstract away the underlying Raft implementation,
//! allowing handlers to work with domain objects instead of commands.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::command::{
    AllowedNetworksData, ClusterData, InterfaceData, NetworkAssignmentData, NetworkData,
    NodeClusterChange, NodeData, NodeNicData,
};

use super::error::Result;
use super::event::Event;

// =============================================================================
// Cluster Request DTOs
// =============================================================================

/// Request to create a new cluster.
#[derive(Debug, Clone, Default)]
pub struct CreateClusterRequest {
    pub name: String,
    /// Initial catalog, in placement order
    pub networks: Vec<CreateNetworkRequest>,
    /// Nodes joining on creation
    pub node_ids: Vec<String>,
}

/// Result of deleting a cluster.
#[derive(Debug, Clone)]
pub struct DeleteClusterResult {
    pub nodes_released: u32,
}

// =============================================================================
// Network Request DTOs
// =============================================================================

/// Request to add a network to a cluster's catalog.
#[derive(Debug, Clone, Default)]
pub struct CreateNetworkRequest {
    pub name: String,
    pub vlan_id: Option<u16>,
    pub cidr: Option<String>,
    pub bound_macs: Vec<String>,
}

// =============================================================================
// Node Request DTOs
// =============================================================================

/// An interface as reported by node discovery.
#[derive(Debug, Clone)]
pub struct DiscoveredInterface {
    pub name: String,
    pub mac: String,
}

/// Request to register a new node.
#[derive(Debug, Clone)]
pub struct RegisterNodeRequest {
    pub name: String,
    pub mac: String,
    pub interfaces: Vec<DiscoveredInterface>,
    pub cluster_id: Option<String>,
}

// =============================================================================
// Control Plane DTOs
// =============================================================================

/// Raft control plane information.
#[derive(Debug, Clone)]
pub struct ControlPlaneInfo {
    pub leader_id: Option<u64>,
    pub current_term: u64,
    pub commit_index: u64,
    pub node_id: u64,
    pub is_leader: bool,
}

/// Control plane membership information.
#[derive(Debug, Clone)]
pub struct Membership {
    pub voters: Vec<u64>,
    pub learners: Vec<u64>,
    pub nodes: Vec<MembershipNode>,
}

/// Node in membership.
#[derive(Debug, Clone)]
pub struct MembershipNode {
    pub id: u64,
    pub address: String,
    pub role: String,
}

// =============================================================================
// Domain Store Traits
// =============================================================================

/// Store trait for cluster operations.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// List all clusters.
    async fn list_clusters(&self) -> Result<Vec<ClusterData>>;

    /// Get a cluster by ID.
    async fn get_cluster(&self, id: &str) -> Result<Option<ClusterData>>;

    /// Get a cluster by name.
    async fn get_cluster_by_name(&self, name: &str) -> Result<Option<ClusterData>>;

    /// Create a cluster with its catalog and initial members.
    async fn create_cluster(&self, req: CreateClusterRequest) -> Result<ClusterData>;

    /// Replace a cluster's member list.
    async fn set_cluster_nodes(&self, id: &str, node_ids: Vec<String>) -> Result<ClusterData>;

    /// Release all members, then delete the cluster and its catalog.
    async fn delete_cluster(&self, id: &str) -> Result<DeleteClusterResult>;
}

/// Store trait for network catalog operations.
#[async_trait]
pub trait NetworkStore: Send + Sync {
    /// List networks, optionally only one cluster's catalog.
    async fn list_networks(&self, cluster_id: Option<&str>) -> Result<Vec<NetworkData>>;

    /// Get a network by ID.
    async fn get_network(&self, id: &str) -> Result<Option<NetworkData>>;

    /// Add a network to a cluster's catalog.
    async fn create_network(&self, cluster_id: &str, req: CreateNetworkRequest)
    -> Result<NetworkData>;

    /// Remove a network from its cluster's catalog.
    async fn delete_network(&self, id: &str) -> Result<()>;
}

/// Store trait for node operations.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// List all nodes, optionally filtered by cluster.
    async fn list_nodes(&self, cluster_id: Option<&str>) -> Result<Vec<NodeData>>;

    /// Get a node by ID.
    async fn get_node(&self, id: &str) -> Result<Option<NodeData>>;

    /// Get a node by name.
    async fn get_node_by_name(&self, name: &str) -> Result<Option<NodeData>>;

    /// Register a new node.
    async fn register_node(&self, req: RegisterNodeRequest) -> Result<NodeData>;

    /// Move one node into a cluster, or out of any cluster with `None`.
    async fn set_node_cluster(&self, id: &str, cluster_id: Option<String>) -> Result<NodeData>;

    /// Apply several membership changes atomically.
    async fn set_node_clusters(&self, changes: Vec<NodeClusterChange>) -> Result<Vec<NodeData>>;

    /// Replace a node's discovered interfaces.
    async fn update_node_interfaces(
        &self,
        id: &str,
        interfaces: Vec<DiscoveredInterface>,
    ) -> Result<NodeData>;

    /// Deregister a node.
    async fn deregister_node(&self, id: &str) -> Result<()>;
}

/// Store trait for the derived network placement.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// A node's interfaces with assigned and allowed networks.
    async fn get_node_nics(&self, node_id: &str) -> Result<Option<Vec<NodeNicData>>>;

    /// A node's interfaces as discovered.
    async fn get_default_nics(&self, node_id: &str) -> Result<Option<Vec<InterfaceData>>>;

    /// AllowedNetworks rows, optionally for one node.
    async fn list_allowed_networks(&self, node_id: Option<&str>)
    -> Result<Vec<AllowedNetworksData>>;

    /// NetworkAssignment rows, optionally for one node.
    async fn list_network_assignments(
        &self,
        node_id: Option<&str>,
    ) -> Result<Vec<NetworkAssignmentData>>;
}

/// Store trait for the Raft control plane.
#[async_trait]
pub trait ControlPlaneStore: Send + Sync {
    /// Get control plane information.
    async fn get_control_plane_info(&self) -> Result<ControlPlaneInfo>;

    /// Get control plane membership.
    async fn get_membership(&self) -> Result<Membership>;
}

// =============================================================================
// Composite DataStore Trait
// =============================================================================

/// Composite data store trait combining all domain stores.
///
/// This is the main trait that handlers should use. It provides:
/// - Cluster lifecycle and membership
/// - Network catalog operations
/// - Node registration and interface discovery
/// - Derived NIC queries
/// - Event subscription for real-time updates
pub trait DataStore:
    ClusterStore + NetworkStore + NodeStore + AssignmentStore + ControlPlaneStore + Send + Sync
{
    /// Subscribe to state change events.
    fn subscribe(&self) -> broadcast::Receiver<Event>;
}
