//! RaftStore implementation - bridges DataStore traits to RaftNode.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mraft::RaftNode;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::command::{
    AllowedNetworksData, ClusterData, Command, InterfaceData, InterfaceSpec,
    NetworkAssignmentData, NetworkData, NetworkSpec, NodeClusterChange, NodeData, NodeNicData,
    Response,
};
use crate::state::FabricState;

use super::error::{Result, StoreError};
use super::event::Event;
use super::traits::{
    AssignmentStore, ClusterStore, ControlPlaneInfo, ControlPlaneStore, CreateClusterRequest,
    CreateNetworkRequest, DataStore, DeleteClusterResult, DiscoveredInterface, Membership,
    MembershipNode, NetworkStore, NodeStore, RegisterNodeRequest,
};

/// RaftStore wraps a RaftNode and implements the DataStore trait.
///
/// This provides a clean abstraction over Raft operations, hiding the
/// Command/Response types from handlers.
pub struct RaftStore {
    node: Arc<RwLock<RaftNode<Command, Response, FabricState>>>,
    events: broadcast::Sender<Event>,
    node_id: u64,
}

impl RaftStore {
    /// Create a new RaftStore wrapping the given RaftNode.
    pub fn new(
        node: Arc<RwLock<RaftNode<Command, Response, FabricState>>>,
        events: broadcast::Sender<Event>,
        node_id: u64,
    ) -> Self {
        Self {
            node,
            events,
            node_id,
        }
    }

    /// Execute a write command through Raft.
    ///
    /// Rejected commands come back as `Response::Error` and are mapped to a `StoreError`.
    async fn write_command(&self, cmd: Command) -> Result<Response> {
        let node = self.node.read().await;
        let response = node
            .write_or_forward(cmd)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        match response {
            Response::Error { code, message } => Err(StoreError::from_code(code, message)),
            response => Ok(response),
        }
    }

    /// Read from the current state snapshot.
    async fn read<T>(&self, f: impl FnOnce(&FabricState) -> T) -> T {
        let node = self.node.read().await;
        let state = node.get_state().await;
        f(&state)
    }
}

fn request_id() -> String {
    Uuid::new_v4().to_string()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn unexpected(response: Response) -> StoreError {
    StoreError::Internal(format!("unexpected response: {:?}", response))
}

fn network_spec(req: CreateNetworkRequest) -> NetworkSpec {
    NetworkSpec {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        vlan_id: req.vlan_id,
        cidr: req.cidr,
        bound_macs: req.bound_macs,
    }
}

fn interface_specs(interfaces: Vec<DiscoveredInterface>) -> Vec<InterfaceSpec> {
    interfaces
        .into_iter()
        .map(|i| InterfaceSpec {
            id: Uuid::new_v4().to_string(),
            name: i.name,
            mac: i.mac,
        })
        .collect()
}

#[async_trait]
impl ClusterStore for RaftStore {
    async fn list_clusters(&self) -> Result<Vec<ClusterData>> {
        Ok(self
            .read(|s| s.list_clusters().into_iter().cloned().collect())
            .await)
    }

    async fn get_cluster(&self, id: &str) -> Result<Option<ClusterData>> {
        Ok(self.read(|s| s.get_cluster(id).cloned()).await)
    }

    async fn get_cluster_by_name(&self, name: &str) -> Result<Option<ClusterData>> {
        Ok(self.read(|s| s.get_cluster_by_name(name).cloned()).await)
    }

    async fn create_cluster(&self, req: CreateClusterRequest) -> Result<ClusterData> {
        let cmd = Command::CreateCluster {
            request_id: request_id(),
            id: Uuid::new_v4().to_string(),
            timestamp: timestamp(),
            name: req.name,
            networks: req.networks.into_iter().map(network_spec).collect(),
            node_ids: req.node_ids,
        };

        match self.write_command(cmd).await? {
            Response::Cluster(data) => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    async fn set_cluster_nodes(&self, id: &str, node_ids: Vec<String>) -> Result<ClusterData> {
        let cmd = Command::SetClusterNodes {
            request_id: request_id(),
            cluster_id: id.to_string(),
            timestamp: timestamp(),
            node_ids,
        };

        match self.write_command(cmd).await? {
            Response::Cluster(data) => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    async fn delete_cluster(&self, id: &str) -> Result<DeleteClusterResult> {
        let cmd = Command::DeleteCluster {
            request_id: request_id(),
            id: id.to_string(),
            timestamp: timestamp(),
        };

        match self.write_command(cmd).await? {
            Response::ClusterDeleted { nodes_released, .. } => {
                Ok(DeleteClusterResult { nodes_released })
            }
            other => Err(unexpected(other)),
        }
    }
}

#[async_trait]
impl NetworkStore for RaftStore {
    async fn list_networks(&self, cluster_id: Option<&str>) -> Result<Vec<NetworkData>> {
        Ok(self
            .read(|s| s.list_networks(cluster_id).into_iter().cloned().collect())
            .await)
    }

    async fn get_network(&self, id: &str) -> Result<Option<NetworkData>> {
        Ok(self.read(|s| s.get_network(id).cloned()).await)
    }

    async fn create_network(
        &self,
        cluster_id: &str,
        req: CreateNetworkRequest,
    ) -> Result<NetworkData> {
        let cmd = Command::CreateNetwork {
            request_id: request_id(),
            timestamp: timestamp(),
            cluster_id: cluster_id.to_string(),
            network: network_spec(req),
        };

        match self.write_command(cmd).await? {
            Response::Network(data) => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        let cmd = Command::DeleteNetwork {
            request_id: request_id(),
            id: id.to_string(),
            timestamp: timestamp(),
        };

        match self.write_command(cmd).await? {
            Response::Deleted { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

#[async_trait]
impl NodeStore for RaftStore {
    async fn list_nodes(&self, cluster_id: Option<&str>) -> Result<Vec<NodeData>> {
        Ok(self
            .read(|s| s.list_nodes(cluster_id).into_iter().cloned().collect())
            .await)
    }

    async fn get_node(&self, id: &str) -> Result<Option<NodeData>> {
        Ok(self.read(|s| s.get_node(id).cloned()).await)
    }

    async fn get_node_by_name(&self, name: &str) -> Result<Option<NodeData>> {
        Ok(self.read(|s| s.get_node_by_name(name).cloned()).await)
    }

    async fn register_node(&self, req: RegisterNodeRequest) -> Result<NodeData> {
        let cmd = Command::RegisterNode {
            request_id: request_id(),
            id: Uuid::new_v4().to_string(),
            timestamp: timestamp(),
            name: req.name,
            mac: req.mac,
            interfaces: interface_specs(req.interfaces),
            cluster_id: req.cluster_id,
        };

        match self.write_command(cmd).await? {
            Response::Node(data) => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    async fn set_node_cluster(&self, id: &str, cluster_id: Option<String>) -> Result<NodeData> {
        let mut nodes = self
            .set_node_clusters(vec![NodeClusterChange {
                node_id: id.to_string(),
                cluster_id,
            }])
            .await?;
        nodes
            .pop()
            .ok_or_else(|| StoreError::Internal(format!("node {} missing from response", id)))
    }

    async fn set_node_clusters(&self, changes: Vec<NodeClusterChange>) -> Result<Vec<NodeData>> {
        let cmd = Command::SetNodeClusters {
            request_id: request_id(),
            timestamp: timestamp(),
            changes,
        };

        match self.write_command(cmd).await? {
            Response::Nodes(nodes) => Ok(nodes),
            other => Err(unexpected(other)),
        }
    }

    async fn update_node_interfaces(
        &self,
        id: &str,
        interfaces: Vec<DiscoveredInterface>,
    ) -> Result<NodeData> {
        // Rediscovered interfaces keep their IDs so clients can track them.
        let existing = self.read(|s| s.get_node(id).cloned()).await;
        let mut specs = interface_specs(interfaces);
        if let Some(node) = existing {
            for spec in &mut specs {
                if let Some(known) = node.interfaces.iter().find(|i| i.has_mac(&spec.mac)) {
                    spec.id = known.id.clone();
                }
            }
        }

        let cmd = Command::UpdateNodeInterfaces {
            request_id: request_id(),
            node_id: id.to_string(),
            timestamp: timestamp(),
            interfaces: specs,
        };

        match self.write_command(cmd).await? {
            Response::Node(data) => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    async fn deregister_node(&self, id: &str) -> Result<()> {
        let cmd = Command::DeregisterNode {
            request_id: request_id(),
            node_id: id.to_string(),
        };

        match self.write_command(cmd).await? {
            Response::Deleted { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

#[async_trait]
impl AssignmentStore for RaftStore {
    async fn get_node_nics(&self, node_id: &str) -> Result<Option<Vec<NodeNicData>>> {
        Ok(self.read(|s| s.node_nics(node_id)).await)
    }

    async fn get_default_nics(&self, node_id: &str) -> Result<Option<Vec<InterfaceData>>> {
        Ok(self
            .read(|s| s.default_nics(node_id).map(<[InterfaceData]>::to_vec))
            .await)
    }

    async fn list_allowed_networks(
        &self,
        node_id: Option<&str>,
    ) -> Result<Vec<AllowedNetworksData>> {
        Ok(self
            .read(|s| {
                s.list_allowed_networks()
                    .iter()
                    .filter(|row| node_id.is_none_or(|id| row.node_id == id))
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn list_network_assignments(
        &self,
        node_id: Option<&str>,
    ) -> Result<Vec<NetworkAssignmentData>> {
        Ok(self
            .read(|s| {
                s.list_network_assignments()
                    .iter()
                    .filter(|row| node_id.is_none_or(|id| row.node_id == id))
                    .cloned()
                    .collect()
            })
            .await)
    }
}

#[async_trait]
impl ControlPlaneStore for RaftStore {
    async fn get_control_plane_info(&self) -> Result<ControlPlaneInfo> {
        let node = self.node.read().await;
        let metrics = node.metrics();

        Ok(ControlPlaneInfo {
            leader_id: metrics.current_leader,
            current_term: metrics.current_term,
            commit_index: metrics.last_applied.map(|l| l.index).unwrap_or(0),
            node_id: self.node_id,
            is_leader: metrics.current_leader == Some(self.node_id),
        })
    }

    async fn get_membership(&self) -> Result<Membership> {
        let node = self.node.read().await;
        let membership = node.get_membership();

        let nodes: Vec<MembershipNode> = membership
            .nodes
            .iter()
            .map(|(id, addr)| {
                let role = if membership.voters.contains(id) {
                    "voter"
                } else if membership.learners.contains(id) {
                    "learner"
                } else {
                    "unknown"
                };
                MembershipNode {
                    id: *id,
                    address: addr.clone(),
                    role: role.to_string(),
                }
            })
            .collect();

        Ok(Membership {
            voters: membership.voters.into_iter().collect(),
            learners: membership.learners.into_iter().collect(),
            nodes,
        })
    }
}

impl DataStore for RaftStore {
    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}
