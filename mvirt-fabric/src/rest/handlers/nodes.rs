use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::command::{InterfaceData, NodeClusterChange, NodeData};
use crate::store::{DiscoveredInterface, RegisterNodeRequest as StoreRegisterNodeRequest};

use super::{ApiError, AppState};

/// Physical interface as reported by discovery
#[derive(Deserialize, ToSchema)]
pub struct InterfaceRequest {
    /// Interface name (e.g., "eth0")
    pub name: String,
    /// MAC address
    pub mac: String,
}

impl From<InterfaceRequest> for DiscoveredInterface {
    fn from(req: InterfaceRequest) -> Self {
        DiscoveredInterface {
            name: req.name,
            mac: req.mac,
        }
    }
}

/// Request to register a node
#[derive(Deserialize, ToSchema)]
pub struct RegisterNodeRequest {
    /// Unique node name
    pub name: String,
    /// MAC the node booted from; its interface becomes the primary
    pub mac: String,
    /// Discovered interfaces in discovery order
    #[serde(default)]
    pub interfaces: Vec<InterfaceRequest>,
    /// Cluster to join right away
    pub cluster_id: Option<String>,
}

/// Physical interface of a node
#[derive(Serialize, ToSchema)]
pub struct Interface {
    pub id: String,
    pub name: String,
    pub mac: String,
}

impl From<InterfaceData> for Interface {
    fn from(data: InterfaceData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            mac: data.mac,
        }
    }
}

/// Node resource
#[derive(Serialize, ToSchema)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub mac: String,
    /// Owning cluster, absent for unassociated nodes
    pub cluster_id: Option<String>,
    pub interfaces: Vec<Interface>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<NodeData> for Node {
    fn from(data: NodeData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            mac: data.mac,
            cluster_id: data.cluster_id,
            interfaces: data.interfaces.into_iter().map(Interface::from).collect(),
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }
}

/// Register a node
#[utoipa::path(
    post,
    path = "/v1/nodes",
    request_body = RegisterNodeRequest,
    responses(
        (status = 200, description = "Node registered", body = Node),
        (status = 400, description = "Duplicate interface name or MAC", body = ApiError),
        (status = 404, description = "Cluster not found", body = ApiError),
        (status = 409, description = "Node name already exists", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "nodes"
)]
pub async fn register_node(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterNodeRequest>,
) -> Result<Json<Node>, ApiError> {
    let store_req = StoreRegisterNodeRequest {
        name: req.name,
        mac: req.mac,
        interfaces: req.interfaces.into_iter().map(Into::into).collect(),
        cluster_id: req.cluster_id,
    };

    let data = state.store.register_node(store_req).await?;
    state.audit.node_registered(&data.id, &data.name);
    if let Some(cluster_id) = &data.cluster_id {
        state.audit.node_cluster_changed(&data.id, Some(cluster_id));
    }
    Ok(Json(data.into()))
}

/// Get a node by ID or name
#[utoipa::path(
    get,
    path = "/v1/nodes/{id}",
    params(
        ("id" = String, Path, description = "Node ID or name")
    ),
    responses(
        (status = 200, description = "Node found", body = Node),
        (status = 404, description = "Node not found", body = ApiError)
    ),
    tag = "nodes"
)]
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Node>, ApiError> {
    // Try by ID first, then by name
    let node = match state.store.get_node(&id).await? {
        Some(data) => Some(data),
        None => state.store.get_node_by_name(&id).await?,
    };

    match node {
        Some(data) => Ok(Json(data.into())),
        None => Err(ApiError::not_found("Node", &id)),
    }
}

/// Query parameters for list nodes
#[derive(Deserialize, ToSchema)]
pub struct ListNodesQuery {
    /// Only members of this cluster
    pub cluster_id: Option<String>,
}

/// List all nodes
#[utoipa::path(
    get,
    path = "/v1/nodes",
    params(
        ("cluster_id" = Option<String>, Query, description = "Filter by cluster")
    ),
    responses(
        (status = 200, description = "List of nodes", body = Vec<Node>)
    ),
    tag = "nodes"
)]
pub async fn list_nodes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListNodesQuery>,
) -> Result<Json<Vec<Node>>, ApiError> {
    let mut nodes = state.store.list_nodes(query.cluster_id.as_deref()).await?;
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(nodes.into_iter().map(|n| n.into()).collect()))
}

/// Cluster membership change for one node
#[derive(Deserialize, ToSchema)]
pub struct NodeClusterUpdate {
    /// Node ID
    pub id: String,
    /// Target cluster, `null` to leave the current one
    pub cluster_id: Option<String>,
}

/// Change the cluster of several nodes
///
/// Either every change is applied or none is.
#[utoipa::path(
    put,
    path = "/v1/nodes",
    request_body = Vec<NodeClusterUpdate>,
    responses(
        (status = 200, description = "Nodes updated", body = Vec<Node>),
        (status = 400, description = "Node listed twice", body = ApiError),
        (status = 404, description = "Node or cluster not found", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "nodes"
)]
pub async fn set_node_clusters(
    State(state): State<Arc<AppState>>,
    Json(updates): Json<Vec<NodeClusterUpdate>>,
) -> Result<Json<Vec<Node>>, ApiError> {
    let changes = updates
        .into_iter()
        .map(|u| NodeClusterChange {
            node_id: u.id,
            cluster_id: u.cluster_id,
        })
        .collect();

    let nodes = state.store.set_node_clusters(changes).await?;
    for node in &nodes {
        state
            .audit
            .node_cluster_changed(&node.id, node.cluster_id.as_deref());
    }
    Ok(Json(nodes.into_iter().map(|n| n.into()).collect()))
}

/// Request to change a node's cluster
#[derive(Deserialize, ToSchema)]
pub struct SetNodeClusterRequest {
    /// Target cluster, `null` to leave the current one
    pub cluster_id: Option<String>,
}

/// Move a node into a cluster or out of its cluster
#[utoipa::path(
    put,
    path = "/v1/nodes/{id}/cluster",
    params(
        ("id" = String, Path, description = "Node ID")
    ),
    request_body = SetNodeClusterRequest,
    responses(
        (status = 200, description = "Node updated", body = Node),
        (status = 404, description = "Node or cluster not found", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "nodes"
)]
pub async fn set_node_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetNodeClusterRequest>,
) -> Result<Json<Node>, ApiError> {
    let data = state.store.set_node_cluster(&id, req.cluster_id).await?;
    state
        .audit
        .node_cluster_changed(&data.id, data.cluster_id.as_deref());
    Ok(Json(data.into()))
}

/// Replace a node's discovered interfaces
///
/// Interfaces keep their ID when their MAC was already known. Cluster members are re-planned.
#[utoipa::path(
    put,
    path = "/v1/nodes/{id}/interfaces",
    params(
        ("id" = String, Path, description = "Node ID")
    ),
    request_body = Vec<InterfaceRequest>,
    responses(
        (status = 200, description = "Interfaces updated", body = Node),
        (status = 400, description = "Duplicate interface name or MAC", body = ApiError),
        (status = 404, description = "Node not found", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "nodes"
)]
pub async fn update_node_interfaces(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(interfaces): Json<Vec<InterfaceRequest>>,
) -> Result<Json<Node>, ApiError> {
    let interfaces: Vec<DiscoveredInterface> = interfaces.into_iter().map(Into::into).collect();
    let data = state.store.update_node_interfaces(&id, interfaces).await?;
    state
        .audit
        .node_interfaces_updated(&data.id, data.interfaces.len());
    Ok(Json(data.into()))
}

/// Response for deregister node
#[derive(Serialize, ToSchema)]
pub struct DeregisterNodeResponse {
    pub deregistered: bool,
}

/// Deregister a node
#[utoipa::path(
    delete,
    path = "/v1/nodes/{id}",
    params(
        ("id" = String, Path, description = "Node ID")
    ),
    responses(
        (status = 200, description = "Node deregistered", body = DeregisterNodeResponse),
        (status = 404, description = "Node not found", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "nodes"
)]
pub async fn deregister_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeregisterNodeResponse>, ApiError> {
    state.store.deregister_node(&id).await?;
    state.audit.node_deregistered(&id);
    Ok(Json(DeregisterNodeResponse { deregistered: true }))
}
