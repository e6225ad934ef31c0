use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::command::ClusterData;
use crate::store::{
    CreateClusterRequest as StoreCreateClusterRequest,
    CreateNetworkRequest as StoreCreateNetworkRequest,
};

use super::{ApiError, AppState, CreateNetworkRequest, Network};

/// Request to create a cluster
#[derive(Deserialize, ToSchema)]
pub struct CreateClusterRequest {
    /// Unique cluster name
    pub name: String,
    /// Network catalog in placement order (default: configured default networks)
    pub networks: Option<Vec<CreateNetworkRequest>>,
    /// Nodes to add on creation
    pub node_ids: Option<Vec<String>>,
}

/// Cluster resource
#[derive(Serialize, ToSchema)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    /// Network catalog in placement order
    pub networks: Vec<Network>,
    pub node_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Expand a cluster record with its catalog and members.
async fn cluster_resource(state: &AppState, data: ClusterData) -> Result<Cluster, ApiError> {
    let networks = state.store.list_networks(Some(&data.id)).await?;
    let mut node_ids: Vec<String> = state
        .store
        .list_nodes(Some(&data.id))
        .await?
        .into_iter()
        .map(|n| n.id)
        .collect();
    node_ids.sort();

    Ok(Cluster {
        id: data.id,
        name: data.name,
        networks: networks.into_iter().map(Network::from).collect(),
        node_ids,
        created_at: data.created_at,
        updated_at: data.updated_at,
    })
}

/// Create a new cluster
#[utoipa::path(
    post,
    path = "/v1/clusters",
    request_body = CreateClusterRequest,
    responses(
        (status = 200, description = "Cluster created", body = Cluster),
        (status = 400, description = "Invalid network catalog", body = ApiError),
        (status = 404, description = "Node not found", body = ApiError),
        (status = 409, description = "Cluster name already exists", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "clusters"
)]
pub async fn create_cluster(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateClusterRequest>,
) -> Result<Json<Cluster>, ApiError> {
    let networks: Vec<StoreCreateNetworkRequest> = match req.networks {
        Some(networks) => networks.into_iter().map(Into::into).collect(),
        None => state.config.default_catalog(),
    };
    let node_ids = req.node_ids.unwrap_or_default();

    let data = state
        .store
        .create_cluster(StoreCreateClusterRequest {
            name: req.name,
            networks,
            node_ids: node_ids.clone(),
        })
        .await?;

    state.audit.cluster_created(&data.id, &data.name);
    for node_id in &node_ids {
        state.audit.node_cluster_changed(node_id, Some(&data.id));
    }
    Ok(Json(cluster_resource(&state, data).await?))
}

/// List all clusters
#[utoipa::path(
    get,
    path = "/v1/clusters",
    responses(
        (status = 200, description = "List of clusters", body = Vec<Cluster>)
    ),
    tag = "clusters"
)]
pub async fn list_clusters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Cluster>>, ApiError> {
    let mut clusters = state.store.list_clusters().await?;
    clusters.sort_by(|a, b| a.name.cmp(&b.name));

    let mut resources = Vec::with_capacity(clusters.len());
    for data in clusters {
        resources.push(cluster_resource(&state, data).await?);
    }
    Ok(Json(resources))
}

/// Get a cluster by ID or name
#[utoipa::path(
    get,
    path = "/v1/clusters/{id}",
    params(
        ("id" = String, Path, description = "Cluster ID or name")
    ),
    responses(
        (status = 200, description = "Cluster found", body = Cluster),
        (status = 404, description = "Cluster not found", body = ApiError)
    ),
    tag = "clusters"
)]
pub async fn get_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Cluster>, ApiError> {
    // Try by ID first, then by name
    let cluster = match state.store.get_cluster(&id).await? {
        Some(data) => Some(data),
        None => state.store.get_cluster_by_name(&id).await?,
    };

    match cluster {
        Some(data) => Ok(Json(cluster_resource(&state, data).await?)),
        None => Err(ApiError::not_found("Cluster", &id)),
    }
}

/// Request to replace a cluster's node list
#[derive(Deserialize, ToSchema)]
pub struct SetClusterNodesRequest {
    /// The complete member list; nodes not listed leave the cluster
    pub node_ids: Vec<String>,
}

/// Replace a cluster's members
///
/// Listed nodes join (moving out of any other cluster), members missing from the list leave.
/// The whole change is applied atomically.
#[utoipa::path(
    put,
    path = "/v1/clusters/{id}/nodes",
    params(
        ("id" = String, Path, description = "Cluster ID")
    ),
    request_body = SetClusterNodesRequest,
    responses(
        (status = 200, description = "Members replaced", body = Cluster),
        (status = 400, description = "Node listed twice", body = ApiError),
        (status = 404, description = "Cluster or node not found", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "clusters"
)]
pub async fn set_cluster_nodes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetClusterNodesRequest>,
) -> Result<Json<Cluster>, ApiError> {
    let node_count = req.node_ids.len();
    let data = state.store.set_cluster_nodes(&id, req.node_ids).await?;
    state.audit.cluster_nodes_set(&data.id, node_count);
    Ok(Json(cluster_resource(&state, data).await?))
}

/// Response for delete cluster
#[derive(Serialize, ToSchema)]
pub struct DeleteClusterResponse {
    pub deleted: bool,
    /// Member nodes returned to the unassociated pool
    pub nodes_released: u32,
}

/// Delete a cluster
///
/// Members are released and lose all allowed and assigned networks before the cluster and its
/// catalog are removed.
#[utoipa::path(
    delete,
    path = "/v1/clusters/{id}",
    params(
        ("id" = String, Path, description = "Cluster ID")
    ),
    responses(
        (status = 200, description = "Cluster deleted", body = DeleteClusterResponse),
        (status = 404, description = "Cluster not found", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "clusters"
)]
pub async fn delete_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteClusterResponse>, ApiError> {
    let result = state.store.delete_cluster(&id).await?;
    state.audit.cluster_deleted(&id, result.nodes_released);
    Ok(Json(DeleteClusterResponse {
        deleted: true,
        nodes_released: result.nodes_released,
    }))
}
