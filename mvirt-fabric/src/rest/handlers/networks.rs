use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::command::NetworkData;
use crate::store::CreateNetworkRequest as StoreCreateNetworkRequest;

use super::{ApiError, AppState};

/// Request to add a network to a cluster's catalog
#[derive(Deserialize, ToSchema)]
pub struct CreateNetworkRequest {
    /// Network name, unique within the cluster
    pub name: String,
    /// 802.1Q VLAN tag (1-4094)
    pub vlan_id: Option<u16>,
    /// Address range in CIDR notation (e.g., "10.20.0.0/24")
    pub cidr: Option<String>,
    /// Only interfaces with one of these MACs may carry the network
    pub bound_macs: Option<Vec<String>>,
}

impl From<CreateNetworkRequest> for StoreCreateNetworkRequest {
    fn from(req: CreateNetworkRequest) -> Self {
        StoreCreateNetworkRequest {
            name: req.name,
            vlan_id: req.vlan_id,
            cidr: req.cidr,
            bound_macs: req.bound_macs.unwrap_or_default(),
        }
    }
}

/// Logical network resource
#[derive(Serialize, ToSchema)]
pub struct Network {
    pub id: String,
    pub cluster_id: String,
    pub name: String,
    pub vlan_id: Option<u16>,
    pub cidr: Option<String>,
    pub bound_macs: Vec<String>,
    pub created_at: String,
}

impl From<NetworkData> for Network {
    fn from(data: NetworkData) -> Self {
        Self {
            id: data.id,
            cluster_id: data.cluster_id,
            name: data.name,
            vlan_id: data.vlan_id,
            cidr: data.cidr,
            bound_macs: data.bound_macs,
            created_at: data.created_at,
        }
    }
}

/// Add a network to a cluster
///
/// Every member node of the cluster is re-planned against the extended catalog.
#[utoipa::path(
    post,
    path = "/v1/clusters/{id}/networks",
    params(
        ("id" = String, Path, description = "Cluster ID")
    ),
    request_body = CreateNetworkRequest,
    responses(
        (status = 200, description = "Network created", body = Network),
        (status = 400, description = "Invalid network", body = ApiError),
        (status = 404, description = "Cluster not found", body = ApiError),
        (status = 409, description = "Network name already exists in cluster", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "networks"
)]
pub async fn create_network(
    State(state): State<Arc<AppState>>,
    Path(cluster_id): Path<String>,
    Json(req): Json<CreateNetworkRequest>,
) -> Result<Json<Network>, ApiError> {
    let data = state.store.create_network(&cluster_id, req.into()).await?;
    state
        .audit
        .network_created(&data.id, &data.name, &data.cluster_id);
    Ok(Json(data.into()))
}

/// List a cluster's network catalog
#[utoipa::path(
    get,
    path = "/v1/clusters/{id}/networks",
    params(
        ("id" = String, Path, description = "Cluster ID")
    ),
    responses(
        (status = 200, description = "Networks in catalog order", body = Vec<Network>),
        (status = 404, description = "Cluster not found", body = ApiError)
    ),
    tag = "networks"
)]
pub async fn list_cluster_networks(
    State(state): State<Arc<AppState>>,
    Path(cluster_id): Path<String>,
) -> Result<Json<Vec<Network>>, ApiError> {
    if state.store.get_cluster(&cluster_id).await?.is_none() {
        return Err(ApiError::not_found("Cluster", &cluster_id));
    }
    let networks = state.store.list_networks(Some(&cluster_id)).await?;
    Ok(Json(networks.into_iter().map(|n| n.into()).collect()))
}

/// Query parameters for list networks
#[derive(Deserialize, ToSchema)]
pub struct ListNetworksQuery {
    /// Only networks of this cluster
    pub cluster_id: Option<String>,
}

/// List all networks
#[utoipa::path(
    get,
    path = "/v1/networks",
    params(
        ("cluster_id" = Option<String>, Query, description = "Filter by cluster")
    ),
    responses(
        (status = 200, description = "List of networks", body = Vec<Network>)
    ),
    tag = "networks"
)]
pub async fn list_networks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListNetworksQuery>,
) -> Result<Json<Vec<Network>>, ApiError> {
    let networks = state
        .store
        .list_networks(query.cluster_id.as_deref())
        .await?;
    Ok(Json(networks.into_iter().map(|n| n.into()).collect()))
}

/// Get a network by ID
#[utoipa::path(
    get,
    path = "/v1/networks/{id}",
    params(
        ("id" = String, Path, description = "Network ID")
    ),
    responses(
        (status = 200, description = "Network found", body = Network),
        (status = 404, description = "Network not found", body = ApiError)
    ),
    tag = "networks"
)]
pub async fn get_network(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Network>, ApiError> {
    match state.store.get_network(&id).await? {
        Some(data) => Ok(Json(data.into())),
        None => Err(ApiError::not_found("Network", &id)),
    }
}

/// Response for delete network
#[derive(Serialize, ToSchema)]
pub struct DeleteNetworkResponse {
    pub deleted: bool,
}

/// Delete a network
///
/// Member nodes of the owning cluster are re-planned without it.
#[utoipa::path(
    delete,
    path = "/v1/networks/{id}",
    params(
        ("id" = String, Path, description = "Network ID")
    ),
    responses(
        (status = 200, description = "Network deleted", body = DeleteNetworkResponse),
        (status = 404, description = "Network not found", body = ApiError),
        (status = 503, description = "Not the leader", body = ApiError)
    ),
    tag = "networks"
)]
pub async fn delete_network(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteNetworkResponse>, ApiError> {
    state.store.delete_network(&id).await?;
    state.audit.network_deleted(&id);
    Ok(Json(DeleteNetworkResponse { deleted: true }))
}
