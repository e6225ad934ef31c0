use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::command::{
    AllowedNetworksData, InterfaceData, NetworkAssignmentData, NetworkRef, NodeNicData,
};

use super::{ApiError, AppState};

/// Network carried (or allowed) on an interface
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NicNetwork {
    pub id: String,
    pub name: String,
}

impl From<NetworkRef> for NicNetwork {
    fn from(data: NetworkRef) -> Self {
        Self {
            id: data.id,
            name: data.name,
        }
    }
}

/// Node interface with its network placement
#[derive(Serialize, ToSchema)]
pub struct NodeNic {
    pub id: String,
    pub name: String,
    pub mac: String,
    /// Interface matching the node's registration MAC (or the first one)
    pub is_primary: bool,
    pub assigned_networks: Vec<NicNetwork>,
    pub allowed_networks: Vec<NicNetwork>,
}

impl From<NodeNicData> for NodeNic {
    fn from(data: NodeNicData) -> Self {
        Self {
            id: data.interface_id,
            name: data.name,
            mac: data.mac,
            is_primary: data.is_primary,
            assigned_networks: data.assigned_networks.into_iter().map(Into::into).collect(),
            allowed_networks: data.allowed_networks.into_iter().map(Into::into).collect(),
        }
    }
}

/// Node interface as discovered
#[derive(Serialize, ToSchema)]
pub struct DefaultNic {
    pub name: String,
    pub mac: String,
}

impl From<InterfaceData> for DefaultNic {
    fn from(data: InterfaceData) -> Self {
        Self {
            name: data.name,
            mac: data.mac,
        }
    }
}

/// Get a node's interfaces with assigned and allowed networks
///
/// Both network lists are empty for nodes outside any cluster.
#[utoipa::path(
    get,
    path = "/v1/nodes/{id}/interfaces",
    params(
        ("id" = String, Path, description = "Node ID")
    ),
    responses(
        (status = 200, description = "Interfaces in discovery order", body = Vec<NodeNic>),
        (status = 404, description = "Node not found", body = ApiError)
    ),
    tag = "nics"
)]
pub async fn get_node_nics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<NodeNic>>, ApiError> {
    match state.store.get_node_nics(&id).await? {
        Some(nics) => Ok(Json(nics.into_iter().map(Into::into).collect())),
        None => Err(ApiError::not_found("Node", &id)),
    }
}

/// Get a node's interfaces as discovered, independent of any cluster
#[utoipa::path(
    get,
    path = "/v1/nodes/{id}/interfaces/default",
    params(
        ("id" = String, Path, description = "Node ID")
    ),
    responses(
        (status = 200, description = "Interfaces in discovery order", body = Vec<DefaultNic>),
        (status = 404, description = "Node not found", body = ApiError)
    ),
    tag = "nics"
)]
pub async fn get_default_nics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DefaultNic>>, ApiError> {
    match state.store.get_default_nics(&id).await? {
        Some(nics) => Ok(Json(nics.into_iter().map(Into::into).collect())),
        None => Err(ApiError::not_found("Node", &id)),
    }
}

/// Query parameters for relation listings
#[derive(Deserialize, ToSchema)]
pub struct RelationQuery {
    /// Only rows of this node
    pub node_id: Option<String>,
}

/// AllowedNetworks row
#[derive(Serialize, ToSchema)]
pub struct AllowedNetworks {
    pub node_id: String,
    pub interface_id: String,
    pub network_ids: Vec<String>,
}

impl From<AllowedNetworksData> for AllowedNetworks {
    fn from(data: AllowedNetworksData) -> Self {
        Self {
            node_id: data.node_id,
            interface_id: data.interface_id,
            network_ids: data.network_ids,
        }
    }
}

/// NetworkAssignment row
#[derive(Serialize, ToSchema)]
pub struct NetworkAssignment {
    pub node_id: String,
    pub interface_id: String,
    pub network_id: String,
}

impl From<NetworkAssignmentData> for NetworkAssignment {
    fn from(data: NetworkAssignmentData) -> Self {
        Self {
            node_id: data.node_id,
            interface_id: data.interface_id,
            network_id: data.network_id,
        }
    }
}

/// List AllowedNetworks rows
#[utoipa::path(
    get,
    path = "/v1/allowed-networks",
    params(
        ("node_id" = Option<String>, Query, description = "Filter by node")
    ),
    responses(
        (status = 200, description = "AllowedNetworks rows", body = Vec<AllowedNetworks>)
    ),
    tag = "nics"
)]
pub async fn list_allowed_networks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RelationQuery>,
) -> Result<Json<Vec<AllowedNetworks>>, ApiError> {
    let rows = state
        .store
        .list_allowed_networks(query.node_id.as_deref())
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// List NetworkAssignment rows
#[utoipa::path(
    get,
    path = "/v1/network-assignments",
    params(
        ("node_id" = Option<String>, Query, description = "Filter by node")
    ),
    responses(
        (status = 200, description = "NetworkAssignment rows", body = Vec<NetworkAssignment>)
    ),
    tag = "nics"
)]
pub async fn list_network_assignments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RelationQuery>,
) -> Result<Json<Vec<NetworkAssignment>>, ApiError> {
    let rows = state
        .store
        .list_network_assignments(query.node_id.as_deref())
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
