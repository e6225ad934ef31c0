use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::{ApiError, AppState};

/// Control plane information
#[derive(Serialize, ToSchema)]
pub struct ControlplaneInfo {
    pub node_id: u64,
    pub leader_id: Option<u64>,
    pub is_leader: bool,
    pub current_term: u64,
    pub commit_index: u64,
    pub peers: Vec<MembershipPeer>,
}

/// Peer in membership
#[derive(Serialize, ToSchema)]
pub struct MembershipPeer {
    pub id: u64,
    pub address: String,
    pub role: String,
}

/// Get control plane information
#[utoipa::path(
    get,
    path = "/v1/controlplane",
    responses(
        (status = 200, description = "Control plane information", body = ControlplaneInfo)
    ),
    tag = "controlplane"
)]
pub async fn get_controlplane_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlplaneInfo>, ApiError> {
    let info = state.store.get_control_plane_info().await?;
    let membership = state.store.get_membership().await?;

    let peers = membership
        .nodes
        .into_iter()
        .map(|n| MembershipPeer {
            id: n.id,
            address: n.address,
            role: n.role,
        })
        .collect();

    Ok(Json(ControlplaneInfo {
        node_id: info.node_id,
        leader_id: info.leader_id,
        is_leader: info.is_leader,
        current_term: info.current_term,
        commit_index: info.commit_index,
        peers,
    }))
}
