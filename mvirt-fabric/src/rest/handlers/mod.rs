mod clusters;
mod controlplane;
mod networks;
mod nics;
mod nodes;

use axum::{Json, http::StatusCode, response::IntoResponse};
use mraft::NodeId;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::audit::FabricAuditLogger;
use crate::config::FabricConfig;
use crate::store::{DataStore, StoreError};

pub use clusters::*;
pub use controlplane::*;
pub use networks::*;
pub use nics::*;
pub use nodes::*;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub audit: Arc<FabricAuditLogger>,
    pub node_id: NodeId,
    pub config: FabricConfig,
}

/// API error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub code: u32,
}

impl ApiError {
    pub fn not_found(what: &str, id: &str) -> Self {
        ApiError {
            error: format!("{} '{}' not found", what, id),
            code: 404,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code {
            404 => StatusCode::NOT_FOUND,
            409 => StatusCode::CONFLICT,
            400 => StatusCode::BAD_REQUEST,
            503 => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => ApiError {
                error: msg,
                code: 404,
            },
            StoreError::Conflict(msg) => ApiError {
                error: msg,
                code: 409,
            },
            StoreError::InvalidInput(msg) => ApiError {
                error: msg,
                code: 400,
            },
            StoreError::NotLeader { .. } => ApiError {
                error: "Not leader".to_string(),
                code: 503,
            },
            StoreError::InconsistentState(msg) | StoreError::Internal(msg) => ApiError {
                error: msg,
                code: 500,
            },
        }
    }
}

/// Version information
#[derive(Serialize, ToSchema)]
pub struct VersionInfo {
    pub version: String,
}

/// Get service version
#[utoipa::path(
    get,
    path = "/v1/version",
    responses(
        (status = 200, description = "Service version", body = VersionInfo)
    ),
    tag = "system"
)]
pub async fn get_version() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
