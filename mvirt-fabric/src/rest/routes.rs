use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{self, AppState};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "mvirt Fabric",
        version = "0.1.0",
        description = "REST API for mvirt-fabric. Places each cluster's logical networks onto the physical interfaces of its member nodes, replicated via Raft consensus.",
        license(name = "MIT")
    ),
    tags(
        (name = "system", description = "System information"),
        (name = "controlplane", description = "Raft control plane status"),
        (name = "clusters", description = "Cluster lifecycle and membership"),
        (name = "networks", description = "Cluster network catalogs"),
        (name = "nodes", description = "Node registration, interfaces and cluster assignment"),
        (name = "nics", description = "Allowed and assigned networks per interface")
    ),
    paths(
        // System
        handlers::get_version,
        handlers::get_controlplane_info,
        // Clusters
        handlers::create_cluster,
        handlers::list_clusters,
        handlers::get_cluster,
        handlers::set_cluster_nodes,
        handlers::delete_cluster,
        // Networks
        handlers::create_network,
        handlers::list_cluster_networks,
        handlers::list_networks,
        handlers::get_network,
        handlers::delete_network,
        // Nodes
        handlers::register_node,
        handlers::list_nodes,
        handlers::get_node,
        handlers::set_node_clusters,
        handlers::set_node_cluster,
        handlers::update_node_interfaces,
        handlers::deregister_node,
        // NICs
        handlers::get_node_nics,
        handlers::get_default_nics,
        handlers::list_allowed_networks,
        handlers::list_network_assignments,
    ),
    components(schemas(
        handlers::ApiError,
        handlers::VersionInfo,
        handlers::ControlplaneInfo,
        handlers::MembershipPeer,
        handlers::CreateClusterRequest,
        handlers::Cluster,
        handlers::SetClusterNodesRequest,
        handlers::DeleteClusterResponse,
        handlers::CreateNetworkRequest,
        handlers::Network,
        handlers::ListNetworksQuery,
        handlers::DeleteNetworkResponse,
        handlers::InterfaceRequest,
        handlers::RegisterNodeRequest,
        handlers::Interface,
        handlers::Node,
        handlers::ListNodesQuery,
        handlers::NodeClusterUpdate,
        handlers::SetNodeClusterRequest,
        handlers::DeregisterNodeResponse,
        handlers::NicNetwork,
        handlers::NodeNic,
        handlers::DefaultNic,
        handlers::RelationQuery,
        handlers::AllowedNetworks,
        handlers::NetworkAssignment,
    ))
)]
pub struct ApiDoc;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // System
        .route("/version", get(handlers::get_version))
        .route("/controlplane", get(handlers::get_controlplane_info))
        // Clusters
        .route("/clusters", get(handlers::list_clusters))
        .route("/clusters", post(handlers::create_cluster))
        .route("/clusters/{id}", get(handlers::get_cluster))
        .route("/clusters/{id}", delete(handlers::delete_cluster))
        .route("/clusters/{id}/nodes", put(handlers::set_cluster_nodes))
        .route(
            "/clusters/{id}/networks",
            get(handlers::list_cluster_networks),
        )
        .route("/clusters/{id}/networks", post(handlers::create_network))
        // Networks
        .route("/networks", get(handlers::list_networks))
        .route("/networks/{id}", get(handlers::get_network))
        .route("/networks/{id}", delete(handlers::delete_network))
        // Nodes
        .route("/nodes", get(handlers::list_nodes))
        .route("/nodes", post(handlers::register_node))
        .route("/nodes", put(handlers::set_node_clusters))
        .route("/nodes/{id}", get(handlers::get_node))
        .route("/nodes/{id}", delete(handlers::deregister_node))
        .route("/nodes/{id}/cluster", put(handlers::set_node_cluster))
        .route("/nodes/{id}/interfaces", get(handlers::get_node_nics))
        .route(
            "/nodes/{id}/interfaces",
            put(handlers::update_node_interfaces),
        )
        .route(
            "/nodes/{id}/interfaces/default",
            get(handlers::get_default_nics),
        )
        // Derived relations
        .route("/allowed-networks", get(handlers::list_allowed_networks))
        .route(
            "/network-assignments",
            get(handlers::list_network_assignments),
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_nic_queries() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for path in [
            "/v1/nodes/{id}/interfaces",
            "/v1/nodes/{id}/interfaces/default",
            "/v1/nodes/{id}/cluster",
            "/v1/clusters/{id}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == path),
                "missing {}",
                path
            );
        }
    }
}
