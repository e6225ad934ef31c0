//! Shared test utilities for mvirt-fabric integration tests.

use mraft::{NodeConfig, RaftNode, StorageBackend};
use mvirt_fabric::rest::{AppState, create_router};
use mvirt_fabric::store::{Event, RaftStore};
use mvirt_fabric::{Command, FabricAuditLogger, FabricConfig, FabricState, Response};
use reqwest::{Client, Response as ReqwestResponse};
use serde::Serialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, broadcast};

/// Allocate an available port for testing.
pub fn allocate_port() -> u16 {
    portpicker::pick_unused_port().expect("No available port")
}

/// Test server wrapper that manages a single-node control plane with REST API.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub raft_node: Arc<RwLock<RaftNode<Command, Response, FabricState>>>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    /// Spawn a single-node test server with in-memory storage.
    pub async fn spawn() -> Self {
        let raft_port = allocate_port();
        let node_id = 1u64;

        let config = NodeConfig {
            id: node_id,
            listen_addr: format!("127.0.0.1:{}", raft_port),
            peers: std::collections::BTreeMap::new(),
            storage: StorageBackend::Memory,
            raft_config: None,
        };

        let mut node: RaftNode<Command, Response, FabricState> =
            RaftNode::new(config).await.expect("Failed to create node");
        node.start().await.expect("Failed to start node");

        node.generate_cluster_secret();
        node.initialize_cluster()
            .await
            .expect("Failed to bootstrap control plane");

        node.wait_for_leader(std::time::Duration::from_secs(5))
            .await
            .expect("No leader elected");

        let (event_tx, _) = broadcast::channel::<Event>(256);
        node.set_event_sink(event_tx.clone());

        let node = Arc::new(RwLock::new(node));
        let store = Arc::new(RaftStore::new(node.clone(), event_tx, node_id));

        // Noop audit logger, built-in default catalog
        let app_state = Arc::new(AppState {
            store,
            audit: Arc::new(FabricAuditLogger::new_noop()),
            node_id,
            config: FabricConfig::default(),
        });

        let router = create_router(app_state);

        // Use port 0 to let the OS choose an available port
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
        let actual_addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        // Small delay to ensure server is ready
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        Self {
            addr: actual_addr,
            client: Client::new(),
            raft_node: node,
            shutdown_tx,
        }
    }

    /// Get base URL for the REST API.
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Perform a GET request.
    pub async fn get(&self, path: &str) -> ReqwestResponse {
        self.client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform a POST request with JSON body.
    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> ReqwestResponse {
        self.client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform a PUT request with JSON body.
    pub async fn put_json<T: Serialize>(&self, path: &str, body: &T) -> ReqwestResponse {
        self.client
            .put(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform a DELETE request.
    pub async fn delete(&self, path: &str) -> ReqwestResponse {
        self.client
            .delete(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Register a node with `(name, mac)` interfaces and return its JSON.
    pub async fn register_node(
        &self,
        name: &str,
        mac: &str,
        interfaces: &[(&str, &str)],
        cluster_id: Option<&str>,
    ) -> Value {
        let interfaces: Vec<Value> = interfaces
            .iter()
            .map(|(name, mac)| json!({ "name": name, "mac": mac }))
            .collect();
        let response = self
            .post_json(
                "/nodes",
                &json!({
                    "name": name,
                    "mac": mac,
                    "interfaces": interfaces,
                    "cluster_id": cluster_id,
                }),
            )
            .await;
        assert_eq!(response.status(), 200, "register_node {}", name);
        response.json().await.unwrap()
    }

    /// Create a cluster and return its JSON.
    pub async fn create_cluster(&self, body: &Value) -> Value {
        let response = self.post_json("/clusters", body).await;
        assert_eq!(response.status(), 200, "create_cluster {}", body);
        response.json().await.unwrap()
    }

    /// `GET /nodes/{id}/interfaces` as a JSON array.
    pub async fn node_nics(&self, node_id: &str) -> Vec<Value> {
        let response = self.get(&format!("/nodes/{}/interfaces", node_id)).await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        body.as_array().cloned().unwrap_or_default()
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let mut node = self.raft_node.write().await;
        let _ = node.shutdown().await;
    }
}
