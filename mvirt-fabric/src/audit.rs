use std::sync::Arc;
use tracing::info;

/// Severity of an audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Audit,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Audit => "audit",
        }
    }
}

/// Fabric audit logger
///
/// Records go to the `audit` tracing target so they can be filtered or routed separately
/// (`RUST_LOG=audit=info`).
pub struct FabricAuditLogger {
    component: String,
    enabled: bool,
}

impl FabricAuditLogger {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            enabled: true,
        }
    }

    pub fn new_noop() -> Self {
        Self {
            component: String::new(),
            enabled: false,
        }
    }

    fn log(&self, level: LogLevel, message: String, object_ids: Vec<String>) {
        if !self.enabled {
            return;
        }
        info!(
            target: "audit",
            component = %self.component,
            level = level.as_str(),
            objects = ?object_ids,
            "{}",
            message
        );
    }

    // Control plane events
    pub fn leader_elected(&self, node_id: u64, term: u64) {
        self.log(
            LogLevel::Info,
            format!("Leader elected: node {} for term {}", node_id, term),
            vec![format!("node-{}", node_id)],
        );
    }

    // Cluster events
    pub fn cluster_created(&self, cluster_id: &str, cluster_name: &str) {
        self.log(
            LogLevel::Audit,
            format!("Cluster created: {} ({})", cluster_name, cluster_id),
            vec![cluster_id.to_string()],
        );
    }

    pub fn cluster_nodes_set(&self, cluster_id: &str, node_count: usize) {
        self.log(
            LogLevel::Audit,
            format!("Cluster {} members set: {} nodes", cluster_id, node_count),
            vec![cluster_id.to_string()],
        );
    }

    pub fn cluster_deleted(&self, cluster_id: &str, nodes_released: u32) {
        self.log(
            LogLevel::Audit,
            format!(
                "Cluster deleted: {} ({} nodes released)",
                cluster_id, nodes_released
            ),
            vec![cluster_id.to_string()],
        );
    }

    // Network events
    pub fn network_created(&self, network_id: &str, network_name: &str, cluster_id: &str) {
        self.log(
            LogLevel::Audit,
            format!(
                "Network created: {} ({}) in cluster {}",
                network_name, network_id, cluster_id
            ),
            vec![network_id.to_string(), cluster_id.to_string()],
        );
    }

    pub fn network_deleted(&self, network_id: &str) {
        self.log(
            LogLevel::Audit,
            format!("Network deleted: {}", network_id),
            vec![network_id.to_string()],
        );
    }

    // Node events
    pub fn node_registered(&self, node_id: &str, node_name: &str) {
        self.log(
            LogLevel::Audit,
            format!("Node registered: {} ({})", node_name, node_id),
            vec![node_id.to_string()],
        );
    }

    pub fn node_cluster_changed(&self, node_id: &str, cluster_id: Option<&str>) {
        let message = match cluster_id {
            Some(cluster_id) => format!("Node {} assigned to cluster {}", node_id, cluster_id),
            None => format!("Node {} removed from its cluster", node_id),
        };
        let mut object_ids = vec![node_id.to_string()];
        object_ids.extend(cluster_id.map(str::to_string));
        self.log(LogLevel::Audit, message, object_ids);
    }

    pub fn node_interfaces_updated(&self, node_id: &str, interface_count: usize) {
        self.log(
            LogLevel::Audit,
            format!(
                "Node {} interfaces updated: {} interfaces",
                node_id, interface_count
            ),
            vec![node_id.to_string()],
        );
    }

    pub fn node_deregistered(&self, node_id: &str) {
        self.log(
            LogLevel::Audit,
            format!("Node deregistered: {}", node_id),
            vec![node_id.to_string()],
        );
    }
}

pub fn create_audit_logger(component: &str) -> Arc<FabricAuditLogger> {
    Arc::new(FabricAuditLogger::new(component))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_logger_doesnt_panic() {
        let logger = FabricAuditLogger::new_noop();

        // Call all methods - none should panic
        logger.leader_elected(1, 1);
        logger.cluster_created("cluster-1", "env");
        logger.cluster_nodes_set("cluster-1", 2);
        logger.cluster_deleted("cluster-1", 2);
        logger.network_created("net-1", "management", "cluster-1");
        logger.network_deleted("net-1");
        logger.node_registered("node-1", "node-1");
        logger.node_cluster_changed("node-1", Some("cluster-1"));
        logger.node_cluster_changed("node-1", None);
        logger.node_interfaces_updated("node-1", 2);
        logger.node_deregistered("node-1");
    }

    #[test]
    fn test_logger_without_subscriber() {
        let logger = create_audit_logger("fabric");
        logger.cluster_created("cluster-1", "env");
    }
}
