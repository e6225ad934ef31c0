//! Fabric state machine.

use lru::LruCache;
use mraft::StateMachine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use tracing::{debug, error};

use crate::assignment::{self, AssignmentError, Bindings, NodePlacement, Transition};
use crate::command::{
    AllowedNetworksData, ClusterData, Command, InterfaceData, InterfaceSpec, NetworkAssignmentData,
    NetworkData, NetworkRef, NetworkSpec, NodeClusterChange, NodeData, NodeNicData, Response,
};
use crate::store::Event;

/// Fabric state - replicated across all control plane members via Raft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricState {
    pub clusters: HashMap<String, ClusterData>,
    pub networks: HashMap<String, NetworkData>,
    pub nodes: HashMap<String, NodeData>,
    /// AllowedNetworks and NetworkAssignment rows
    pub bindings: Bindings,
    /// Idempotency cache for request deduplication
    #[serde(skip)]
    applied_requests: Option<LruCache<String, Response>>,
}

impl Default for FabricState {
    fn default() -> Self {
        Self {
            clusters: HashMap::new(),
            networks: HashMap::new(),
            nodes: HashMap::new(),
            bindings: Bindings::default(),
            applied_requests: Some(new_request_cache()),
        }
    }
}

fn new_request_cache() -> LruCache<String, Response> {
    LruCache::new(NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN))
}

/// A node membership change whose derived rows are already computed.
struct PlannedChange {
    old: NodeData,
    new: NodeData,
    placement: Option<NodePlacement>,
}

/// Catalog of a cluster changed by the command being applied, not yet stored.
type PendingCatalog<'a> = Option<(&'a str, &'a [NetworkData])>;

type Rejection = (u32, String);

impl FabricState {
    // =========================================================================
    // Cluster queries
    // =========================================================================

    /// Get a cluster by ID
    pub fn get_cluster(&self, id: &str) -> Option<&ClusterData> {
        self.clusters.get(id)
    }

    /// Get a cluster by name
    pub fn get_cluster_by_name(&self, name: &str) -> Option<&ClusterData> {
        self.clusters.values().find(|c| c.name == name)
    }

    /// List all clusters
    pub fn list_clusters(&self) -> Vec<&ClusterData> {
        self.clusters.values().collect()
    }

    /// Nodes that are members of a cluster
    pub fn cluster_nodes(&self, cluster_id: &str) -> Vec<&NodeData> {
        self.nodes
            .values()
            .filter(|n| n.cluster_id.as_deref() == Some(cluster_id))
            .collect()
    }

    /// A cluster's network catalog in insertion order
    pub fn catalog(&self, cluster_id: &str) -> Vec<NetworkData> {
        self.clusters
            .get(cluster_id)
            .map(|c| {
                c.network_ids
                    .iter()
                    .filter_map(|id| self.networks.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Network queries
    // =========================================================================

    /// Get a network by ID
    pub fn get_network(&self, id: &str) -> Option<&NetworkData> {
        self.networks.get(id)
    }

    /// List networks, optionally only one cluster's catalog
    pub fn list_networks(&self, cluster_id: Option<&str>) -> Vec<&NetworkData> {
        match cluster_id {
            Some(cid) => self
                .clusters
                .get(cid)
                .map(|c| {
                    c.network_ids
                        .iter()
                        .filter_map(|id| self.networks.get(id))
                        .collect()
                })
                .unwrap_or_default(),
            None => self.networks.values().collect(),
        }
    }

    // =========================================================================
    // Node queries
    // =========================================================================

    /// Get a node by ID
    pub fn get_node(&self, id: &str) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Get a node by name
    pub fn get_node_by_name(&self, name: &str) -> Option<&NodeData> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// List all nodes, optionally filtered by cluster
    pub fn list_nodes(&self, cluster_id: Option<&str>) -> Vec<&NodeData> {
        match cluster_id {
            Some(cid) => self.cluster_nodes(cid),
            None => self.nodes.values().collect(),
        }
    }

    /// A node's interfaces with their assigned and allowed networks
    pub fn node_nics(&self, node_id: &str) -> Option<Vec<NodeNicData>> {
        let node = self.nodes.get(node_id)?;
        let primary = assignment::primary_interface(node).map(|i| i.id.as_str());

        let refs = |ids: Vec<&str>| -> Vec<NetworkRef> {
            ids.into_iter()
                .filter_map(|id| self.networks.get(id))
                .map(NetworkData::to_ref)
                .collect()
        };

        Some(
            node.interfaces
                .iter()
                .map(|iface| NodeNicData {
                    interface_id: iface.id.clone(),
                    name: iface.name.clone(),
                    mac: iface.mac.clone(),
                    is_primary: primary == Some(iface.id.as_str()),
                    assigned_networks: refs(self.bindings.assigned_on(&iface.id)),
                    allowed_networks: refs(self.bindings.allowed_on(&iface.id)),
                })
                .collect(),
        )
    }

    /// A node's interfaces as discovered, independent of any cluster
    pub fn default_nics(&self, node_id: &str) -> Option<&[InterfaceData]> {
        self.nodes.get(node_id).map(|n| n.interfaces.as_slice())
    }

    // =========================================================================
    // Derived relation queries
    // =========================================================================

    pub fn list_allowed_networks(&self) -> &[AllowedNetworksData] {
        self.bindings.allowed_rows()
    }

    pub fn list_network_assignments(&self) -> &[NetworkAssignmentData] {
        self.bindings.assignment_rows()
    }

    /// Ensure the idempotency cache is initialized (after deserialization)
    fn ensure_cache(&mut self) {
        if self.applied_requests.is_none() {
            self.applied_requests = Some(new_request_cache());
        }
    }

    // =========================================================================
    // Membership reconciliation
    // =========================================================================

    /// Compute the new node records and derived rows for a set of membership changes.
    ///
    /// Nothing is written: if any node cannot be placed the whole command is rejected.
    fn plan_changes(
        &self,
        changes: &[NodeClusterChange],
        timestamp: &str,
        pending: PendingCatalog<'_>,
    ) -> Result<Vec<PlannedChange>, Rejection> {
        let mut planned = Vec::with_capacity(changes.len());

        for (i, change) in changes.iter().enumerate() {
            if changes[..i].iter().any(|c| c.node_id == change.node_id) {
                return Err((400, format!("Node '{}' listed twice", change.node_id)));
            }

            let Some(old) = self.nodes.get(&change.node_id) else {
                return Err((404, format!("Node '{}' not found", change.node_id)));
            };

            let target = change.cluster_id.as_deref();
            let transition = Transition::between(old.cluster_id.as_deref(), target);

            let mut new = old.clone();
            if old.cluster_id != change.cluster_id {
                new.cluster_id = change.cluster_id.clone();
                new.updated_at = timestamp.to_string();
            }

            let placement = match transition.target() {
                Some(cluster_id) => {
                    let catalog = match pending {
                        Some((pending_id, catalog)) if pending_id == cluster_id => catalog.to_vec(),
                        _ if self.clusters.contains_key(cluster_id) => self.catalog(cluster_id),
                        _ => return Err((404, format!("Cluster '{}' not found", cluster_id))),
                    };
                    Some(assignment::place(&new, &catalog).map_err(inconsistent)?)
                }
                None => None,
            };

            planned.push(PlannedChange {
                old: old.clone(),
                new,
                placement,
            });
        }

        Ok(planned)
    }

    /// Write planned changes. Returns the updated nodes and the emitted events.
    fn commit_changes(&mut self, planned: Vec<PlannedChange>) -> (Vec<NodeData>, Vec<Event>) {
        let mut nodes = Vec::with_capacity(planned.len());
        let mut events = Vec::new();

        for PlannedChange { old, new, placement } in planned {
            let node_id = new.id.clone();
            let transition = Transition::between(old.cluster_id.as_deref(), new.cluster_id.as_deref());

            if let Some(cluster_id) = transition.left() {
                events.push(Event::NodeLeftCluster {
                    node_id: node_id.clone(),
                    cluster_id: cluster_id.to_string(),
                });
            }

            match placement {
                Some(placement) => {
                    let allowed_rows = placement.allowed.len();
                    let assigned_rows = placement.assignments.len();
                    self.bindings.replace(placement);
                    if let Some(cluster_id) = transition.target() {
                        if !matches!(transition, Transition::Refresh { .. }) {
                            events.push(Event::NodeJoinedCluster {
                                node_id: node_id.clone(),
                                cluster_id: cluster_id.to_string(),
                            });
                        }
                        events.push(Event::NetworksPlaced {
                            node_id: node_id.clone(),
                            cluster_id: cluster_id.to_string(),
                            allowed_rows,
                            assigned_rows,
                        });
                    }
                }
                None => {
                    let rows_removed = self.bindings.clear(&node_id);
                    if rows_removed > 0 {
                        events.push(Event::NetworksCleared {
                            node_id: node_id.clone(),
                            rows_removed,
                        });
                    }
                }
            }

            if old != new {
                events.push(Event::NodeUpdated {
                    id: node_id.clone(),
                    old,
                    new: new.clone(),
                });
            }

            self.nodes.insert(node_id, new.clone());
            nodes.push(new);
        }

        (nodes, events)
    }

    /// Rebuild every member of a cluster against a changed catalog.
    fn refresh_members(
        &self,
        cluster_id: &str,
        catalog: &[NetworkData],
        timestamp: &str,
    ) -> Result<Vec<PlannedChange>, Rejection> {
        let changes = member_changes(self.cluster_nodes(cluster_id), Some(cluster_id));
        self.plan_changes(&changes, timestamp, Some((cluster_id, catalog)))
    }
}

/// Keep every listed node in (or move it to) `cluster_id`.
fn member_changes(nodes: Vec<&NodeData>, cluster_id: Option<&str>) -> Vec<NodeClusterChange> {
    let mut changes: Vec<NodeClusterChange> = nodes
        .into_iter()
        .map(|n| NodeClusterChange {
            node_id: n.id.clone(),
            cluster_id: cluster_id.map(str::to_string),
        })
        .collect();
    // Deterministic event order across Raft members
    changes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
    changes
}

fn inconsistent(err: AssignmentError) -> Rejection {
    error!(error = %err, "network placement is inconsistent");
    (500, format!("Inconsistent network placement: {}", err))
}

fn reject(code: u32, message: String) -> (Response, Vec<Event>) {
    (Response::Error { code, message }, vec![])
}

fn validate_interfaces(interfaces: &[InterfaceSpec]) -> Result<(), String> {
    for (i, iface) in interfaces.iter().enumerate() {
        if iface.name.is_empty() {
            return Err("Interface name must not be empty".to_string());
        }
        if iface.mac.is_empty() {
            return Err(format!("Interface '{}' has no MAC address", iface.name));
        }
        for other in &interfaces[..i] {
            if other.name == iface.name {
                return Err(format!("Duplicate interface name '{}'", iface.name));
            }
            if other.mac.eq_ignore_ascii_case(&iface.mac) {
                return Err(format!("Duplicate interface MAC '{}'", iface.mac));
            }
        }
    }
    Ok(())
}

fn validate_network(spec: &NetworkSpec) -> Result<(), String> {
    if spec.name.is_empty() {
        return Err("Network name must not be empty".to_string());
    }
    if let Some(vlan) = spec.vlan_id
        && !(1..=4094).contains(&vlan)
    {
        return Err(format!("Network '{}' has invalid VLAN {}", spec.name, vlan));
    }
    Ok(())
}

fn network_from_spec(spec: NetworkSpec, cluster_id: &str, timestamp: &str) -> NetworkData {
    NetworkData {
        id: spec.id,
        cluster_id: cluster_id.to_string(),
        name: spec.name,
        vlan_id: spec.vlan_id,
        cidr: spec.cidr,
        bound_macs: spec.bound_macs,
        created_at: timestamp.to_string(),
    }
}

impl StateMachine<Command, Response> for FabricState {
    type Event = Event;

    fn apply(&mut self, cmd: Command) -> (Response, Vec<Self::Event>) {
        self.ensure_cache();

        // Check idempotency cache
        if let Some(cache) = &self.applied_requests
            && let Some(response) = cache.peek(cmd.request_id())
        {
            return (response.clone(), vec![]);
        }

        let (response, events) = match cmd.clone() {
            // =================================================================
            // Cluster Commands
            // =================================================================
            Command::CreateCluster {
                id,
                timestamp,
                name,
                networks,
                node_ids,
                ..
            } => {
                // Check for duplicate name
                if self.clusters.values().any(|c| c.name == name) {
                    return reject(409, format!("Cluster with name '{}' already exists", name));
                }

                // Check for duplicate ID (idempotency)
                if let Some(existing) = self.clusters.get(&id) {
                    return (Response::Cluster(existing.clone()), vec![]);
                }

                for (i, spec) in networks.iter().enumerate() {
                    if let Err(message) = validate_network(spec) {
                        return reject(400, message);
                    }
                    if networks[..i].iter().any(|n| n.name == spec.name) {
                        return reject(409, format!("Duplicate network name '{}'", spec.name));
                    }
                    if self.networks.contains_key(&spec.id) {
                        return reject(409, format!("Network '{}' already exists", spec.id));
                    }
                }

                let catalog: Vec<NetworkData> = networks
                    .into_iter()
                    .map(|spec| network_from_spec(spec, &id, &timestamp))
                    .collect();

                let changes: Vec<NodeClusterChange> = node_ids
                    .iter()
                    .map(|node_id| NodeClusterChange {
                        node_id: node_id.clone(),
                        cluster_id: Some(id.clone()),
                    })
                    .collect();
                let pending = Some((id.as_str(), catalog.as_slice()));
                let planned = match self.plan_changes(&changes, &timestamp, pending) {
                    Ok(planned) => planned,
                    Err((code, message)) => return reject(code, message),
                };

                let cluster = ClusterData {
                    id: id.clone(),
                    name,
                    network_ids: catalog.iter().map(|n| n.id.clone()).collect(),
                    created_at: timestamp.clone(),
                    updated_at: timestamp,
                };
                self.clusters.insert(id, cluster.clone());

                let mut events = vec![Event::ClusterCreated(cluster.clone())];
                for network in catalog {
                    self.networks.insert(network.id.clone(), network.clone());
                    events.push(Event::NetworkCreated(network));
                }

                let (_, node_events) = self.commit_changes(planned);
                events.extend(node_events);

                (Response::Cluster(cluster), events)
            }

            Command::SetClusterNodes {
                cluster_id,
                timestamp,
                node_ids,
                ..
            } => {
                if !self.clusters.contains_key(&cluster_id) {
                    return reject(404, format!("Cluster '{}' not found", cluster_id));
                }

                // Members missing from the new list leave, listed nodes join.
                let mut changes: Vec<NodeClusterChange> = self
                    .cluster_nodes(&cluster_id)
                    .into_iter()
                    .filter(|n| !node_ids.contains(&n.id))
                    .map(|n| NodeClusterChange {
                        node_id: n.id.clone(),
                        cluster_id: None,
                    })
                    .collect();
                changes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
                changes.extend(node_ids.iter().map(|node_id| NodeClusterChange {
                    node_id: node_id.clone(),
                    cluster_id: Some(cluster_id.clone()),
                }));

                let planned = match self.plan_changes(&changes, &timestamp, None) {
                    Ok(planned) => planned,
                    Err((code, message)) => return reject(code, message),
                };
                let (_, events) = self.commit_changes(planned);

                match self.clusters.get_mut(&cluster_id) {
                    Some(cluster) => {
                        cluster.updated_at = timestamp;
                        (Response::Cluster(cluster.clone()), events)
                    }
                    None => reject(404, format!("Cluster '{}' not found", cluster_id)),
                }
            }

            Command::DeleteCluster { id, timestamp, .. } => {
                if !self.clusters.contains_key(&id) {
                    return reject(404, format!("Cluster '{}' not found", id));
                }

                // Every member leaves before the cluster goes away.
                let changes = member_changes(self.cluster_nodes(&id), None);
                let planned = match self.plan_changes(&changes, &timestamp, None) {
                    Ok(planned) => planned,
                    Err((code, message)) => return reject(code, message),
                };
                let (released, mut events) = self.commit_changes(planned);

                if let Some(cluster) = self.clusters.remove(&id) {
                    for network_id in &cluster.network_ids {
                        self.networks.remove(network_id);
                    }
                }
                let released_nodes: Vec<String> = released.into_iter().map(|n| n.id).collect();
                let nodes_released = released_nodes.len() as u32;
                events.push(Event::ClusterDeleted {
                    id: id.clone(),
                    released_nodes,
                });

                (Response::ClusterDeleted { id, nodes_released }, events)
            }

            // =================================================================
            // Network Commands
            // =================================================================
            Command::CreateNetwork {
                timestamp,
                cluster_id,
                network,
                ..
            } => {
                if !self.clusters.contains_key(&cluster_id) {
                    return reject(404, format!("Cluster '{}' not found", cluster_id));
                }
                if let Err(message) = validate_network(&network) {
                    return reject(400, message);
                }

                // Check for duplicate name within the catalog
                if self
                    .list_networks(Some(cluster_id.as_str()))
                    .iter()
                    .any(|n| n.name == network.name)
                {
                    return reject(
                        409,
                        format!("Network with name '{}' already exists", network.name),
                    );
                }

                // Check for duplicate ID (idempotency)
                if let Some(existing) = self.networks.get(&network.id) {
                    return (Response::Network(existing.clone()), vec![]);
                }

                let network = network_from_spec(network, &cluster_id, &timestamp);
                let mut catalog = self.catalog(&cluster_id);
                catalog.push(network.clone());

                let planned = match self.refresh_members(&cluster_id, &catalog, &timestamp) {
                    Ok(planned) => planned,
                    Err((code, message)) => return reject(code, message),
                };

                self.networks.insert(network.id.clone(), network.clone());
                if let Some(cluster) = self.clusters.get_mut(&cluster_id) {
                    cluster.network_ids.push(network.id.clone());
                    cluster.updated_at = timestamp;
                }

                let mut events = vec![Event::NetworkCreated(network.clone())];
                let (_, node_events) = self.commit_changes(planned);
                events.extend(node_events);

                (Response::Network(network), events)
            }

            Command::DeleteNetwork { id, timestamp, .. } => {
                let Some(network) = self.networks.get(&id).cloned() else {
                    return reject(404, format!("Network '{}' not found", id));
                };
                let cluster_id = network.cluster_id;

                let catalog: Vec<NetworkData> = self
                    .catalog(&cluster_id)
                    .into_iter()
                    .filter(|n| n.id != id)
                    .collect();

                let planned = match self.refresh_members(&cluster_id, &catalog, &timestamp) {
                    Ok(planned) => planned,
                    Err((code, message)) => return reject(code, message),
                };

                self.networks.remove(&id);
                if let Some(cluster) = self.clusters.get_mut(&cluster_id) {
                    cluster.network_ids.retain(|n| n != &id);
                    cluster.updated_at = timestamp;
                }

                let (_, mut events) = self.commit_changes(planned);
                events.push(Event::NetworkDeleted {
                    id: id.clone(),
                    cluster_id,
                });

                (Response::Deleted { id }, events)
            }

            // =================================================================
            // Node Commands
            // =================================================================
            Command::RegisterNode {
                id,
                timestamp,
                name,
                mac,
                interfaces,
                cluster_id,
                ..
            } => {
                // Check for duplicate name
                if self.nodes.values().any(|n| n.name == name) {
                    return reject(409, format!("Node with name '{}' already exists", name));
                }

                // Check for duplicate ID (idempotency)
                if let Some(existing) = self.nodes.get(&id) {
                    return (Response::Node(existing.clone()), vec![]);
                }

                if mac.is_empty() {
                    return reject(400, "Node registration MAC must not be empty".to_string());
                }
                if let Err(message) = validate_interfaces(&interfaces) {
                    return reject(400, message);
                }

                let node = NodeData {
                    id: id.clone(),
                    name,
                    mac,
                    cluster_id: cluster_id.clone(),
                    interfaces: interfaces.into_iter().map(InterfaceData::from).collect(),
                    created_at: timestamp.clone(),
                    updated_at: timestamp,
                };

                let placement = match cluster_id.as_deref() {
                    Some(cid) if self.clusters.contains_key(cid) => {
                        match assignment::place(&node, &self.catalog(cid)) {
                            Ok(placement) => Some(placement),
                            Err(err) => {
                                let (code, message) = inconsistent(err);
                                return reject(code, message);
                            }
                        }
                    }
                    Some(cid) => return reject(404, format!("Cluster '{}' not found", cid)),
                    None => None,
                };

                self.nodes.insert(id.clone(), node.clone());
                let mut events = vec![Event::NodeRegistered(node.clone())];

                if let (Some(cid), Some(placement)) = (cluster_id, placement) {
                    events.push(Event::NodeJoinedCluster {
                        node_id: id.clone(),
                        cluster_id: cid.clone(),
                    });
                    events.push(Event::NetworksPlaced {
                        node_id: id,
                        cluster_id: cid,
                        allowed_rows: placement.allowed.len(),
                        assigned_rows: placement.assignments.len(),
                    });
                    self.bindings.replace(placement);
                }

                (Response::Node(node), events)
            }

            Command::SetNodeClusters {
                timestamp, changes, ..
            } => match self.plan_changes(&changes, &timestamp, None) {
                Ok(planned) => {
                    let (nodes, events) = self.commit_changes(planned);
                    (Response::Nodes(nodes), events)
                }
                Err((code, message)) => reject(code, message),
            },

            Command::UpdateNodeInterfaces {
                node_id,
                timestamp,
                interfaces,
                ..
            } => {
                let Some(old) = self.nodes.get(&node_id).cloned() else {
                    return reject(404, format!("Node '{}' not found", node_id));
                };
                if let Err(message) = validate_interfaces(&interfaces) {
                    return reject(400, message);
                }

                let mut new = old.clone();
                new.interfaces = interfaces.into_iter().map(InterfaceData::from).collect();
                new.updated_at = timestamp;

                let placement = match new.cluster_id.as_deref() {
                    Some(cid) => match assignment::place(&new, &self.catalog(cid)) {
                        Ok(placement) => Some(placement),
                        Err(err) => {
                            let (code, message) = inconsistent(err);
                            return reject(code, message);
                        }
                    },
                    None => None,
                };

                let (nodes, events) = self.commit_changes(vec![PlannedChange {
                    old,
                    new,
                    placement,
                }]);
                match nodes.into_iter().next() {
                    Some(node) => (Response::Node(node), events),
                    None => reject(500, format!("Node '{}' was not updated", node_id)),
                }
            }

            Command::DeregisterNode { node_id, .. } => match self.nodes.remove(&node_id) {
                Some(node) => {
                    let rows_removed = self.bindings.clear(&node_id);
                    let mut events = Vec::new();
                    if let Some(cluster_id) = node.cluster_id {
                        events.push(Event::NodeLeftCluster {
                            node_id: node_id.clone(),
                            cluster_id,
                        });
                    }
                    if rows_removed > 0 {
                        events.push(Event::NetworksCleared {
                            node_id: node_id.clone(),
                            rows_removed,
                        });
                    }
                    events.push(Event::NodeDeregistered {
                        id: node_id.clone(),
                    });
                    (Response::Deleted { id: node_id }, events)
                }
                None => reject(404, format!("Node '{}' not found", node_id)),
            },
        };

        debug!(
            request_id = cmd.request_id(),
            events = events.len(),
            "applied command"
        );

        // Cache the response
        if let Some(cache) = &mut self.applied_requests {
            cache.put(cmd.request_id().to_string(), response.clone());
        }

        (response, events)
    }
}
