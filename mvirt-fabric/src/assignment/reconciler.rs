//! Membership reconciler - keeps the derived relations in step with cluster membership.

use serde::{Deserialize, Serialize};

use crate::command::{AllowedNetworksData, NetworkAssignmentData, NetworkData, NodeData};

use super::error::AssignmentError;
use super::planner::plan;
use super::resolver::resolve;
use super::NetworkMap;

/// How a node's cluster membership changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<'a> {
    /// Node stays outside any cluster.
    Unchanged,
    Join { cluster_id: &'a str },
    Leave { cluster_id: &'a str },
    /// Leave `from`, then join `to`.
    Move { from: &'a str, to: &'a str },
    /// Node stays in the same cluster; its rows are rebuilt.
    Refresh { cluster_id: &'a str },
}

impl<'a> Transition<'a> {
    pub fn between(current: Option<&'a str>, target: Option<&'a str>) -> Self {
        match (current, target) {
            (None, None) => Transition::Unchanged,
            (None, Some(to)) => Transition::Join { cluster_id: to },
            (Some(from), None) => Transition::Leave { cluster_id: from },
            (Some(from), Some(to)) if from == to => Transition::Refresh { cluster_id: to },
            (Some(from), Some(to)) => Transition::Move { from, to },
        }
    }

    /// Cluster whose catalog has to be placed once the transition is done.
    pub fn target(&self) -> Option<&'a str> {
        match *self {
            Transition::Join { cluster_id } | Transition::Refresh { cluster_id } => Some(cluster_id),
            Transition::Move { to, .. } => Some(to),
            Transition::Unchanged | Transition::Leave { .. } => None,
        }
    }

    /// Cluster the node is removed from, if any.
    pub fn left(&self) -> Option<&'a str> {
        match *self {
            Transition::Leave { cluster_id } => Some(cluster_id),
            Transition::Move { from, .. } => Some(from),
            _ => None,
        }
    }
}

/// Derived rows for one node, computed before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePlacement {
    pub node_id: String,
    pub allowed: Vec<AllowedNetworksData>,
    pub assignments: Vec<NetworkAssignmentData>,
}

/// Resolve, plan and verify the rows of `node` for `catalog`.
///
/// Rows follow the node's interface discovery order. Nothing is persisted here; callers
/// compute the placements of every affected node first and only then write them.
pub fn place(node: &NodeData, catalog: &[NetworkData]) -> Result<NodePlacement, AssignmentError> {
    let allowed = resolve(node, catalog);
    let assigned = plan(node, catalog, &allowed)?;
    verify(node, catalog, &allowed, &assigned)?;

    let mut placement = NodePlacement {
        node_id: node.id.clone(),
        ..Default::default()
    };
    for iface in &node.interfaces {
        if let Some(network_ids) = allowed.get(&iface.id) {
            placement.allowed.push(AllowedNetworksData {
                node_id: node.id.clone(),
                interface_id: iface.id.clone(),
                network_ids: network_ids.clone(),
            });
        }
        if let Some(network_ids) = assigned.get(&iface.id) {
            placement
                .assignments
                .extend(network_ids.iter().map(|network_id| NetworkAssignmentData {
                    node_id: node.id.clone(),
                    interface_id: iface.id.clone(),
                    network_id: network_id.clone(),
                }));
        }
    }

    Ok(placement)
}

fn verify(
    node: &NodeData,
    catalog: &[NetworkData],
    allowed: &NetworkMap,
    assigned: &NetworkMap,
) -> Result<(), AssignmentError> {
    for interface_id in allowed.keys().chain(assigned.keys()) {
        if !node.interfaces.iter().any(|i| &i.id == interface_id) {
            return Err(AssignmentError::UnknownReference {
                node_id: node.id.clone(),
                kind: "interface",
                id: interface_id.clone(),
            });
        }
    }

    for (interface_id, network_ids) in assigned {
        for network_id in network_ids {
            if !catalog.iter().any(|n| &n.id == network_id) {
                return Err(AssignmentError::UnknownReference {
                    node_id: node.id.clone(),
                    kind: "network",
                    id: network_id.clone(),
                });
            }
            let permitted = allowed
                .get(interface_id)
                .is_some_and(|networks| networks.contains(network_id));
            if !permitted {
                return Err(AssignmentError::OutsideAllowance {
                    network_id: network_id.clone(),
                    interface_id: interface_id.clone(),
                });
            }
        }
    }

    // A node without interfaces cannot host anything.
    if node.interfaces.is_empty() {
        return Ok(());
    }

    for network in catalog {
        let count = assigned
            .values()
            .flatten()
            .filter(|id| **id == network.id)
            .count();
        match count {
            1 => {}
            0 => {
                return Err(AssignmentError::Unassigned {
                    node_id: node.id.clone(),
                    network_id: network.id.clone(),
                });
            }
            count => {
                return Err(AssignmentError::DuplicateAssignment {
                    node_id: node.id.clone(),
                    network_id: network.id.clone(),
                    count,
                });
            }
        }
    }

    Ok(())
}

/// The AllowedNetworks and NetworkAssignment relations.
///
/// Rows of a node are only ever replaced or cleared together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bindings {
    allowed: Vec<AllowedNetworksData>,
    assignments: Vec<NetworkAssignmentData>,
}

impl Bindings {
    pub fn allowed_rows(&self) -> &[AllowedNetworksData] {
        &self.allowed
    }

    pub fn assignment_rows(&self) -> &[NetworkAssignmentData] {
        &self.assignments
    }

    /// Network IDs allowed on an interface, in catalog order.
    pub fn allowed_on(&self, interface_id: &str) -> Vec<&str> {
        self.allowed
            .iter()
            .filter(|row| row.interface_id == interface_id)
            .flat_map(|row| row.network_ids.iter().map(String::as_str))
            .collect()
    }

    /// Network IDs assigned to an interface, in catalog order.
    pub fn assigned_on(&self, interface_id: &str) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|row| row.interface_id == interface_id)
            .map(|row| row.network_id.as_str())
            .collect()
    }

    /// Drop the node's rows and write the new placement in their place.
    pub fn replace(&mut self, placement: NodePlacement) {
        self.clear(&placement.node_id);
        self.allowed.extend(placement.allowed);
        self.assignments.extend(placement.assignments);
    }

    /// Remove every row of a node. Returns the number of rows removed.
    pub fn clear(&mut self, node_id: &str) -> usize {
        let before = self.allowed.len() + self.assignments.len();
        self.allowed.retain(|row| row.node_id != node_id);
        self.assignments.retain(|row| row.node_id != node_id);
        before - (self.allowed.len() + self.assignments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::fixtures::{network, node};
    use crate::command::InterfaceData;

    #[test]
    fn test_transition_between() {
        assert_eq!(Transition::between(None, None), Transition::Unchanged);
        assert_eq!(
            Transition::between(None, Some("a")),
            Transition::Join { cluster_id: "a" }
        );
        assert_eq!(
            Transition::between(Some("a"), None),
            Transition::Leave { cluster_id: "a" }
        );
        assert_eq!(
            Transition::between(Some("a"), Some("a")),
            Transition::Refresh { cluster_id: "a" }
        );
        let moved = Transition::between(Some("a"), Some("b"));
        assert_eq!(moved, Transition::Move { from: "a", to: "b" });
        assert_eq!(moved.left(), Some("a"));
        assert_eq!(moved.target(), Some("b"));
    }

    #[test]
    fn test_place_rows_follow_discovery_order() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("management", &[]), network("storage", &["654"])];

        let placement = place(&node, &catalog).unwrap();

        let allowed: Vec<_> = placement.allowed.iter().map(|r| r.interface_id.as_str()).collect();
        assert_eq!(allowed, vec!["if-eth0", "if-eth1"]);
        assert_eq!(placement.assignments.len(), 2);
        assert_eq!(placement.assignments[0].interface_id, "if-eth0");
        assert_eq!(placement.assignments[0].network_id, "management");
        assert_eq!(placement.assignments[1].interface_id, "if-eth1");
        assert_eq!(placement.assignments[1].network_id, "storage");
    }

    #[test]
    fn test_replace_is_idempotent() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("management", &[]), network("public", &[])];
        let mut bindings = Bindings::default();

        bindings.replace(place(&node, &catalog).unwrap());
        let first = bindings.clone();
        bindings.replace(place(&node, &catalog).unwrap());

        assert_eq!(bindings.allowed_rows(), first.allowed_rows());
        assert_eq!(bindings.assignment_rows(), first.assignment_rows());
        assert_eq!(bindings.assignment_rows().len(), 2);
    }

    #[test]
    fn test_clear_only_touches_one_node() {
        let mut other = node("abc", &[("eth0", "abc")]);
        other.id = "node-2".to_string();
        other.interfaces[0].id = "if-node2-eth0".to_string();
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("management", &[])];

        let mut bindings = Bindings::default();
        bindings.replace(place(&node, &catalog).unwrap());
        bindings.replace(place(&other, &catalog).unwrap());

        // 2 allowed rows + 1 assignment for node-1
        assert_eq!(bindings.clear("node-1"), 3);
        assert!(bindings.allowed_on("if-eth0").is_empty());
        assert!(bindings.assigned_on("if-eth0").is_empty());
        assert_eq!(bindings.assigned_on("if-node2-eth0"), vec!["management"]);
    }

    #[test]
    fn test_verify_rejects_duplicate_assignment() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("management", &[])];
        let allowed = resolve(&node, &catalog);
        let mut assigned = NetworkMap::new();
        assigned.insert("if-eth0".to_string(), vec!["management".to_string()]);
        assigned.insert("if-eth1".to_string(), vec!["management".to_string()]);

        let err = verify(&node, &catalog, &allowed, &assigned).unwrap_err();
        assert!(matches!(err, AssignmentError::DuplicateAssignment { count: 2, .. }));
    }

    #[test]
    fn test_verify_rejects_missing_network() {
        let node = node("123", &[("eth0", "123")]);
        let catalog = vec![network("management", &[]), network("public", &[])];
        let allowed = resolve(&node, &catalog);
        let mut assigned = NetworkMap::new();
        assigned.insert("if-eth0".to_string(), vec!["management".to_string()]);

        let err = verify(&node, &catalog, &allowed, &assigned).unwrap_err();
        assert!(matches!(err, AssignmentError::Unassigned { ref network_id, .. } if network_id == "public"));
    }

    #[test]
    fn test_verify_rejects_foreign_interface() {
        let node = node("123", &[("eth0", "123")]);
        let catalog = vec![network("management", &[])];
        let mut allowed = resolve(&node, &catalog);
        allowed.insert("if-other".to_string(), vec!["management".to_string()]);

        let err = verify(&node, &catalog, &allowed, &NetworkMap::new()).unwrap_err();
        assert!(matches!(err, AssignmentError::UnknownReference { kind: "interface", .. }));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_node() -> impl Strategy<Value = NodeData> {
            (1usize..5, 0usize..6).prop_map(|(count, registration)| {
                let interfaces: Vec<InterfaceData> = (0..count)
                    .map(|i| InterfaceData {
                        id: format!("if-{}", i),
                        name: format!("eth{}", i),
                        mac: format!("52:54:00:00:00:{:02x}", i),
                    })
                    .collect();
                let mut node = node("", &[]);
                // Indices past the interface list produce an unmatched registration MAC.
                node.mac = format!("52:54:00:00:00:{:02x}", registration);
                node.interfaces = interfaces;
                node
            })
        }

        fn arb_catalog() -> impl Strategy<Value = Vec<NetworkData>> {
            prop::collection::vec(prop::option::of(0usize..6), 0..6).prop_map(|bindings| {
                bindings
                    .into_iter()
                    .enumerate()
                    .map(|(i, bound)| {
                        let macs: Vec<String> = bound
                            .map(|b| vec![format!("52:54:00:00:00:{:02x}", b)])
                            .unwrap_or_default();
                        let macs: Vec<&str> = macs.iter().map(String::as_str).collect();
                        network(&format!("net-{}", i), &macs)
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn every_network_assigned_exactly_once(node in arb_node(), catalog in arb_catalog()) {
                let placement = place(&node, &catalog).unwrap();
                for network in &catalog {
                    let count = placement
                        .assignments
                        .iter()
                        .filter(|a| a.network_id == network.id)
                        .count();
                    prop_assert_eq!(count, 1);
                }
                prop_assert_eq!(placement.assignments.len(), catalog.len());
            }

            #[test]
            fn assignments_are_allowed(node in arb_node(), catalog in arb_catalog()) {
                let placement = place(&node, &catalog).unwrap();
                for assignment in &placement.assignments {
                    let allowed = placement
                        .allowed
                        .iter()
                        .find(|row| row.interface_id == assignment.interface_id);
                    prop_assert!(allowed.is_some_and(|row| row.network_ids.contains(&assignment.network_id)));
                }
            }

            #[test]
            fn unbound_catalog_lands_on_primary(node in arb_node(), count in 0usize..6) {
                let catalog: Vec<NetworkData> =
                    (0..count).map(|i| network(&format!("net-{}", i), &[])).collect();
                let primary = crate::assignment::primary_interface(&node).map(|i| i.id.clone());

                let placement = place(&node, &catalog).unwrap();
                for assignment in &placement.assignments {
                    prop_assert_eq!(Some(&assignment.interface_id), primary.as_ref());
                }
                // Every interface, primary or not, may carry the unbound networks.
                if count > 0 {
                    prop_assert_eq!(placement.allowed.len(), node.interfaces.len());
                }
            }

            #[test]
            fn recompute_is_idempotent(node in arb_node(), catalog in arb_catalog()) {
                let mut bindings = Bindings::default();
                bindings.replace(place(&node, &catalog).unwrap());
                let first = bindings.clone();
                bindings.replace(place(&node, &catalog).unwrap());
                prop_assert_eq!(bindings.allowed_rows(), first.allowed_rows());
                prop_assert_eq!(bindings.assignment_rows(), first.assignment_rows());
            }
        }
    }
}
