//! Assignment planner - picks the one interface that hosts each network.

use crate::command::{InterfaceData, NetworkData, NodeData};

use super::error::AssignmentError;
use super::resolver::bound_interface;
use super::NetworkMap;

/// The interface matching the node's registration MAC, else the first discovered one.
pub fn primary_interface(node: &NodeData) -> Option<&InterfaceData> {
    node.interfaces
        .iter()
        .find(|i| i.has_mac(&node.mac))
        .or_else(|| node.interfaces.first())
}

/// Assign every catalog network to exactly one interface of `node`.
///
/// Networks are visited in catalog order. MAC-bound networks go to their bound interface,
/// everything else to the primary interface. A node without interfaces gets an empty plan.
pub fn plan(
    node: &NodeData,
    catalog: &[NetworkData],
    allowed: &NetworkMap,
) -> Result<NetworkMap, AssignmentError> {
    let mut assigned = NetworkMap::new();
    let Some(primary) = primary_interface(node) else {
        return Ok(assigned);
    };

    for network in catalog {
        let target = bound_interface(node, network).unwrap_or(primary);

        let permitted = allowed
            .get(&target.id)
            .is_some_and(|networks| networks.contains(&network.id));
        if !permitted {
            return Err(AssignmentError::OutsideAllowance {
                network_id: network.id.clone(),
                interface_id: target.id.clone(),
            });
        }

        assigned
            .entry(target.id.clone())
            .or_default()
            .push(network.id.clone());
    }

    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::fixtures::{network, node};
    use crate::assignment::resolve;

    #[test]
    fn test_primary_matches_registration_mac() {
        let node = node("654", &[("eth0", "123"), ("eth1", "654")]);
        assert_eq!(primary_interface(&node).map(|i| i.name.as_str()), Some("eth1"));
    }

    #[test]
    fn test_primary_falls_back_to_first_interface() {
        let node = node("999", &[("eth0", "123"), ("eth1", "654")]);
        assert_eq!(primary_interface(&node).map(|i| i.name.as_str()), Some("eth0"));
    }

    #[test]
    fn test_unbound_networks_land_on_primary() {
        let node = node("654", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![
            network("management", &[]),
            network("public", &[]),
            network("storage", &[]),
        ];
        let allowed = resolve(&node, &catalog);

        let assigned = plan(&node, &catalog, &allowed).unwrap();

        assert_eq!(assigned.len(), 1);
        assert_eq!(
            assigned["if-eth1"],
            vec![
                "management".to_string(),
                "public".to_string(),
                "storage".to_string()
            ]
        );
    }

    #[test]
    fn test_bound_network_lands_on_bound_interface() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("management", &[]), network("storage", &["654"])];
        let allowed = resolve(&node, &catalog);

        let assigned = plan(&node, &catalog, &allowed).unwrap();

        assert_eq!(assigned["if-eth0"], vec!["management".to_string()]);
        assert_eq!(assigned["if-eth1"], vec!["storage".to_string()]);
    }

    #[test]
    fn test_no_interfaces_gives_empty_plan() {
        let node = node("123", &[]);
        let catalog = vec![network("management", &[])];

        let assigned = plan(&node, &catalog, &NetworkMap::new()).unwrap();
        assert!(assigned.is_empty());
    }

    #[test]
    fn test_plan_outside_allowance_is_rejected() {
        let node = node("123", &[("eth0", "123")]);
        let catalog = vec![network("management", &[])];

        let err = plan(&node, &catalog, &NetworkMap::new()).unwrap_err();
        assert_eq!(
            err,
            AssignmentError::OutsideAllowance {
                network_id: "management".to_string(),
                interface_id: "if-eth0".to_string(),
            }
        );
    }
}
