//! Allowance resolver - which networks each interface may carry.

use crate::command::{InterfaceData, NetworkData, NodeData};

use super::NetworkMap;

/// Interface a MAC-bound network is pinned to on `node`.
///
/// Returns `None` for unrestricted networks, and for bound networks whose MACs are all
/// absent from the node: a binding that targets another node's NIC does not restrict this one.
/// When several interfaces match, the first in discovery order wins.
pub fn bound_interface<'a>(node: &'a NodeData, network: &NetworkData) -> Option<&'a InterfaceData> {
    if !network.is_mac_bound() {
        return None;
    }
    node.interfaces.iter().find(|i| network.binds(&i.mac))
}

/// Compute the candidate placement space for `node` against `catalog`.
///
/// Every interface may carry every network, except MAC-bound networks which are only
/// allowed on their bound interface. An empty catalog or a node without interfaces yields an
/// empty map.
pub fn resolve(node: &NodeData, catalog: &[NetworkData]) -> NetworkMap {
    let mut allowed = NetworkMap::new();
    if node.interfaces.is_empty() || catalog.is_empty() {
        return allowed;
    }

    for network in catalog {
        match bound_interface(node, network) {
            Some(iface) => allowed
                .entry(iface.id.clone())
                .or_default()
                .push(network.id.clone()),
            None => {
                for iface in &node.interfaces {
                    allowed
                        .entry(iface.id.clone())
                        .or_default()
                        .push(network.id.clone());
                }
            }
        }
    }

    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::fixtures::{network, node};

    #[test]
    fn test_full_cross_product_without_bindings() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("management", &[]), network("storage", &[])];

        let allowed = resolve(&node, &catalog);

        assert_eq!(allowed.len(), 2);
        for iface in &node.interfaces {
            assert_eq!(
                allowed[&iface.id],
                vec!["management".to_string(), "storage".to_string()]
            );
        }
    }

    #[test]
    fn test_mac_bound_network_only_on_matching_interface() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("management", &[]), network("storage", &["654"])];

        let allowed = resolve(&node, &catalog);

        assert_eq!(allowed["if-eth0"], vec!["management".to_string()]);
        assert_eq!(
            allowed["if-eth1"],
            vec!["management".to_string(), "storage".to_string()]
        );
    }

    #[test]
    fn test_binding_matches_mac_case_insensitively() {
        let node = node("aa:bb", &[("eth0", "aa:bb"), ("eth1", "CC:DD")]);
        let catalog = vec![network("public", &["cc:dd"])];

        let allowed = resolve(&node, &catalog);

        assert!(!allowed.contains_key("if-eth0"));
        assert_eq!(allowed["if-eth1"], vec!["public".to_string()]);
    }

    #[test]
    fn test_binding_to_foreign_mac_is_unrestricted() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("public", &["ff:ff:ff:ff:ff:ff"])];

        let allowed = resolve(&node, &catalog);

        assert_eq!(allowed["if-eth0"], vec!["public".to_string()]);
        assert_eq!(allowed["if-eth1"], vec!["public".to_string()]);
    }

    #[test]
    fn test_all_bound_catalog_leaves_other_interfaces_empty() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654")]);
        let catalog = vec![network("storage", &["654"])];

        let allowed = resolve(&node, &catalog);

        assert!(!allowed.contains_key("if-eth0"));
        assert_eq!(allowed["if-eth1"], vec!["storage".to_string()]);
    }

    #[test]
    fn test_empty_catalog_allows_nothing() {
        let node = node("123", &[("eth0", "123")]);
        assert!(resolve(&node, &[]).is_empty());
    }

    #[test]
    fn test_node_without_interfaces_allows_nothing() {
        let node = node("123", &[]);
        let catalog = vec![network("management", &[])];
        assert!(resolve(&node, &catalog).is_empty());
    }

    #[test]
    fn test_bound_interface_first_match_wins() {
        let node = node("123", &[("eth0", "123"), ("eth1", "654"), ("eth2", "777")]);
        let net = network("storage", &["777", "654"]);

        let iface = bound_interface(&node, &net).map(|i| i.name.as_str());
        assert_eq!(iface, Some("eth1"));
    }
}
