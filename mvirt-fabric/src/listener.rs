//! State event listener.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::Event;

/// Trace every state event until the channel closes.
pub fn start_event_listener(mut events: broadcast::Receiver<Event>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        info!("Started state event listener");
        let mut seen = 0;

        loop {
            match events.recv().await {
                Ok(event) => {
                    seen += 1;
                    handle_event(&event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event listener lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }

        info!("State event listener stopped");
        seen
    })
}

fn handle_event(event: &Event) {
    match event {
        Event::NodeJoinedCluster {
            node_id,
            cluster_id,
        } => info!(node_id, cluster_id, "Node joined cluster"),
        Event::NodeLeftCluster {
            node_id,
            cluster_id,
        } => info!(node_id, cluster_id, "Node left cluster"),
        Event::NetworksPlaced {
            node_id,
            cluster_id,
            allowed_rows,
            assigned_rows,
        } => info!(
            node_id,
            cluster_id, allowed_rows, assigned_rows, "Networks placed"
        ),
        Event::NetworksCleared {
            node_id,
            rows_removed,
        } => info!(node_id, rows_removed, "Networks cleared"),
        Event::ClusterDeleted { id, released_nodes } => info!(
            cluster_id = id,
            released = released_nodes.len(),
            "Cluster deleted"
        ),
        other => debug!(
            resource_type = other.resource_type(),
            resource_id = other.resource_id(),
            "State changed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_counts_events_until_closed() {
        let (tx, rx) = broadcast::channel(16);
        let handle = start_event_listener(rx);

        tx.send(Event::NodeDeregistered {
            id: "node-1".to_string(),
        })
        .unwrap();
        tx.send(Event::NetworksCleared {
            node_id: "node-1".to_string(),
            rows_removed: 3,
        })
        .unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), 2);
    }
}
