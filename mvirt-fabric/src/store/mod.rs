//! DataStore abstraction for the fabric.
//!
//! This module provides a clean abstraction over the Raft-replicated state,
//! allowing handlers to work with domain objects instead of raw commands.
//!
//! # Architecture
//!
//! ```text
//! handlers → Arc<dyn DataStore>
//!                  ↓
//!            store.get_node_nics(id)            // Reads (µs)
//!            store.set_node_cluster(id, c)      // Writes (ms, via Raft)
//! ```
//!
//! Handlers only know about domain DTOs (Cluster, Node, NodeNic), not Raft details.
//!
//! # Usage
//!
//! ```ignore
//! use mvirt_fabric::store::{DataStore, RaftStore};
//!
//! let (event_tx, _) = broadcast::channel(256);
//! let store = Arc::new(RaftStore::new(node, event_tx, node_id));
//!
//! let nics = store.get_node_nics("node-1").await?;
//! store.set_node_cluster("node-1", None).await?;
//! ```

mod error;
mod event;
mod raft_store;
mod traits;

pub use error::{Result, StoreError};
pub use event::Event;
pub use raft_store::RaftStore;
pub use traits::*;
