pub mod assignment;
pub mod audit;
pub mod command;
pub mod config;
pub mod listener;
pub mod rest;
pub mod state;
pub mod store;

pub use audit::{FabricAuditLogger, create_audit_logger};
pub use command::{Command, Response};
pub use config::FabricConfig;
pub use mraft::NodeId;
pub use state::FabricState;
pub use store::{DataStore, Event, RaftStore, StoreError};
