//! Flow deployment boundary.
//!
//! This crate provides a trait-based interface to a flow store with a
//! Node-RED admin API implementation and an in-memory one.

#![warn(missing_docs)]

pub mod memory;
pub mod node_red;
pub mod trait_;

pub use memory::MemoryFlowStore;
pub use node_red::{NodeRedAuth, NodeRedClient};
pub use trait_::{FlowNodes, FlowStore, Result, StorageError};
