//! Engine nodes and in-process peer broadcast
//!
//! There is no transport: peers are handles to other nodes in the same process and a
//! broadcast is a synchronous call into each of them.

pub mod node;
pub mod registry;

pub use node::{MiningState, MiningStatus, Node, NodeState};
pub use registry::NodeRegistry;
