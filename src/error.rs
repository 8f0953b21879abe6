use crate::ir::{FlowId, NodeId};
use thiserror::Error;

/// Structural problems in a flow graph. These are fatal for one conversion;
/// callers typically show the artifact as an incompatible diagram.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node {node} is already part of flow {flow}")]
    NodeAlreadyOwned { node: NodeId, flow: FlowId },

    #[error("Flow {flow} is the main flow and cannot branch from a node")]
    NotAnAlternateFlow { flow: FlowId },

    #[error("At least one flow has no nodes (flow {flow})")]
    EmptyAlternateFlow { flow: FlowId },

    #[error("Alternate flow {flow} has no start node")]
    MissingStartNode { flow: FlowId },

    #[error("Alternate flow {flow} has no end node (return target: {return_to:?})")]
    MissingEndNode {
        flow: FlowId,
        return_to: Option<String>,
    },

    #[error("Node {node} does not belong to any flow")]
    OrphanNode { node: NodeId },
}
