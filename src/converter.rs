use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::builder::UsecaseFlowGraphBuilder;
use crate::config::Config;
use crate::diagram::{Diagram, FlowGraphDiagramBuilder};
use crate::error::GraphError;
use crate::ir::FlowGraph;
use crate::layout::{LayoutCalculator, LayoutResult};
use crate::usecase::UseCase;

/// Use case in, diagram out: builds the flow graph, lays it out and maps
/// the result to shapes and connectors. Every call works on a fresh graph.
#[derive(Debug, Clone, Default)]
pub struct UsecaseToDiagram {
    config: Config,
    collapsed_flows: BTreeSet<i64>,
}

impl UsecaseToDiagram {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            collapsed_flows: BTreeSet::new(),
        }
    }

    /// Alternate flows, by use-case flow id, to draw as their first node only.
    pub fn with_collapsed_flows(mut self, flow_ids: impl IntoIterator<Item = i64>) -> Self {
        self.collapsed_flows.extend(flow_ids);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn convert(&self, use_case: &UseCase) -> Result<Diagram, GraphError> {
        let (graph, layout) = self.arrange(use_case)?;
        Ok(FlowGraphDiagramBuilder::new(&self.config).build_diagram(&graph, &layout, use_case))
    }

    /// Graph and layout without the diagram mapping; what the layout dump reads.
    pub fn arrange(&self, use_case: &UseCase) -> Result<(FlowGraph, LayoutResult), GraphError> {
        let mut graph = UsecaseFlowGraphBuilder::new().build_graph(use_case)?;
        for &flow_id in &self.collapsed_flows {
            match graph.find_flow_by_element(flow_id) {
                Some(flow) => graph.set_collapsed(flow, true),
                None => warn!(flow_id, "cannot collapse unknown flow"),
            }
        }
        let layout = LayoutCalculator::new(&self.config.layout).arrange_graph(&graph)?;
        debug!(
            use_case = use_case.id,
            connections = layout.connections.len(),
            "arranged use case"
        );
        Ok((graph, layout))
    }
}

/// Converts with the built-in defaults.
pub fn convert(use_case: &UseCase) -> Result<Diagram, GraphError> {
    UsecaseToDiagram::default().convert(use_case)
}
