//! Turns a use case into a [`FlowGraph`].
//!
//! Steps become nodes of the main flow. A step with alternate flows is
//! preceded by a synthetic branching node from which every alternate flow
//! starts; flows that leave the use case end in a synthetic exit node.
//! Return targets are looked up by step name once every node exists, so a
//! flow may return to a step that comes later in the use case.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::GraphError;
use crate::ir::{FlowGraph, FlowId, FlowTag, NodeId, NodeTag, StepTag};
use crate::usecase::{Flow, Step, UseCase, in_order};

/// Return target naming the end of the use case instead of a step.
pub const EXIT_TARGET: &str = "Exit";

#[derive(Debug, Clone, Copy, Default)]
pub struct UsecaseFlowGraphBuilder;

impl UsecaseFlowGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build_graph(&self, use_case: &UseCase) -> Result<FlowGraph, GraphError> {
        let mut assembly = GraphAssembly {
            graph: FlowGraph::new(),
            names: HashMap::new(),
        };
        let main = assembly.graph.main_flow();

        if let Some(pre) = &use_case.pre_condition {
            assembly.add_step(main, pre, false)?;
        }
        let steps = in_order(&use_case.steps, |step| step.order_index);
        assembly.add_steps(main, &steps, false)?;
        if let Some(post) = &use_case.post_condition {
            assembly.add_step(main, post, false)?;
        }

        assembly.resolve_end_nodes();
        debug!(
            use_case = use_case.id,
            nodes = assembly.graph.node_count(),
            flows = assembly.graph.flow_count(),
            "built flow graph"
        );
        Ok(assembly.graph)
    }
}

struct GraphAssembly {
    graph: FlowGraph,
    names: HashMap<String, NodeId>,
}

impl GraphAssembly {
    fn register(&mut self, key: String, node: NodeId) {
        if key.is_empty() {
            return;
        }
        if let Some(previous) = self.names.insert(key.clone(), node) {
            warn!(name = %key, %previous, replaced_by = %node, "duplicate step name, using the later step");
        }
    }

    fn add_steps(&mut self, flow: FlowId, steps: &[&Step], external_last: bool) -> Result<(), GraphError> {
        for (idx, step) in steps.iter().enumerate() {
            let external = external_last && idx + 1 == steps.len();
            self.add_step(flow, step, external)?;
        }
        Ok(())
    }

    fn add_step(&mut self, flow: FlowId, step: &Step, external: bool) -> Result<(), GraphError> {
        let mut tag = StepTag::from_step(step);
        tag.external |= external;

        if step.flows.is_empty() {
            let node = self.graph.add_node(NodeTag::Step(tag));
            self.graph.append_node(flow, node)?;
            self.register(step.name.clone(), node);
            return Ok(());
        }

        let branching = self.graph.add_node(NodeTag::Branching {
            id: -step.id,
            step_id: step.id,
        });
        self.graph.append_node(flow, branching)?;
        tag.condition = true;
        let node = self.graph.add_node(NodeTag::Step(tag));
        self.graph.append_node(flow, node)?;
        self.register(step.name.clone(), node);

        for alternate in in_order(&step.flows, |flow| flow.order_index) {
            self.add_alternate_flow(branching, alternate)?;
        }
        Ok(())
    }

    fn add_alternate_flow(&mut self, branching: NodeId, flow: &Flow) -> Result<(), GraphError> {
        let id = self.graph.add_alternate_flow(
            FlowTag {
                id: flow.id,
                name: flow.name.clone(),
                external: flow.is_external,
            },
            flow.return_to_step_name.clone(),
        );
        self.graph.attach_alternate_flow(id, branching)?;

        let steps = in_order(&flow.steps, |step| step.order_index);
        self.add_steps(id, &steps, flow.is_external)?;

        if flow.return_to_step_name.as_deref() == Some(EXIT_TARGET) {
            let exit = self.graph.add_node(NodeTag::Exit {
                id: -flow.id,
                flow_id: flow.id,
            });
            self.graph.append_node(id, exit)?;
            self.register(exit_key(flow.id), exit);
        }

        if let Some(first) = self.graph.flow(id).first_node()
            && let NodeTag::Step(step) = &mut self.graph.node_mut(first).tag
        {
            step.condition = true;
        }
        Ok(())
    }

    fn resolve_end_nodes(&mut self) {
        let targets: Vec<(FlowId, Option<String>)> = self
            .graph
            .alternate_flows()
            .map(|(id, flow, alternate)| {
                let key = match alternate.return_to.as_deref() {
                    Some(EXIT_TARGET) => flow.tag.as_ref().map(|tag| exit_key(tag.id)),
                    other => other.map(str::to_string),
                };
                (id, key)
            })
            .collect();

        for (flow, key) in targets {
            let end = key.as_ref().and_then(|key| self.names.get(key)).copied();
            if end.is_none() {
                warn!(%flow, return_to = ?key, "return target not found");
            }
            self.graph.set_end_node(flow, end);
        }
    }
}

fn exit_key(flow_id: i64) -> String {
    format!("-{flow_id}")
}
