use std::fmt;

use crate::error::GraphError;
use crate::layout::Size;
use crate::text::strip_markup;
use crate::usecase::{Step, StepOf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// What a node stands for in the use case.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTag {
    Step(StepTag),
    /// Decision point in front of a step that has alternate flows.
    Branching { id: i64, step_id: i64 },
    /// End of an alternate flow that leaves the use case.
    Exit { id: i64, flow_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepTag {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub step_of: StepOf,
    pub condition: bool,
    pub external: bool,
}

impl StepTag {
    pub fn from_step(step: &Step) -> Self {
        Self {
            id: step.id,
            name: step.name.clone(),
            description: step.description.clone(),
            step_of: step.step_of,
            condition: step.condition,
            external: step.external,
        }
    }
}

impl NodeTag {
    /// Id of the originating element; synthetic markers carry negated ids.
    pub fn element_id(&self) -> i64 {
        match self {
            NodeTag::Step(step) => step.id,
            NodeTag::Branching { id, .. } | NodeTag::Exit { id, .. } => *id,
        }
    }

    pub fn name(&self) -> String {
        match self {
            NodeTag::Step(step) => step.name.clone(),
            NodeTag::Branching { step_id, .. } => format!("Branch {step_id}"),
            NodeTag::Exit { .. } => "Exit".to_string(),
        }
    }

    /// Text shown inside the shape.
    pub fn label(&self) -> String {
        match self {
            NodeTag::Step(step) => {
                let text = strip_markup(&step.description);
                if text.is_empty() {
                    step.name.trim().to_string()
                } else {
                    text
                }
            }
            NodeTag::Branching { .. } => String::new(),
            NodeTag::Exit { .. } => "Exit".to_string(),
        }
    }

    pub fn as_step(&self) -> Option<&StepTag> {
        match self {
            NodeTag::Step(step) => Some(step),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowTag {
    pub id: i64,
    pub name: String,
    pub external: bool,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: NodeTag,
    pub flow: Option<FlowId>,
    pub alternate_flows: Vec<FlowId>,
    pub preferred_size: Option<Size>,
}

/// Branch-specific part of a flow.
#[derive(Debug, Clone, Default)]
pub struct AlternateFlow {
    pub start_node: Option<NodeId>,
    pub end_node: Option<NodeId>,
    pub return_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Flow {
    /// `None` for the main flow.
    pub tag: Option<FlowTag>,
    pub nodes: Vec<NodeId>,
    pub collapsed: bool,
    pub alternate: Option<AlternateFlow>,
}

impl Flow {
    pub fn is_main(&self) -> bool {
        self.alternate.is_none()
    }

    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

/// Steps of one use case as a tree of flows. Nodes and flows live in arenas
/// and are addressed by index; ids are only valid for the graph that made them.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: Vec<Node>,
    flows: Vec<Flow>,
    main_flow: FlowId,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            flows: vec![Flow {
                tag: None,
                nodes: Vec::new(),
                collapsed: false,
                alternate: None,
            }],
            main_flow: FlowId(0),
        }
    }

    pub fn main_flow(&self) -> FlowId {
        self.main_flow
    }

    /// Creates a node that is not yet part of any flow.
    pub fn add_node(&mut self, tag: NodeTag) -> NodeId {
        self.nodes.push(Node {
            tag,
            flow: None,
            alternate_flows: Vec::new(),
            preferred_size: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Creates an alternate flow that is not yet attached to a branch point.
    pub fn add_alternate_flow(&mut self, tag: FlowTag, return_to: Option<String>) -> FlowId {
        self.flows.push(Flow {
            tag: Some(tag),
            nodes: Vec::new(),
            collapsed: false,
            alternate: Some(AlternateFlow {
                return_to,
                ..Default::default()
            }),
        });
        FlowId(self.flows.len() - 1)
    }

    pub fn attach_alternate_flow(&mut self, flow: FlowId, start: NodeId) -> Result<(), GraphError> {
        let alternate = self.flows[flow.0]
            .alternate
            .as_mut()
            .ok_or(GraphError::NotAnAlternateFlow { flow })?;
        alternate.start_node = Some(start);
        self.nodes[start.0].alternate_flows.push(flow);
        Ok(())
    }

    pub fn append_node(&mut self, flow: FlowId, node: NodeId) -> Result<(), GraphError> {
        if let Some(owner) = self.nodes[node.0].flow {
            return Err(GraphError::NodeAlreadyOwned { node, flow: owner });
        }
        self.nodes[node.0].flow = Some(flow);
        self.flows[flow.0].nodes.push(node);
        Ok(())
    }

    pub fn set_end_node(&mut self, flow: FlowId, node: Option<NodeId>) {
        if let Some(alternate) = self.flows[flow.0].alternate.as_mut() {
            alternate.end_node = node;
        }
    }

    pub fn set_collapsed(&mut self, flow: FlowId, collapsed: bool) {
        self.flows[flow.0].collapsed = collapsed;
    }

    pub fn set_node_size(&mut self, node: NodeId, size: Size) {
        self.nodes[node.0].preferred_size = Some(size);
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn flow(&self, id: FlowId) -> &Flow {
        &self.flows[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(idx, node)| (NodeId(idx), node))
    }

    pub fn flows(&self) -> impl Iterator<Item = (FlowId, &Flow)> {
        self.flows.iter().enumerate().map(|(idx, flow)| (FlowId(idx), flow))
    }

    pub fn alternate_flows(&self) -> impl Iterator<Item = (FlowId, &Flow, &AlternateFlow)> {
        self.flows()
            .filter_map(|(id, flow)| flow.alternate.as_ref().map(|alt| (id, flow, alt)))
    }

    pub fn find_flow_by_element(&self, element_id: i64) -> Option<FlowId> {
        self.flows()
            .find(|(_, flow)| flow.tag.as_ref().is_some_and(|tag| tag.id == element_id))
            .map(|(id, _)| id)
    }

    pub fn find_node_by_element(&self, element_id: i64) -> Option<NodeId> {
        self.nodes()
            .find(|(_, node)| node.tag.element_id() == element_id)
            .map(|(id, _)| id)
    }

    /// Flows reachable from the main flow, parents before children, siblings
    /// in branch order.
    pub fn flow_order(&self) -> Vec<FlowId> {
        let mut order = Vec::with_capacity(self.flows.len());
        self.collect_flow_order(self.main_flow, &mut order);
        order
    }

    fn collect_flow_order(&self, flow: FlowId, order: &mut Vec<FlowId>) {
        if order.contains(&flow) {
            return;
        }
        order.push(flow);
        for node in &self.flows[flow.0].nodes {
            for child in &self.nodes[node.0].alternate_flows {
                self.collect_flow_order(*child, order);
            }
        }
    }

    /// All flows nested below `flow`, depth first.
    pub fn descendant_flows(&self, flow: FlowId) -> Vec<FlowId> {
        let mut order = Vec::new();
        self.collect_flow_order(flow, &mut order);
        order.remove(0);
        order
    }
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}
