mod collapse;
mod grid;
mod routing;
mod table;
pub(crate) mod types;
pub use types::*;

use collapse::apply_collapsing;
use grid::{assign_columns, assign_rows, inherit_hidden_cells};
use routing::compute_connections;
use table::{assign_sizes, build_table, position_flows, position_nodes};

use tracing::debug;

use crate::config::{LayoutConfig, ReturnTargetPolicy};
use crate::error::GraphError;
use crate::ir::FlowGraph;

/// Places the nodes of a flow graph on a grid and routes the connectors
/// between them. The graph itself is only read; everything the layout
/// decides is returned in the [`LayoutResult`].
pub struct LayoutCalculator<'a> {
    config: &'a LayoutConfig,
}

impl<'a> LayoutCalculator<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    pub fn arrange_graph(&self, graph: &FlowGraph) -> Result<LayoutResult, GraphError> {
        arrange_graph(graph, self.config)
    }
}

pub fn arrange_graph(graph: &FlowGraph, config: &LayoutConfig) -> Result<LayoutResult, GraphError> {
    verify_graph(graph, config)?;
    debug!(
        nodes = graph.node_count(),
        flows = graph.flow_count(),
        "arranging flow graph"
    );

    let mut decorations = LayoutDecorations::new(graph.node_count(), graph.flow_count());
    apply_collapsing(graph, &mut decorations);
    assign_rows(graph, &mut decorations, config);
    assign_columns(graph, &mut decorations);
    inherit_hidden_cells(graph, &mut decorations);
    assign_sizes(graph, &mut decorations, config);
    let table = build_table(graph, &decorations, config);
    position_nodes(graph, &mut decorations, &table);
    position_flows(graph, &mut decorations, config);
    let connections = compute_connections(graph, &decorations, &table, config);

    Ok(LayoutResult {
        width: table.width(),
        height: table.height(),
        decorations,
        table,
        connections,
    })
}

/// Rejects graphs the layout cannot place: empty or detached alternate
/// flows, unresolved return targets (unless configured to omit them), and
/// nodes that belong to no flow.
pub fn verify_graph(graph: &FlowGraph, config: &LayoutConfig) -> Result<(), GraphError> {
    for (flow, body, alternate) in graph.alternate_flows() {
        if body.nodes.is_empty() {
            return Err(GraphError::EmptyAlternateFlow { flow });
        }
        if alternate.start_node.is_none() {
            return Err(GraphError::MissingStartNode { flow });
        }
        if alternate.end_node.is_none() && config.return_target_policy == ReturnTargetPolicy::Fail
        {
            return Err(GraphError::MissingEndNode {
                flow,
                return_to: alternate.return_to.clone(),
            });
        }
    }
    if let Some((node, _)) = graph.nodes().find(|(_, node)| node.flow.is_none()) {
        return Err(GraphError::OrphanNode { node });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FlowId, FlowTag, NodeId, NodeTag, StepTag};
    use crate::usecase::Step;

    fn step(graph: &mut FlowGraph, flow: FlowId, id: i64) -> NodeId {
        let node = graph.add_node(NodeTag::Step(StepTag::from_step(&Step::new(id, format!("S{id}")))));
        graph.append_node(flow, node).unwrap();
        node
    }

    fn branch(graph: &mut FlowGraph, from: NodeId, id: i64) -> FlowId {
        let flow = graph.add_alternate_flow(
            FlowTag {
                id,
                name: format!("F{id}"),
                external: false,
            },
            Some("target".to_string()),
        );
        graph.attach_alternate_flow(flow, from).unwrap();
        flow
    }

    /// pre, branch point with a two-step alternate flow returning to post.
    fn sample() -> (FlowGraph, FlowId, Vec<NodeId>) {
        let mut graph = FlowGraph::new();
        let main = graph.main_flow();
        let pre = step(&mut graph, main, 1);
        let br = step(&mut graph, main, 2);
        let s = step(&mut graph, main, 3);
        let flow = branch(&mut graph, br, 10);
        let a = step(&mut graph, flow, 11);
        let b = step(&mut graph, flow, 12);
        let post = step(&mut graph, main, 4);
        graph.set_end_node(flow, Some(post));
        (graph, flow, vec![pre, br, s, a, b, post])
    }

    #[test]
    fn empty_alternate_flow_is_rejected() {
        let mut graph = FlowGraph::new();
        let main = graph.main_flow();
        let a = step(&mut graph, main, 1);
        let flow = branch(&mut graph, a, 10);
        graph.set_end_node(flow, Some(a));
        let err = arrange_graph(&graph, &LayoutConfig::default()).unwrap_err();
        assert_eq!(err, GraphError::EmptyAlternateFlow { flow });
        assert!(err.to_string().starts_with("At least one flow has no nodes"));
    }

    #[test]
    fn detached_flow_and_orphan_node_are_rejected() {
        let mut graph = FlowGraph::new();
        let main = graph.main_flow();
        step(&mut graph, main, 1);
        let flow = graph.add_alternate_flow(
            FlowTag {
                id: 5,
                name: "loose".to_string(),
                external: false,
            },
            None,
        );
        step(&mut graph, flow, 6);
        assert_eq!(
            verify_graph(&graph, &LayoutConfig::default()),
            Err(GraphError::MissingStartNode { flow })
        );

        let mut graph = FlowGraph::new();
        let node = graph.add_node(NodeTag::Exit { id: -1, flow_id: 1 });
        assert_eq!(
            verify_graph(&graph, &LayoutConfig::default()),
            Err(GraphError::OrphanNode { node })
        );
    }

    #[test]
    fn unresolved_end_node_depends_on_policy() {
        let (mut graph, flow, nodes) = sample();
        graph.set_end_node(flow, None);
        let strict = arrange_graph(&graph, &LayoutConfig::default());
        assert!(matches!(strict, Err(GraphError::MissingEndNode { .. })));

        let lenient = LayoutConfig {
            return_target_policy: ReturnTargetPolicy::Omit,
            ..LayoutConfig::default()
        };
        let result = arrange_graph(&graph, &lenient).unwrap();
        assert!(result.connections.iter().all(|c| !c.is_return()));
        assert!(result
            .connections
            .iter()
            .any(|c| c.kind == ConnectionKind::Branch && c.start == nodes[1]));
    }

    #[test]
    fn sample_produces_all_connection_kinds() {
        let (graph, _, nodes) = sample();
        let result = arrange_graph(&graph, &LayoutConfig::default()).unwrap();
        let kinds: Vec<_> = result.connections.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConnectionKind::Flow,
                ConnectionKind::Flow,
                ConnectionKind::Flow,
                ConnectionKind::Flow,
                ConnectionKind::Branch,
                ConnectionKind::Return,
            ]
        );
        let ret = result.connections.last().unwrap();
        assert_eq!((ret.start, ret.end), (nodes[4], nodes[5]));
        assert!(ret.visible);
        // post sits below the alternate flow's last row
        let deco = &result.decorations;
        assert!(deco.node(nodes[5]).row > deco.node(nodes[4]).row);
        assert!(result.width > 0.0 && result.height > 0.0);
    }

    #[test]
    fn collapsed_flow_routes_from_its_first_node() {
        let (mut graph, flow, nodes) = sample();
        graph.set_collapsed(flow, true);
        let result = arrange_graph(&graph, &LayoutConfig::default()).unwrap();
        let deco = &result.decorations;
        assert!(deco.node(nodes[4]).hidden);
        assert_eq!(deco.node(nodes[4]).rect, deco.node(nodes[3]).rect);
        assert_eq!(deco.flow(flow).rect, deco.node(nodes[3]).rect);
        let ret = result.connections.iter().find(|c| c.is_return()).unwrap();
        assert_eq!(ret.start, nodes[3]);
        // no flow connector inside a collapsed flow
        assert!(!result
            .connections
            .iter()
            .any(|c| c.kind == ConnectionKind::Flow && c.start == nodes[3]));
    }

    #[test]
    fn flows_inside_a_collapsed_flow_keep_their_returns() {
        let (mut graph, flow, nodes) = sample();
        let back = branch(&mut graph, nodes[4], 20);
        let back_step = step(&mut graph, back, 21);
        graph.set_end_node(back, Some(nodes[2]));
        let inner = branch(&mut graph, nodes[3], 30);
        step(&mut graph, inner, 31);
        graph.set_end_node(inner, Some(nodes[4]));
        graph.set_collapsed(flow, true);

        let result = arrange_graph(&graph, &LayoutConfig::default()).unwrap();
        let deco = &result.decorations;
        assert!(deco.flow(back).hidden);
        assert!(deco.node(back_step).hidden);
        let returns: Vec<_> = result
            .connections
            .iter()
            .filter(|c| c.is_return())
            .map(|c| (c.start, c.end, c.visible))
            .collect();
        // the return into the collapsed flow itself folds away
        assert_eq!(
            returns,
            vec![(nodes[3], nodes[5], true), (nodes[3], nodes[2], true)]
        );
        assert!(deco.node(nodes[2]).row > deco.node(nodes[3]).row);
    }

    #[test]
    fn arranging_is_repeatable() {
        let config = LayoutConfig::default();
        let (first_graph, _, _) = sample();
        let (second_graph, _, _) = sample();
        let first = LayoutCalculator::new(&config).arrange_graph(&first_graph).unwrap();
        let second = LayoutCalculator::new(&config).arrange_graph(&second_graph).unwrap();
        let cells = |r: &LayoutResult| -> Vec<(i32, i32)> {
            r.decorations.nodes.iter().map(|n| (n.row, n.col)).collect()
        };
        assert_eq!(cells(&first), cells(&second));
        assert_eq!(first.connections, second.connections);
    }
}
