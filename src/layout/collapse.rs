use tracing::debug;

use crate::ir::{FlowGraph, NodeId};

use super::LayoutDecorations;

/// Hides everything a collapsed alternate flow contains except its first
/// node, which then stands in for the hidden nodes when connectors are drawn.
/// Decorations start out fully visible, so flows that are not collapsed keep
/// no hidden or replacement state from earlier runs.
pub(super) fn apply_collapsing(graph: &FlowGraph, deco: &mut LayoutDecorations) {
    let mut hidden_nodes = 0usize;
    for flow_id in graph.flow_order() {
        let flow = graph.flow(flow_id);
        if flow.is_main() || !flow.collapsed || deco.flow(flow_id).hidden {
            continue;
        }
        let Some(first) = flow.first_node() else {
            continue;
        };

        let mut hide = |node: NodeId, deco: &mut LayoutDecorations| {
            let node_deco = deco.node_mut(node);
            node_deco.hidden = true;
            node_deco.replacement = Some(first);
            hidden_nodes += 1;
        };

        for &node in flow.nodes.iter().skip(1) {
            hide(node, deco);
        }
        for child in graph.descendant_flows(flow_id) {
            deco.flow_mut(child).hidden = true;
            for &node in &graph.flow(child).nodes {
                hide(node, deco);
            }
        }
    }
    debug!(hidden_nodes, "collapsed alternate flows");
}
