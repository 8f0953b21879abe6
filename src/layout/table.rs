use tracing::debug;

use crate::config::LayoutConfig;
use crate::ir::{FlowGraph, NodeId, NodeTag};
use crate::text::measure_label;

use super::{GridTable, LayoutDecorations, Size};

/// Size of a node: the caller-provided size when there is one, otherwise
/// the configured default for its kind.
pub(super) fn node_size(graph: &FlowGraph, node: NodeId, config: &LayoutConfig) -> Size {
    let node = graph.node(node);
    if let Some(size) = node.preferred_size
        && size.width.is_finite()
        && size.height.is_finite()
    {
        return size;
    }
    match &node.tag {
        NodeTag::Branching { .. } => {
            Size::new(config.branching_node_width, config.branching_node_height)
        }
        NodeTag::Exit { .. } => Size::new(config.exit_node_width, config.exit_node_height),
        NodeTag::Step(_) => {
            let mut size = Size::new(config.node_default_width, config.node_default_height);
            if config.fit_labels {
                let padding = config.label_padding * 2.0;
                let block = measure_label(
                    &node.tag.label(),
                    (size.width - padding).max(1.0),
                    config.font_size,
                    config.label_line_height,
                );
                size.height = size.height.max(block.height + padding);
            }
            size
        }
    }
}

pub(super) fn assign_sizes(graph: &FlowGraph, deco: &mut LayoutDecorations, config: &LayoutConfig) {
    for (node, _) in graph.nodes() {
        if deco.node(node).hidden {
            continue;
        }
        let size = node_size(graph, node, config);
        let rect = &mut deco.node_mut(node).rect;
        rect.width = size.width;
        rect.height = size.height;
    }
}

/// Row heights and column widths from the visible nodes, plus cell spacing.
pub(super) fn build_table(graph: &FlowGraph, deco: &LayoutDecorations, config: &LayoutConfig) -> GridTable {
    let visible: Vec<NodeId> = graph
        .nodes()
        .map(|(id, _)| id)
        .filter(|id| !deco.node(*id).hidden)
        .collect();
    if visible.is_empty() {
        return GridTable::default();
    }

    let max_row = visible.iter().map(|id| deco.node(*id).row).max().unwrap_or(0);
    let min_col = visible.iter().map(|id| deco.node(*id).col).min().unwrap_or(0);
    let max_col = visible.iter().map(|id| deco.node(*id).col).max().unwrap_or(0);

    let mut row_sizes = vec![0.0f32; (max_row + 1).max(0) as usize];
    let mut col_sizes = vec![0.0f32; (max_col - min_col + 1) as usize];
    for id in &visible {
        let node = deco.node(*id);
        let (Ok(row), Ok(col)) = (usize::try_from(node.row), usize::try_from(node.col - min_col)) else {
            continue;
        };
        row_sizes[row] = row_sizes[row].max(node.rect.height);
        col_sizes[col] = col_sizes[col].max(node.rect.width);
    }
    for (idx, size) in row_sizes.iter_mut().enumerate() {
        *size += config.vertical_cell_spacing;
        if idx == 0 {
            *size += config.first_row_extra_spacing;
        }
    }
    for size in col_sizes.iter_mut() {
        *size += config.horizontal_cell_spacing;
    }

    let row_offsets = prefix_offsets(&row_sizes);
    let col_offsets = prefix_offsets(&col_sizes);
    debug!(
        rows = row_sizes.len(),
        cols = col_sizes.len(),
        min_col,
        "sized layout table"
    );
    GridTable {
        row_sizes,
        row_offsets,
        min_col,
        col_sizes,
        col_offsets,
    }
}

fn prefix_offsets(sizes: &[f32]) -> Vec<f32> {
    sizes
        .iter()
        .scan(0.0f32, |acc, size| {
            let offset = *acc;
            *acc += size;
            Some(offset)
        })
        .collect()
}

/// Centers every visible node in its cell; hidden nodes share the rect of
/// the node drawn in their place.
pub(super) fn position_nodes(graph: &FlowGraph, deco: &mut LayoutDecorations, table: &GridTable) {
    for (id, _) in graph.nodes() {
        let node = deco.node(id);
        if node.hidden {
            continue;
        }
        let cell = table.cell(node.row, node.col);
        let rect = &mut deco.node_mut(id).rect;
        rect.x = cell.x + (cell.width - rect.width) / 2.0;
        rect.y = cell.y + (cell.height - rect.height) / 2.0;
    }
    for (id, _) in graph.nodes() {
        if deco.node(id).hidden {
            let shown = deco.node(deco.resolve(id)).rect;
            deco.node_mut(id).rect = shown;
        }
    }
}

/// Bounding box of each flow: its visible nodes inflated by the flow
/// spacing, or just the first node when the flow is collapsed.
pub(super) fn position_flows(graph: &FlowGraph, deco: &mut LayoutDecorations, config: &LayoutConfig) {
    for (flow_id, flow) in graph.flows() {
        let Some(first) = flow.first_node() else {
            continue;
        };
        let first_rect = deco.node(deco.resolve(first)).rect;
        let rect = if flow.collapsed || deco.flow(flow_id).hidden {
            first_rect
        } else {
            flow.nodes
                .iter()
                .filter(|node| !deco.node(**node).hidden)
                .map(|node| deco.node(*node).rect)
                .reduce(|acc, rect| acc.union(&rect))
                .unwrap_or(first_rect)
                .inflate(config.flow_spacing)
        };
        deco.flow_mut(flow_id).rect = rect;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StepTag;
    use crate::layout::Rect;
    use crate::usecase::Step;

    fn graph_with_column(ids: &[i64]) -> (FlowGraph, Vec<NodeId>) {
        let mut graph = FlowGraph::new();
        let main = graph.main_flow();
        let nodes = ids
            .iter()
            .map(|id| {
                let node = graph.add_node(NodeTag::Step(StepTag::from_step(&Step::new(
                    *id,
                    format!("S{id}"),
                ))));
                graph.append_node(main, node).unwrap();
                node
            })
            .collect();
        (graph, nodes)
    }

    #[test]
    fn provided_size_wins_over_defaults() {
        let (mut graph, nodes) = graph_with_column(&[1, 2]);
        graph.set_node_size(nodes[0], Size::new(80.0, 30.0));
        graph.set_node_size(nodes[1], Size::new(f32::NAN, 30.0));
        let config = LayoutConfig::default();
        assert_eq!(node_size(&graph, nodes[0], &config), Size::new(80.0, 30.0));
        assert_eq!(node_size(&graph, nodes[1], &config), Size::new(160.0, 60.0));
    }

    #[test]
    fn fitted_labels_grow_step_height() {
        let (mut graph, nodes) = graph_with_column(&[1]);
        if let NodeTag::Step(step) = &mut graph.node_mut(nodes[0]).tag {
            step.description =
                "The system checks the account balance against the requested amount and the daily limit"
                    .to_string();
        }
        let config = LayoutConfig {
            fit_labels: true,
            ..LayoutConfig::default()
        };
        let size = node_size(&graph, nodes[0], &config);
        assert_eq!(size.width, 160.0);
        assert!(size.height > 60.0, "height {}", size.height);
    }

    #[test]
    fn table_adds_spacing_and_first_row_extra() {
        let (graph, nodes) = graph_with_column(&[1, 2]);
        let config = LayoutConfig::default();
        let mut deco = LayoutDecorations::new(graph.node_count(), graph.flow_count());
        deco.node_mut(nodes[1]).row = 1;
        assign_sizes(&graph, &mut deco, &config);
        let table = build_table(&graph, &deco, &config);
        assert_eq!(table.row_sizes, vec![115.0, 100.0]);
        assert_eq!(table.row_offsets, vec![0.0, 115.0]);
        assert_eq!(table.col_sizes, vec![200.0]);

        position_nodes(&graph, &mut deco, &table);
        assert_eq!(deco.node(nodes[0]).rect, Rect::new(20.0, 27.5, 160.0, 60.0));
        assert_eq!(deco.node(nodes[1]).rect, Rect::new(20.0, 135.0, 160.0, 60.0));

        position_flows(&graph, &mut deco, &config);
        let main = deco.flow(graph.main_flow()).rect;
        assert_eq!(main, Rect::new(10.0, 17.5, 180.0, 187.5));
    }
}
