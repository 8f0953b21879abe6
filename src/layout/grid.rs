//! Row and column assignment.
//!
//! Rows grow downwards along every flow. An alternate flow starts one row
//! below its branch point and runs in its own column beside the flow it
//! branches from; the main flow owns column 0. A placed flow keeps its
//! column from the row of its branch point down to its last node, so no
//! other flow is put between two of its nodes or across its branch connector.

use std::collections::HashMap;

use tracing::debug;

use crate::config::LayoutConfig;
use crate::ir::{FlowGraph, FlowId, NodeId};

use super::LayoutDecorations;

struct RowState {
    max_row: i32,
    assigned: Vec<bool>,
    /// Alternate flows by the node they return to.
    returns_into: HashMap<NodeId, Vec<FlowId>>,
}

pub(super) fn assign_rows(graph: &FlowGraph, deco: &mut LayoutDecorations, config: &LayoutConfig) {
    let mut returns_into: HashMap<NodeId, Vec<FlowId>> = HashMap::new();
    for (flow_id, _, alternate) in graph.alternate_flows() {
        if let Some(end) = alternate.end_node {
            returns_into.entry(end).or_default().push(flow_id);
        }
    }
    let mut state = RowState {
        max_row: -1,
        assigned: vec![false; graph.node_count()],
        returns_into,
    };
    assign_flow_rows(graph, graph.main_flow(), 0, deco, &mut state, config);
    debug!(rows = state.max_row + 1, "assigned rows");
}

fn visible_branches(graph: &FlowGraph, deco: &LayoutDecorations, node: NodeId) -> Vec<FlowId> {
    graph
        .node(node)
        .alternate_flows
        .iter()
        .copied()
        .filter(|flow| !deco.flow(*flow).hidden && !graph.flow(*flow).nodes.is_empty())
        .collect()
}

fn last_visible_node(graph: &FlowGraph, deco: &LayoutDecorations, flow: FlowId) -> Option<NodeId> {
    graph.flow(flow).last_node().map(|node| deco.resolve(node))
}

fn assign_flow_rows(
    graph: &FlowGraph,
    flow_id: FlowId,
    start_row: i32,
    deco: &mut LayoutDecorations,
    state: &mut RowState,
    config: &LayoutConfig,
) {
    let mut next_row = start_row;
    let mut first_row = None;

    for &node in &graph.flow(flow_id).nodes {
        if deco.node(node).hidden {
            continue;
        }
        let branches = visible_branches(graph, deco, node);
        let mut row = next_row;
        if !branches.is_empty() {
            row = row.max(state.max_row + 1);
        }
        if !config.disable_vertical_displacement {
            row = row.max(displaced_row(graph, deco, state, node));
        }

        deco.node_mut(node).row = row;
        state.assigned[node.0] = true;
        state.max_row = state.max_row.max(row);
        first_row.get_or_insert(row);

        for branch in branches {
            assign_flow_rows(graph, branch, row + 1, deco, state, config);
        }
        next_row = row + 1;
    }

    deco.flow_mut(flow_id).row = first_row.unwrap_or(start_row);
}

/// Lowest row `node` may take so that no flow returning into it has to
/// climb: it must sit below the last node of every such flow already placed.
fn displaced_row(graph: &FlowGraph, deco: &LayoutDecorations, state: &RowState, node: NodeId) -> i32 {
    let Some(flows) = state.returns_into.get(&node) else {
        return 0;
    };
    flows
        .iter()
        .filter_map(|flow| last_visible_node(graph, deco, *flow))
        .filter(|last| *last != node && state.assigned[last.0])
        .map(|last| deco.node(last).row + 1)
        .max()
        .unwrap_or(0)
}

/// What keeps a grid cell from taking another flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupant {
    /// A cell inside a placed flow's row span, between its first and last node.
    Span,
    /// The vertical leg of the branch connector leaving this branch point.
    Lane(NodeId),
}

struct ColumnState {
    min_col: i32,
    max_col: i32,
    occupied: HashMap<(i32, i32), Occupant>,
}

impl ColumnState {
    fn is_free(&self, row: i32, col: i32) -> bool {
        !self.occupied.contains_key(&(row, col))
    }

    fn has_span(&self, row: i32, col: i32) -> bool {
        self.occupied.get(&(row, col)) == Some(&Occupant::Span)
    }

    /// Whether the horizontal leg of a branch connector from `branch` at
    /// (`row`, `from_col`) to `to_col` runs through another flow. Lanes of
    /// sibling branches share the leg and do not count.
    fn crosses(&self, branch: NodeId, row: i32, from_col: i32, to_col: i32) -> bool {
        let (lo, hi) = if to_col > from_col {
            (from_col + 1, to_col)
        } else {
            (to_col + 1, from_col)
        };
        (lo..hi).any(|col| match self.occupied.get(&(row, col)) {
            None => false,
            Some(occupant) => *occupant != Occupant::Lane(branch),
        })
    }

    /// First column from `start`, stepping by `step`, that holds the rows
    /// `branch_row..=last_row` free. `None` once the connector would have to
    /// cross another flow to get there.
    fn search(
        &self,
        branch: NodeId,
        branch_row: i32,
        from_col: i32,
        start: i32,
        step: i32,
        last_row: i32,
    ) -> Option<i32> {
        let mut candidate = start;
        loop {
            if self.crosses(branch, branch_row, from_col, candidate) {
                return None;
            }
            if (branch_row..=last_row).all(|row| self.is_free(row, candidate)) {
                return Some(candidate);
            }
            candidate += step;
        }
    }

    fn claim(&mut self, branch: Option<(NodeId, i32)>, col: i32, rows: (i32, i32)) {
        let (first_row, last_row) = rows;
        if let Some((branch, branch_row)) = branch {
            for row in branch_row..first_row {
                self.occupied.insert((row, col), Occupant::Lane(branch));
            }
        }
        for row in first_row..=last_row {
            self.occupied.insert((row, col), Occupant::Span);
        }
    }
}

pub(super) fn assign_columns(graph: &FlowGraph, deco: &mut LayoutDecorations) {
    let mut state = ColumnState {
        min_col: 0,
        max_col: 0,
        occupied: HashMap::new(),
    };
    assign_flow_columns(graph, graph.main_flow(), 0, None, deco, &mut state);
    debug!(
        min_col = state.min_col,
        max_col = state.max_col,
        "assigned columns"
    );
}

fn assign_flow_columns(
    graph: &FlowGraph,
    flow_id: FlowId,
    col: i32,
    branch: Option<(NodeId, i32)>,
    deco: &mut LayoutDecorations,
    state: &mut ColumnState,
) {
    deco.flow_mut(flow_id).col = col;
    state.min_col = state.min_col.min(col);
    state.max_col = state.max_col.max(col);

    let visible: Vec<NodeId> = graph
        .flow(flow_id)
        .nodes
        .iter()
        .copied()
        .filter(|node| !deco.node(*node).hidden)
        .collect();
    for &node in &visible {
        deco.node_mut(node).col = col;
    }
    if let Some(rows) = flow_span(graph, deco, flow_id) {
        state.claim(branch, col, rows);
    }

    for &node in &visible {
        let row = deco.node(node).row;
        // Offsets of the outermost branch columns used so far at this branch point.
        let mut min_offset = 0;
        let mut max_offset = 0;
        let mut last_went_right: Option<bool> = None;
        for alternate in visible_branches(graph, deco, node) {
            let Some((first_row, last_row)) = flow_span(graph, deco, alternate) else {
                continue;
            };
            let prefer_right = match last_went_right {
                None => {
                    let blocked = state.has_span(first_row - 1, col + 1)
                        || state.has_span(first_row - 2, col + 1);
                    !blocked
                }
                Some(went_right) => !went_right,
            };

            let right = |state: &ColumnState| {
                state.search(node, row, col, col + max_offset + 1, 1, last_row)
            };
            let left = |state: &ColumnState| {
                state.search(node, row, col, col + min_offset - 1, -1, last_row)
            };
            let placed = if prefer_right {
                right(&*state)
                    .map(|c| (c, true))
                    .or_else(|| left(&*state).map(|c| (c, false)))
            } else {
                left(&*state)
                    .map(|c| (c, false))
                    .or_else(|| right(&*state).map(|c| (c, true)))
            };
            let (branch_col, went_right) = placed.unwrap_or_else(|| {
                // Both sides are walled in; take the first column beyond
                // every flow placed so far.
                debug!(
                    branch = %node,
                    flow = %alternate,
                    "branch connector crosses another flow"
                );
                if prefer_right {
                    (state.max_col + 1, true)
                } else {
                    (state.min_col - 1, false)
                }
            });
            if went_right {
                max_offset = max_offset.max(branch_col - col);
            } else {
                min_offset = min_offset.min(branch_col - col);
            }
            last_went_right = Some(went_right);
            assign_flow_columns(graph, alternate, branch_col, Some((node, row)), deco, state);
        }
    }
}

/// First and last row of the visible nodes of `flow`.
fn flow_span(graph: &FlowGraph, deco: &LayoutDecorations, flow: FlowId) -> Option<(i32, i32)> {
    let mut rows = graph
        .flow(flow)
        .nodes
        .iter()
        .filter(|node| !deco.node(**node).hidden)
        .map(|node| deco.node(*node).row);
    let first = rows.next()?;
    let last = rows.fold(first, i32::max);
    Some((first, last))
}

/// Hidden nodes and flows take the cell of the node drawn in their place.
pub(super) fn inherit_hidden_cells(graph: &FlowGraph, deco: &mut LayoutDecorations) {
    for (node, _) in graph.nodes() {
        if deco.node(node).hidden {
            let shown = deco.resolve(node);
            let (row, col) = (deco.node(shown).row, deco.node(shown).col);
            let node_deco = deco.node_mut(node);
            node_deco.row = row;
            node_deco.col = col;
        }
    }
    for (flow_id, flow) in graph.flows() {
        if !deco.flow(flow_id).hidden {
            continue;
        }
        if let Some(first) = flow.first_node() {
            let shown = deco.resolve(first);
            let (row, col) = (deco.node(shown).row, deco.node(shown).col);
            let flow_deco = deco.flow_mut(flow_id);
            flow_deco.row = row;
            flow_deco.col = col;
        }
    }
}
