use tracing::debug;

use crate::config::LayoutConfig;
use crate::ir::{FlowGraph, FlowId, NodeId};

use super::{ConnectionInfo, ConnectionKind, GridTable, LayoutDecorations, Point, Side};

struct Router<'a> {
    graph: &'a FlowGraph,
    deco: &'a LayoutDecorations,
    table: &'a GridTable,
    /// Clearance kept between a bent connector and the shapes around it.
    margin: f32,
    /// Distance of a column-edge channel from the cell border.
    inset: f32,
    connections: Vec<ConnectionInfo>,
}

pub(super) fn compute_connections(
    graph: &FlowGraph,
    deco: &LayoutDecorations,
    table: &GridTable,
    config: &LayoutConfig,
) -> Vec<ConnectionInfo> {
    let mut router = Router {
        graph,
        deco,
        table,
        margin: config.connector_end_point_spacing,
        inset: config
            .connector_end_point_spacing
            .min(config.horizontal_cell_spacing / 2.0),
        connections: Vec::new(),
    };
    let order = graph.flow_order();
    let shown: Vec<FlowId> = order
        .iter()
        .copied()
        .filter(|flow| !deco.flow(*flow).hidden)
        .collect();

    for flow in &shown {
        router.flow_connections(*flow);
    }
    for flow in &shown {
        router.branch_connection(*flow);
    }
    // Flows hidden inside a collapsed flow still return; both ends resolve
    // to the nodes drawn in their place.
    for flow in &order {
        router.return_connection(*flow);
    }
    debug!(connections = router.connections.len(), "routed connections");
    router.connections
}

impl Router<'_> {
    fn push(
        &mut self,
        kind: ConnectionKind,
        start: Option<NodeId>,
        start_side: Side,
        end: Option<NodeId>,
        end_side: Side,
        points: Vec<Point>,
    ) {
        let (Some(start), Some(end)) = (start, end) else {
            return;
        };
        let visible = !self.deco.node(start).hidden && !self.deco.node(end).hidden;
        self.connections.push(ConnectionInfo {
            kind,
            start,
            start_side,
            end,
            end_side,
            visible,
            points,
        });
    }

    fn flow_connections(&mut self, flow_id: FlowId) {
        let flow = self.graph.flow(flow_id);
        if flow.collapsed {
            return;
        }
        let visible: Vec<NodeId> = flow
            .nodes
            .iter()
            .copied()
            .filter(|node| !self.deco.node(*node).hidden)
            .collect();
        for pair in visible.windows(2) {
            let from = self.deco.node(pair[0]).rect;
            let to = self.deco.node(pair[1]).rect;
            self.push(
                ConnectionKind::Flow,
                Some(pair[0]),
                Side::Bottom,
                Some(pair[1]),
                Side::Top,
                vec![from.anchor(Side::Bottom), to.anchor(Side::Top)],
            );
        }
    }

    fn branch_connection(&mut self, flow_id: FlowId) {
        let flow = self.graph.flow(flow_id);
        let Some(alternate) = &flow.alternate else {
            return;
        };
        let (Some(start), Some(first)) = (alternate.start_node, flow.first_node()) else {
            return;
        };
        let start = self.deco.resolve(start);
        let first = self.deco.resolve(first);
        let source = self.deco.node(start);
        let target = self.deco.node(first);
        let side = if target.col > source.col {
            Side::Right
        } else {
            Side::Left
        };
        let exit = source.rect.anchor(side);
        let entry = target.rect.anchor(Side::Top);
        let points = vec![exit, Point::new(entry.x, exit.y), entry];
        self.push(
            ConnectionKind::Branch,
            Some(start),
            side,
            Some(first),
            Side::Top,
            points,
        );
    }

    fn return_connection(&mut self, flow_id: FlowId) {
        let flow = self.graph.flow(flow_id);
        let Some(alternate) = &flow.alternate else {
            return;
        };
        let Some(last) = flow.last_node().map(|node| self.deco.resolve(node)) else {
            return;
        };
        let end = alternate.end_node.map(|node| self.deco.resolve(node));
        // Flows that end in their own exit node have nothing to return to.
        if end == Some(last) {
            return;
        }
        let Some(target) = end else {
            self.push(
                ConnectionKind::Return,
                Some(last),
                Side::Bottom,
                None,
                Side::Top,
                Vec::new(),
            );
            return;
        };
        let (start_side, end_side, points) = self.route_return(last, target);
        self.push(
            ConnectionKind::Return,
            Some(last),
            start_side,
            Some(target),
            end_side,
            points,
        );
    }

    /// Orthogonal route from the end of a flow to the node it returns to.
    fn route_return(&self, from: NodeId, to: NodeId) -> (Side, Side, Vec<Point>) {
        let source = self.deco.node(from);
        let target = self.deco.node(to);
        let (s, t) = (source.rect, target.rect);

        if target.row < source.row {
            // Going back up: drop below the source, then climb along the
            // edge of the target's column.
            let side = if source.col < target.col {
                Side::Left
            } else {
                Side::Right
            };
            let edge_x = self.column_edge(target.row, target.col, side);
            let drop_y = s.bottom() + self.margin;
            let points = vec![
                s.anchor(Side::Bottom),
                Point::new(s.center_x(), drop_y),
                Point::new(edge_x, drop_y),
                Point::new(edge_x, t.center_y()),
                t.anchor(side),
            ];
            return (Side::Bottom, side, points);
        }

        if source.col == target.col {
            let Some(blocker) = self.first_collider(source.col, source.row, target.row, false, from, to)
            else {
                return (
                    Side::Bottom,
                    Side::Top,
                    vec![s.anchor(Side::Bottom), t.anchor(Side::Top)],
                );
            };
            let side = if source.col < 0 { Side::Left } else { Side::Right };
            let jog_x = self.column_edge(self.deco.node(blocker).row, source.col, side);
            let below = s.bottom() + self.margin;
            let above = t.y - self.margin;
            let points = vec![
                s.anchor(Side::Bottom),
                Point::new(s.center_x(), below),
                Point::new(jog_x, below),
                Point::new(jog_x, above),
                Point::new(t.center_x(), above),
                t.anchor(Side::Top),
            ];
            return (Side::Bottom, Side::Top, points);
        }

        let toward = if target.col < source.col {
            Side::Left
        } else {
            Side::Right
        };
        let end_side = opposite(toward);
        if target.row == source.row {
            return (
                toward,
                end_side,
                vec![s.anchor(toward), t.anchor(end_side)],
            );
        }

        match self.first_collider(source.col, source.row, target.row, true, from, to) {
            None => (
                Side::Bottom,
                end_side,
                vec![
                    s.anchor(Side::Bottom),
                    Point::new(s.center_x(), t.center_y()),
                    t.anchor(end_side),
                ],
            ),
            Some(blocker) => {
                let blocker = self.deco.node(blocker);
                let jog_x = self.column_edge(blocker.row, source.col, toward);
                let jog_y = blocker.rect.y - self.margin;
                let points = vec![
                    s.anchor(Side::Bottom),
                    Point::new(s.center_x(), jog_y),
                    Point::new(jog_x, jog_y),
                    Point::new(jog_x, t.center_y()),
                    t.anchor(end_side),
                ];
                (Side::Bottom, end_side, points)
            }
        }
    }

    /// X of the channel running along the `side` edge of a column.
    fn column_edge(&self, row: i32, col: i32, side: Side) -> f32 {
        let cell = self.table.cell(row, col);
        match side {
            Side::Left => cell.x + self.inset,
            _ => cell.right() - self.inset,
        }
    }

    /// First visible node in `col` strictly below `from_row` and above
    /// `to_row` (or on it when `inclusive`), ignoring the endpoints.
    fn first_collider(
        &self,
        col: i32,
        from_row: i32,
        to_row: i32,
        inclusive: bool,
        from: NodeId,
        to: NodeId,
    ) -> Option<NodeId> {
        self.graph
            .nodes()
            .map(|(id, _)| id)
            .filter(|id| *id != from && *id != to)
            .filter(|id| {
                let node = self.deco.node(*id);
                let below = node.row > from_row;
                let above = if inclusive {
                    node.row <= to_row
                } else {
                    node.row < to_row
                };
                !node.hidden && node.col == col && below && above
            })
            .min_by_key(|id| (self.deco.node(*id).row, id.0))
    }
}

fn opposite(side: Side) -> Side {
    match side {
        Side::Left => Side::Right,
        Side::Right => Side::Left,
        Side::Top => Side::Bottom,
        Side::Bottom => Side::Top,
    }
}
