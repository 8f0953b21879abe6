use serde::Serialize;

use crate::ir::{FlowId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn inflate(&self, by: f32) -> Rect {
        Rect::new(
            self.x - by,
            self.y - by,
            self.width + by * 2.0,
            self.height + by * 2.0,
        )
    }

    /// Middle of the given side.
    pub fn anchor(&self, side: Side) -> Point {
        match side {
            Side::Top => Point::new(self.center_x(), self.y),
            Side::Bottom => Point::new(self.center_x(), self.bottom()),
            Side::Left => Point::new(self.x, self.center_y()),
            Side::Right => Point::new(self.right(), self.center_y()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Default)]
pub struct NodeDecoration {
    pub row: i32,
    pub col: i32,
    pub hidden: bool,
    /// Node drawn in place of this one while it is hidden.
    pub replacement: Option<NodeId>,
    pub rect: Rect,
}

#[derive(Debug, Clone, Default)]
pub struct FlowDecoration {
    pub row: i32,
    pub col: i32,
    pub hidden: bool,
    pub rect: Rect,
}

/// Layout state for one graph, indexed by the graph's node and flow ids.
#[derive(Debug, Clone, Default)]
pub struct LayoutDecorations {
    pub nodes: Vec<NodeDecoration>,
    pub flows: Vec<FlowDecoration>,
}

impl LayoutDecorations {
    pub fn new(node_count: usize, flow_count: usize) -> Self {
        Self {
            nodes: vec![NodeDecoration::default(); node_count],
            flows: vec![FlowDecoration::default(); flow_count],
        }
    }

    pub fn node(&self, id: NodeId) -> &NodeDecoration {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeDecoration {
        &mut self.nodes[id.0]
    }

    pub fn flow(&self, id: FlowId) -> &FlowDecoration {
        &self.flows[id.0]
    }

    pub fn flow_mut(&mut self, id: FlowId) -> &mut FlowDecoration {
        &mut self.flows[id.0]
    }

    /// Follows the replacement chain to the node that is actually drawn.
    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        // A chain never revisits a node, so its length is bounded by the node count.
        for _ in 0..self.nodes.len() {
            match self.nodes[id.0].replacement {
                Some(next) if next != id => id = next,
                _ => break,
            }
        }
        id
    }
}

/// Row heights and column widths of the layout grid, with their offsets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GridTable {
    pub row_sizes: Vec<f32>,
    pub row_offsets: Vec<f32>,
    /// Column index of `col_sizes[0]`.
    pub min_col: i32,
    pub col_sizes: Vec<f32>,
    pub col_offsets: Vec<f32>,
}

impl GridTable {
    fn col_index(&self, col: i32) -> Option<usize> {
        usize::try_from(col - self.min_col)
            .ok()
            .filter(|idx| *idx < self.col_sizes.len())
    }

    pub fn cell(&self, row: i32, col: i32) -> Rect {
        let (y, height) = usize::try_from(row)
            .ok()
            .and_then(|r| Some((*self.row_offsets.get(r)?, *self.row_sizes.get(r)?)))
            .unwrap_or_default();
        let (x, width) = self
            .col_index(col)
            .map(|c| (self.col_offsets[c], self.col_sizes[c]))
            .unwrap_or_default();
        Rect::new(x, y, width, height)
    }

    pub fn width(&self) -> f32 {
        self.col_sizes.iter().sum()
    }

    pub fn height(&self) -> f32 {
        self.row_sizes.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Between consecutive nodes of one flow.
    Flow,
    /// From a branch point into the first node of an alternate flow.
    Branch,
    /// From the end of an alternate flow back to its return target.
    Return,
}

/// One routed connector.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    pub kind: ConnectionKind,
    pub start: NodeId,
    pub start_side: Side,
    pub end: NodeId,
    pub end_side: Side,
    pub visible: bool,
    pub points: Vec<Point>,
}

impl ConnectionInfo {
    pub fn is_return(&self) -> bool {
        self.kind == ConnectionKind::Return
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    pub decorations: LayoutDecorations,
    pub table: GridTable,
    pub connections: Vec<ConnectionInfo>,
    pub width: f32,
    pub height: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_union_and_inflate() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 10.0, 20.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 30.0, 25.0));
        assert_eq!(a.inflate(2.0), Rect::new(-2.0, -2.0, 14.0, 14.0));
    }

    #[test]
    fn anchors_sit_on_side_midpoints() {
        let r = Rect::new(10.0, 20.0, 40.0, 20.0);
        assert_eq!(r.anchor(Side::Top), Point::new(30.0, 20.0));
        assert_eq!(r.anchor(Side::Bottom), Point::new(30.0, 40.0));
        assert_eq!(r.anchor(Side::Left), Point::new(10.0, 30.0));
        assert_eq!(r.anchor(Side::Right), Point::new(50.0, 30.0));
    }

    #[test]
    fn resolve_follows_replacement_chain() {
        let mut deco = LayoutDecorations::new(3, 1);
        deco.nodes[2].replacement = Some(NodeId(1));
        deco.nodes[1].replacement = Some(NodeId(0));
        assert_eq!(deco.resolve(NodeId(2)), NodeId(0));
        assert_eq!(deco.resolve(NodeId(0)), NodeId(0));
    }

    #[test]
    fn grid_cell_handles_negative_columns() {
        let table = GridTable {
            row_sizes: vec![10.0, 20.0],
            row_offsets: vec![0.0, 10.0],
            min_col: -1,
            col_sizes: vec![30.0, 40.0],
            col_offsets: vec![0.0, 30.0],
        };
        assert_eq!(table.cell(1, 0), Rect::new(30.0, 10.0, 40.0, 20.0));
        assert_eq!(table.cell(0, -1), Rect::new(0.0, 0.0, 30.0, 10.0));
        assert_eq!(table.width(), 70.0);
        assert_eq!(table.height(), 30.0);
    }
}
