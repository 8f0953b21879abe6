use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::ir::{FlowGraph, NodeId, NodeTag};
use crate::layout::{ConnectionInfo, LayoutResult, Point};
use crate::text::measure_label;
use crate::usecase::{StepOf, UseCase};

/// Laid-out use case, ready for a renderer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    pub id: i64,
    pub diagram_type: String,
    pub shapes: Vec<Shape>,
    pub connections: Vec<Connection>,
    pub width: f32,
    pub height: f32,
    pub library_version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeKind {
    PrePostCondition,
    Branching,
    Step,
    Exit,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: String,
    /// Id of the step, or the negated id of a synthetic marker.
    pub element_id: i64,
    pub name: String,
    pub label: String,
    pub label_lines: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_of: Option<StepOf>,
    pub condition: bool,
    pub external: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
    Straight,
    RightAngled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: ConnectorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    pub is_return: bool,
}

/// Shape id for a node; unique within one diagram.
pub fn shape_id(tag: &NodeTag) -> String {
    match tag {
        NodeTag::Step(step) => format!("step-{}", step.id),
        NodeTag::Branching { step_id, .. } => format!("branch-{step_id}"),
        NodeTag::Exit { flow_id, .. } => format!("exit-{flow_id}"),
    }
}

pub struct FlowGraphDiagramBuilder<'a> {
    config: &'a Config,
}

impl<'a> FlowGraphDiagramBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn build_diagram(&self, graph: &FlowGraph, layout: &LayoutResult, use_case: &UseCase) -> Diagram {
        let shapes: Vec<Shape> = graph
            .nodes()
            .filter(|(id, _)| !layout.decorations.node(*id).hidden)
            .map(|(id, _)| self.shape(graph, layout, use_case, id))
            .collect();
        let connections: Vec<Connection> = layout
            .connections
            .iter()
            .filter(|info| info.visible)
            .map(|info| connection(graph, info))
            .collect();
        let (width, height) = diagram_extent(&shapes, self.config.diagram.diagram_margin);
        debug!(
            shapes = shapes.len(),
            connections = connections.len(),
            width,
            height,
            "built diagram"
        );
        Diagram {
            id: use_case.id,
            diagram_type: self.config.diagram.diagram_type.clone(),
            shapes,
            connections,
            width,
            height,
            library_version: self.config.diagram.library_version,
        }
    }

    fn shape(&self, graph: &FlowGraph, layout: &LayoutResult, use_case: &UseCase, id: NodeId) -> Shape {
        let tag = &graph.node(id).tag;
        let rect = layout.decorations.node(id).rect;
        let label = tag.label();
        let layout_config = &self.config.layout;
        let label_lines = if label.is_empty() {
            Vec::new()
        } else {
            measure_label(
                &label,
                (rect.width - layout_config.label_padding * 2.0).max(1.0),
                layout_config.font_size,
                layout_config.label_line_height,
            )
            .lines
        };
        let step = tag.as_step();
        Shape {
            id: shape_id(tag),
            element_id: tag.element_id(),
            name: tag.name(),
            label,
            label_lines,
            kind: shape_kind(tag, use_case),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            step_of: step.map(|step| step.step_of),
            condition: step.is_some_and(|step| step.condition),
            external: step.is_some_and(|step| step.external),
        }
    }
}

fn shape_kind(tag: &NodeTag, use_case: &UseCase) -> ShapeKind {
    match tag {
        NodeTag::Branching { .. } => ShapeKind::Branching,
        NodeTag::Exit { .. } => ShapeKind::Exit,
        NodeTag::Step(step) => {
            let is_condition = [&use_case.pre_condition, &use_case.post_condition]
                .into_iter()
                .flatten()
                .any(|condition| condition.id == step.id);
            if is_condition {
                ShapeKind::PrePostCondition
            } else {
                ShapeKind::Step
            }
        }
    }
}

fn connection(graph: &FlowGraph, info: &ConnectionInfo) -> Connection {
    let (kind, points) = if info.points.len() > 2 {
        (ConnectorKind::RightAngled, Some(info.points.clone()))
    } else {
        (ConnectorKind::Straight, None)
    };
    Connection {
        source_id: shape_id(&graph.node(info.start).tag),
        target_id: shape_id(&graph.node(info.end).tag),
        kind,
        points,
        is_return: info.is_return(),
    }
}

/// Diagram size: the far edge of the outermost shapes plus `margin`.
pub fn diagram_extent(shapes: &[Shape], margin: f32) -> (f32, f32) {
    shapes.iter().fold((0.0f32, 0.0f32), |(width, height), shape| {
        (
            width.max(shape.x + shape.width + margin),
            height.max(shape.y + shape.height + margin),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StepTag;
    use crate::layout::{ConnectionKind, LayoutDecorations, Rect, Side};
    use crate::usecase::Step;

    fn two_node_layout(points: Vec<Point>) -> (FlowGraph, LayoutResult, UseCase) {
        let pre = Step::new(1, "Pre");
        let body = Step::new(3, "Body");
        let mut graph = FlowGraph::new();
        let main = graph.main_flow();
        for step in [&pre, &body] {
            let node = graph.add_node(NodeTag::Step(StepTag::from_step(step)));
            graph.append_node(main, node).unwrap();
        }
        let mut decorations = LayoutDecorations::new(2, 1);
        decorations.nodes[0].rect = Rect::new(20.0, 27.5, 160.0, 60.0);
        decorations.nodes[1].rect = Rect::new(20.0, 135.0, 160.0, 60.0);
        let layout = LayoutResult {
            decorations,
            connections: vec![ConnectionInfo {
                kind: ConnectionKind::Flow,
                start: NodeId(0),
                start_side: Side::Bottom,
                end: NodeId(1),
                end_side: Side::Top,
                visible: true,
                points,
            }],
            ..Default::default()
        };
        let use_case = UseCase {
            id: 42,
            pre_condition: Some(pre),
            steps: vec![body],
            ..Default::default()
        };
        (graph, layout, use_case)
    }

    #[test]
    fn two_point_connection_is_straight() {
        let config = Config::default();
        let (graph, layout, use_case) =
            two_node_layout(vec![Point::new(100.0, 87.5), Point::new(100.0, 135.0)]);
        let diagram = FlowGraphDiagramBuilder::new(&config).build_diagram(&graph, &layout, &use_case);
        assert_eq!(diagram.id, 42);
        assert_eq!(diagram.diagram_type, "usecase");
        assert_eq!(diagram.connections.len(), 1);
        let conn = &diagram.connections[0];
        assert_eq!(conn.kind, ConnectorKind::Straight);
        assert!(conn.points.is_none());
        assert_eq!((conn.source_id.as_str(), conn.target_id.as_str()), ("step-1", "step-3"));

        let kinds: Vec<_> = diagram.shapes.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![ShapeKind::PrePostCondition, ShapeKind::Step]);
        assert_eq!((diagram.width, diagram.height), (210.0, 225.0));
    }

    #[test]
    fn bent_connection_keeps_its_points() {
        let config = Config::default();
        let points = vec![
            Point::new(100.0, 87.5),
            Point::new(100.0, 110.0),
            Point::new(60.0, 110.0),
            Point::new(60.0, 135.0),
        ];
        let (graph, layout, use_case) = two_node_layout(points.clone());
        let diagram = FlowGraphDiagramBuilder::new(&config).build_diagram(&graph, &layout, &use_case);
        let conn = &diagram.connections[0];
        assert_eq!(conn.kind, ConnectorKind::RightAngled);
        assert_eq!(conn.points.as_deref(), Some(points.as_slice()));
    }

    #[test]
    fn hidden_nodes_and_connections_are_left_out() {
        let config = Config::default();
        let (graph, mut layout, use_case) = two_node_layout(Vec::new());
        layout.decorations.nodes[1].hidden = true;
        layout.connections[0].visible = false;
        let diagram = FlowGraphDiagramBuilder::new(&config).build_diagram(&graph, &layout, &use_case);
        assert_eq!(diagram.shapes.len(), 1);
        assert!(diagram.connections.is_empty());
    }

    #[test]
    fn extent_adds_margin_to_outermost_shape() {
        let shapes: Vec<Shape> = [0.0, 100.0, 200.0]
            .into_iter()
            .map(|offset| Shape {
                id: format!("step-{offset}"),
                element_id: 0,
                name: String::new(),
                label: String::new(),
                label_lines: Vec::new(),
                kind: ShapeKind::Step,
                x: offset,
                y: offset,
                width: 100.0,
                height: 100.0,
                step_of: None,
                condition: false,
                external: false,
            })
            .collect();
        assert_eq!(diagram_extent(&shapes, 30.0), (330.0, 330.0));
        assert_eq!(diagram_extent(&[], 30.0), (0.0, 0.0));
    }

    #[test]
    fn serializes_renderer_field_names() {
        let config = Config::default();
        let (graph, layout, use_case) = two_node_layout(vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 5.0),
            Point::new(5.0, 5.0),
        ]);
        let diagram = FlowGraphDiagramBuilder::new(&config).build_diagram(&graph, &layout, &use_case);
        let json = serde_json::to_value(&diagram).unwrap();
        assert_eq!(json["diagramType"], "usecase");
        assert_eq!(json["libraryVersion"], 1);
        assert_eq!(json["shapes"][0]["type"], "PRE_POST_CONDITION");
        assert_eq!(json["shapes"][1]["stepOf"], "actor");
        assert_eq!(json["connections"][0]["type"], "right-angled");
        assert_eq!(json["connections"][0]["sourceId"], "step-1");
        assert_eq!(json["connections"][0]["points"][2]["x"], 5.0);
    }
}
