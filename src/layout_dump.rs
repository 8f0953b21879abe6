use crate::diagram::shape_id;
use crate::ir::{FlowGraph, NodeId};
use crate::layout::{ConnectionKind, GridTable, LayoutResult, Side};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Everything the layout decided, for inspecting a diagram that came out wrong.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub flows: Vec<FlowDump>,
    pub table: GridTable,
    pub connections: Vec<ConnectionDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub row: i32,
    pub col: i32,
    pub hidden: bool,
    pub replacement: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct FlowDump {
    pub index: usize,
    /// Use-case flow id; `None` for the main flow.
    pub id: Option<i64>,
    pub name: Option<String>,
    pub row: i32,
    pub col: i32,
    pub hidden: bool,
    pub collapsed: bool,
    pub nodes: Vec<String>,
    pub end: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct ConnectionDump {
    pub kind: ConnectionKind,
    pub from: String,
    pub from_side: Side,
    pub to: String,
    pub to_side: Side,
    pub visible: bool,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(graph: &FlowGraph, layout: &LayoutResult) -> Self {
        let deco = &layout.decorations;
        let name_of = |id: NodeId| shape_id(&graph.node(id).tag);

        let nodes = graph
            .nodes()
            .map(|(id, node)| {
                let node_deco = deco.node(id);
                NodeDump {
                    id: shape_id(&node.tag),
                    row: node_deco.row,
                    col: node_deco.col,
                    hidden: node_deco.hidden,
                    replacement: node_deco.replacement.map(name_of),
                    x: node_deco.rect.x,
                    y: node_deco.rect.y,
                    width: node_deco.rect.width,
                    height: node_deco.rect.height,
                }
            })
            .collect();

        let flows = graph
            .flows()
            .map(|(id, flow)| {
                let flow_deco = deco.flow(id);
                FlowDump {
                    index: id.0,
                    id: flow.tag.as_ref().map(|tag| tag.id),
                    name: flow.tag.as_ref().map(|tag| tag.name.clone()),
                    row: flow_deco.row,
                    col: flow_deco.col,
                    hidden: flow_deco.hidden,
                    collapsed: flow.collapsed,
                    nodes: flow.nodes.iter().map(|node| name_of(*node)).collect(),
                    end: flow
                        .alternate
                        .as_ref()
                        .and_then(|alt| alt.end_node)
                        .map(name_of),
                    x: flow_deco.rect.x,
                    y: flow_deco.rect.y,
                    width: flow_deco.rect.width,
                    height: flow_deco.rect.height,
                }
            })
            .collect();

        let connections = layout
            .connections
            .iter()
            .map(|conn| ConnectionDump {
                kind: conn.kind,
                from: name_of(conn.start),
                from_side: conn.start_side,
                to: name_of(conn.end),
                to_side: conn.end_side,
                visible: conn.visible,
                points: conn.points.iter().map(|p| [p.x, p.y]).collect(),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            nodes,
            flows,
            table: layout.table.clone(),
            connections,
        }
    }
}

pub fn write_layout_dump(path: &Path, graph: &FlowGraph, layout: &LayoutResult) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(graph, layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::UsecaseToDiagram;
    use crate::usecase::{Flow, Step, UseCase};

    #[test]
    fn dump_names_nodes_by_shape_id() {
        let use_case = UseCase {
            steps: vec![Step::new(3, "Check").with_flow(
                Flow::new(4, "Retry")
                    .returning_to("Check")
                    .with_step(Step::new(5, "Wait")),
            )],
            ..Default::default()
        };
        let (graph, layout) = UsecaseToDiagram::default().arrange(&use_case).unwrap();
        let dump = LayoutDump::from_layout(&graph, &layout);

        let ids: Vec<_> = dump.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["branch-3", "step-3", "step-5"]);
        assert_eq!(dump.flows.len(), 2);
        assert_eq!(dump.flows[1].id, Some(4));
        assert_eq!(dump.flows[1].end.as_deref(), Some("step-3"));
        let ret = dump.connections.last().unwrap();
        assert_eq!(ret.kind, ConnectionKind::Return);
        assert_eq!(ret.from, "step-5");

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["connections"][0]["kind"], "flow");
        assert_eq!(json["connections"][0]["from_side"], "bottom");
        assert!(json["table"]["row_sizes"].is_array());
    }
}
