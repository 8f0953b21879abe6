use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with an alternate flow whose return target names no step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnTargetPolicy {
    /// Refuse to lay out the graph.
    #[default]
    Fail,
    /// Lay out the graph and leave the return connector out.
    Omit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_default_width: f32,
    pub node_default_height: f32,
    pub branching_node_width: f32,
    pub branching_node_height: f32,
    pub exit_node_width: f32,
    pub exit_node_height: f32,
    pub horizontal_cell_spacing: f32,
    pub vertical_cell_spacing: f32,
    /// Extra height of row 0 so branch markers below it have room.
    pub first_row_extra_spacing: f32,
    pub flow_spacing: f32,
    /// Clearance between a routed connector and the shapes it bends around.
    pub connector_end_point_spacing: f32,
    pub disable_vertical_displacement: bool,
    pub return_target_policy: ReturnTargetPolicy,
    pub fit_labels: bool,
    pub font_size: f32,
    pub label_line_height: f32,
    pub label_padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_default_width: 160.0,
            node_default_height: 60.0,
            branching_node_width: 40.0,
            branching_node_height: 40.0,
            exit_node_width: 40.0,
            exit_node_height: 40.0,
            horizontal_cell_spacing: 40.0,
            vertical_cell_spacing: 40.0,
            first_row_extra_spacing: 15.0,
            flow_spacing: 10.0,
            connector_end_point_spacing: 15.0,
            disable_vertical_displacement: false,
            return_target_policy: ReturnTargetPolicy::Fail,
            fit_labels: false,
            font_size: 14.0,
            label_line_height: 1.5,
            label_padding: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramConfig {
    /// Added to the furthest shape edge when sizing the diagram.
    pub diagram_margin: f32,
    pub library_version: u32,
    pub diagram_type: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            diagram_margin: 30.0,
            library_version: 1,
            diagram_type: "usecase".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub diagram: DiagramConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    diagram: Option<DiagramConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_default_width: Option<f32>,
    node_default_height: Option<f32>,
    branching_node_width: Option<f32>,
    branching_node_height: Option<f32>,
    exit_node_width: Option<f32>,
    exit_node_height: Option<f32>,
    horizontal_cell_spacing: Option<f32>,
    vertical_cell_spacing: Option<f32>,
    first_row_extra_spacing: Option<f32>,
    flow_spacing: Option<f32>,
    connector_end_point_spacing: Option<f32>,
    disable_vertical_displacement: Option<bool>,
    return_target_policy: Option<ReturnTargetPolicy>,
    fit_labels: Option<bool>,
    font_size: Option<f32>,
    label_line_height: Option<f32>,
    label_padding: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramConfigFile {
    diagram_margin: Option<f32>,
    library_version: Option<u32>,
    diagram_type: Option<String>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document and overlays it on the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = layout.$field {
                    target.$field = v;
                })*
            };
        }
        overlay!(
            node_default_width,
            node_default_height,
            branching_node_width,
            branching_node_height,
            exit_node_width,
            exit_node_height,
            horizontal_cell_spacing,
            vertical_cell_spacing,
            first_row_extra_spacing,
            flow_spacing,
            connector_end_point_spacing,
            disable_vertical_displacement,
            return_target_policy,
            fit_labels,
            font_size,
            label_line_height,
            label_padding,
        );
    }

    if let Some(diagram) = parsed.diagram {
        if let Some(v) = diagram.diagram_margin {
            config.diagram.diagram_margin = v;
        }
        if let Some(v) = diagram.library_version {
            config.diagram.library_version = v;
        }
        if let Some(v) = diagram.diagram_type {
            config.diagram.diagram_type = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout.connector_end_point_spacing, 15.0);
        assert_eq!(config.diagram.diagram_margin, 30.0);
        assert_eq!(config.layout.return_target_policy, ReturnTargetPolicy::Fail);
    }

    #[test]
    fn json5_overlay_keeps_unset_fields() {
        let config = parse_config(
            r#"{
                // wider steps for long descriptions
                layout: { nodeDefaultWidth: 220, returnTargetPolicy: "omit" },
                diagram: { diagramMargin: 10, },
            }"#,
        )
        .unwrap();
        assert_eq!(config.layout.node_default_width, 220.0);
        assert_eq!(config.layout.node_default_height, 60.0);
        assert_eq!(config.layout.return_target_policy, ReturnTargetPolicy::Omit);
        assert_eq!(config.diagram.diagram_margin, 10.0);
        assert_eq!(config.diagram.diagram_type, "usecase");
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(parse_config("{ layout: [").is_err());
    }
}
