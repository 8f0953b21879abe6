#[cfg(feature = "cli")]
pub mod cli;
pub mod builder;
pub mod config;
pub mod converter;
pub mod diagram;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod text;
pub mod usecase;

#[cfg(feature = "cli")]
pub use cli::run;

pub use builder::UsecaseFlowGraphBuilder;
pub use config::{Config, DiagramConfig, LayoutConfig, ReturnTargetPolicy, load_config};
pub use converter::{UsecaseToDiagram, convert};
pub use diagram::{Connection, ConnectorKind, Diagram, FlowGraphDiagramBuilder, Shape, ShapeKind};
pub use error::GraphError;
pub use ir::FlowGraph;
pub use layout::{LayoutCalculator, LayoutResult, arrange_graph};
pub use usecase::{Flow, Step, StepOf, UseCase};
