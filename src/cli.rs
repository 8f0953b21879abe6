use crate::config::{Config, load_config};
use crate::converter::UsecaseToDiagram;
use crate::diagram::{Diagram, FlowGraphDiagramBuilder};
use crate::layout_dump::write_layout_dump;
use crate::usecase::UseCase;
use anyhow::Result;
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(name = "ucflow", version, about = "Lays out use-case flows as flow-chart diagrams")]
pub struct Args {
    /// Input use case (JSON) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the diagram JSON. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config file (JSON5) overriding layout and diagram settings
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Alternate flow id to draw collapsed (repeatable)
    #[arg(long = "collapse", value_name = "FLOW_ID")]
    pub collapse: Vec<i64>,

    /// Also write the computed grid, boxes and connector routes as JSON
    #[arg(long = "dump-layout", value_name = "PATH")]
    pub dump_layout: Option<PathBuf>,

    /// Write the diagram without pretty-printing
    #[arg(long = "compact")]
    pub compact: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let use_case = parse_use_case(&input)?;
    let diagram = convert_with(config, &args, &use_case)?;

    let json = diagram_json(&diagram, args.compact)?;
    write_output(&json, args.output.as_deref())?;
    info!(
        shapes = diagram.shapes.len(),
        connections = diagram.connections.len(),
        "wrote diagram"
    );
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn convert_with(config: Config, args: &Args, use_case: &UseCase) -> Result<Diagram> {
    let converter = UsecaseToDiagram::new(config).with_collapsed_flows(args.collapse.iter().copied());
    let (graph, layout) = converter.arrange(use_case)?;
    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &graph, &layout)?;
        info!(path = %path.display(), "wrote layout dump");
    }
    Ok(FlowGraphDiagramBuilder::new(converter.config()).build_diagram(&graph, &layout, use_case))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn parse_use_case(input: &str) -> Result<UseCase> {
    if input.trim().is_empty() {
        return Err(anyhow::anyhow!("No use case found in input"));
    }
    serde_json::from_str(input).map_err(|err| anyhow::anyhow!("Invalid use case JSON: {err}"))
}

fn diagram_json(diagram: &Diagram, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(diagram)?
    } else {
        serde_json::to_string_pretty(diagram)?
    };
    Ok(json)
}

fn write_output(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}
