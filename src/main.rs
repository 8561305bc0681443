use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use heap_snapshot_graph::load_snapshot;
use heap_snapshot_graph::report::{
    ReportOptions, format_graph, generate_json_report, generate_text_report,
};
use heap_snapshot_graph::tracing_config::init_tracing;
use heap_snapshot_graph::types::SnapshotObjectId;
use heap_snapshot_graph::utils::start_timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "heap-snapshot-graph")]
#[command(about = "Load a V8 heap snapshot and report roots, flags and size statistics")]
struct Cli {
    /// Input heap snapshot file
    #[arg(short, long)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// List every root, GC roots included
    #[arg(long, default_value = "false")]
    roots: bool,

    /// List the page's own roots only
    #[arg(long, default_value = "false")]
    user_roots: bool,

    /// Group page objects by class
    #[arg(short, long, default_value = "false")]
    classes: bool,

    /// Show edges and retainers of the node with this id
    #[arg(short, long)]
    node: Option<SnapshotObjectId>,

    /// Include hidden edges and nodes in edge listings
    #[arg(long, default_value = "false")]
    show_hidden: bool,

    /// Print the graph breadth-first from the root, up to this many nodes
    #[arg(short, long, num_args = 0..=1, default_missing_value = "1000")]
    print: Option<usize>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Cli::parse();

    let _t = start_timer(format!("Loading {}", args.input.display()));
    let snapshot = load_snapshot(&args.input)?;
    std::mem::drop(_t);
    info!(path = %args.input.display(), "snapshot loaded");

    let options = ReportOptions {
        roots: args.roots,
        user_roots: args.user_roots,
        classes: args.classes,
        node: args.node,
        show_hidden: args.show_hidden,
    };

    let report = match args.format {
        OutputFormat::Text => generate_text_report(&snapshot, &options)?,
        OutputFormat::Json => generate_json_report(&snapshot, &options)?,
    };
    println!("{}", report);

    if let Some(limit) = args.print {
        println!();
        print!("{}", format_graph(&snapshot, limit, args.show_hidden));
    }

    Ok(())
}
