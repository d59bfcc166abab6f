use std::{error::Error, path::PathBuf, process::ExitCode};

use clap::Parser;
use rrgraph::{
    DeviceContext, NodeKind, Options, Report, RouteType, RrGraph,
    check::check_rr_graph,
    edges::{EdgeSwitches, build_uniform_edges},
    verify::verify_lookup,
};
use rrgraph_arch::fabric::UniformFabric;
use tracing::info;

/// Builds the routing resource graph of a uniform island fabric and checks it.
#[derive(Parser)]
struct Args {
    #[arg(long, default_value_t = 6)]
    width: usize,
    #[arg(long, default_value_t = 6)]
    height: usize,
    #[arg(long, default_value_t = 1)]
    layers: usize,
    #[arg(long, default_value_t = 4)]
    chan_width: usize,
    #[arg(long, default_value_t = 1)]
    seg_length: i32,
    #[arg(long, default_value_t = 0)]
    inter_layer_tracks: usize,
    /// Keep logic tiles in the four corners.
    #[arg(long)]
    full_corners: bool,
    #[arg(long)]
    global: bool,
    #[arg(long)]
    flat: bool,
    /// TOML file with [build] and [check] tables.
    #[arg(long)]
    options: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn print_report(name: &str, report: &Report) {
    for diag in &report.diagnostics {
        println!("{name}: {diag}");
    }
    println!(
        "{name}: {status} ({n} diagnostics, {f} fatal{aborted})",
        status = if report.passed() { "PASS" } else { "FAIL" },
        n = report.diagnostics.len(),
        f = report.fatal_count(),
        aborted = if report.aborted { ", aborted" } else { "" },
    );
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Args::parse();
    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let mut opts = match args.options {
        Some(ref path) => Options::from_toml(&std::fs::read_to_string(path)?)?,
        None => Options::default(),
    };
    if args.global {
        opts.build.route_type = RouteType::Global;
    }
    if args.flat {
        opts.check.flat = true;
    }

    let fabric = UniformFabric {
        layers: args.layers,
        width: args.width,
        height: args.height,
        chan_width: args.chan_width,
        seg_length: args.seg_length,
        empty_corners: !args.full_corners,
        inter_layer_tracks: args.inter_layer_tracks,
        ..Default::default()
    }
    .build()?;
    let ctx = DeviceContext::new(
        &fabric.arch,
        &fabric.grid,
        &fabric.chan_width,
        &fabric.tracks,
        &opts.build,
    )?;
    let mut graph = RrGraph::build(&ctx)?;
    build_uniform_edges(
        &ctx,
        &mut graph,
        &EdgeSwitches {
            delayless: fabric.switches.delayless,
            wire: fabric.switches.wire,
            ipin: fabric.switches.ipin,
            opin: fabric.switches.opin,
        },
    );
    for kind in NodeKind::ALL {
        info!(%kind, count = graph.count_kind(kind), "nodes");
    }

    let lookup = verify_lookup(&ctx, &graph);
    print_report("lookup", &lookup);
    let check = check_rr_graph(&ctx, &graph, &opts.check);
    print_report("graph", &check);
    Ok(if lookup.passed() && check.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
