//! meshfree-bench: CLI tool for stencil parameter experimentation and
//! diagnostics.
//!
//! Builds a stencil network over a generated grid of nodes with
//! configurable parameters, printing per-stage timing and count
//! diagnostics. Useful for:
//!
//! - Comparing sizing strategies (fixed width vs connectivity target)
//! - Measuring how a wall boundary affects search cost
//! - Understanding how grid size drives build and analysis time
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin meshfree-bench -- [OPTIONS]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use serde::Serialize;

use meshfree_stencil::{
    Boundary, Stencil, StencilError, StencilSizing, connectivity, is_connected, stencil_network,
};

/// Stencil parameter experimentation and diagnostics for meshfree.
///
/// Generates a unit-square grid of nodes (optionally split by a slit
/// wall), builds a stencil network, and prints timing and connectivity
/// diagnostics.
#[derive(Parser)]
#[command(name = "meshfree-bench", version)]
struct Cli {
    /// Nodes per grid side (total nodes = side * side).
    #[arg(long, default_value_t = 20, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(2..))]
    side: usize,

    /// Stencil sizing strategy.
    #[arg(long, value_enum, default_value_t = Mode::Auto)]
    mode: Mode,

    /// Stencil width for `--mode fixed`.
    #[arg(long, default_value_t = meshfree_stencil::DEFAULT_STENCIL_SIZE)]
    size: usize,

    /// Connectivity target for `--mode connectivity`.
    #[arg(long, default_value_t = 2)]
    connectivity: usize,

    /// Insert a slit wall across the middle of the grid (open at the
    /// top quarter), forcing boundary-aware re-queries.
    #[arg(long)]
    wall: bool,

    /// Skip the connectivity analysis of the result (it is expensive
    /// past a few hundred nodes).
    #[arg(long)]
    no_analysis: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

/// Sizing strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Library default width, capped at the node count.
    Auto,
    /// Explicit width from `--size`.
    Fixed,
    /// Grow the width until `--connectivity` is reached.
    Connectivity,
}

/// Timing and shape diagnostics for one stencil build.
#[derive(Serialize)]
struct StencilDiagnostics {
    node_count: usize,
    walled: bool,
    width: usize,
    build: Duration,
    analysis: Option<AnalysisDiagnostics>,
}

/// Connectivity analysis of the finished stencil.
#[derive(Serialize)]
struct AnalysisDiagnostics {
    connected: bool,
    connectivity: usize,
    duration: Duration,
}

impl StencilDiagnostics {
    /// Human-readable multi-line report.
    fn report(&self) -> String {
        let mut out = format!(
            "nodes:        {}\nwall:         {}\nwidth:        {}\nbuild:        {:.3?}",
            self.node_count, self.walled, self.width, self.build,
        );
        if let Some(ref analysis) = self.analysis {
            out.push_str(&format!(
                "\nconnected:    {}\nconnectivity: {}\nanalysis:     {:.3?}",
                analysis.connected, analysis.connectivity, analysis.duration,
            ));
        }
        out
    }
}

/// A `side x side` grid over the unit square.
fn grid_nodes(side: usize) -> Vec<[f64; 2]> {
    #[allow(clippy::cast_precision_loss)]
    let step = 1.0 / (side - 1) as f64;
    let mut nodes = Vec::with_capacity(side * side);
    for i in 0..side {
        for j in 0..side {
            #[allow(clippy::cast_precision_loss)]
            nodes.push([i as f64 * step, j as f64 * step]);
        }
    }
    nodes
}

/// A vertical wall between the two middle grid columns, spanning from
/// below the grid to three quarters of the way up -- the open top
/// quarter is the slit stencils must route through.
fn slit_wall(side: usize) -> Result<Boundary<2>, meshfree_stencil::GeometryError> {
    #[allow(clippy::cast_precision_loss)]
    let step = 1.0 / (side - 1) as f64;
    #[allow(clippy::cast_precision_loss)]
    let x = ((side - 1) / 2) as f64 * step + step / 2.0;
    Boundary::new(vec![[x, -0.5], [x, 0.75]], vec![[0, 1]])
}

/// Build once, timing the construction and (optionally) the analysis.
fn run_once(
    nodes: &[[f64; 2]],
    sizing: StencilSizing,
    wall: Option<&Boundary<2>>,
    analyze: bool,
) -> Result<StencilDiagnostics, StencilError> {
    let started = Instant::now();
    let stencil: Stencil = stencil_network(nodes, sizing, wall)?;
    let build = started.elapsed();

    let analysis = analyze.then(|| {
        let started = Instant::now();
        let connected = is_connected(&stencil);
        let kappa = connectivity(&stencil);
        AnalysisDiagnostics {
            connected,
            connectivity: kappa,
            duration: started.elapsed(),
        }
    });

    Ok(StencilDiagnostics {
        node_count: stencil.node_count(),
        walled: wall.is_some(),
        width: stencil.width(),
        build,
        analysis,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let nodes = grid_nodes(cli.side);
    let wall = if cli.wall {
        match slit_wall(cli.side) {
            Ok(wall) => Some(wall),
            Err(e) => {
                eprintln!("Error building wall: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let sizing = match cli.mode {
        Mode::Auto => StencilSizing::Auto,
        Mode::Fixed => StencilSizing::Fixed(cli.size),
        Mode::Connectivity => StencilSizing::Connectivity(cli.connectivity),
    };

    eprintln!(
        "Grid: {0}x{0} ({1} nodes), wall: {2}, sizing: {sizing:?}",
        cli.side,
        nodes.len(),
        cli.wall,
    );
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut builds = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match run_once(&nodes, sizing, wall.as_ref(), !cli.no_analysis) {
            Ok(diagnostics) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }
                builds.push(diagnostics.build);
            }
            Err(e) => {
                eprintln!("Stencil error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 && !builds.is_empty() {
        let total: Duration = builds.iter().sum();
        #[allow(clippy::cast_possible_truncation)]
        let mean = total / builds.len() as u32;
        eprintln!("Mean build over {} runs: {mean:.3?}", builds.len());
    }

    ExitCode::SUCCESS
}
