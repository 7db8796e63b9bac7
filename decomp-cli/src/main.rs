//! DECOMP single layer driver
//!
//! Decomposes a litter bag (and optional recurring litter input) in one soil layer
//! under a seasonal climate and prints the daily pools.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p decomp-cli -- leaf --yearly leaf wood --doc-retention 10 --days 3650
//! ```

use clap::{Parser, ValueEnum};
use decomp::driver::{simulate, LitterInput, SeasonalClimate, SimulationConfig, Trajectory};
use decomp_core::litter::LitterComposition;
use decomp_core::{ComponentRegistry, DecompResult, Som};
use log::{info, LevelFilter};
use std::fmt::Write;
use std::sync::Arc;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Litter {
    None,
    Leaf,
    Wood,
    Root,
    Doc,
}

impl Litter {
    fn into_som(self, registry: &Arc<ComponentRegistry>) -> DecompResult<Som> {
        match self {
            Litter::None => Ok(Som::zero(Arc::clone(registry))),
            Litter::Leaf => LitterComposition::LEAF.into_som(registry),
            Litter::Wood => LitterComposition::WOOD.into_som(registry),
            Litter::Root => LitterComposition::ROOT.into_som(registry),
            Litter::Doc => LitterComposition::PURE_DOC.into_som(registry),
        }
    }
}

/// Single layer soil organic matter decomposition
#[derive(Parser, Debug)]
#[command(name = "decomp-run")]
#[command(about = "Simulate litter decomposition in a single soil layer")]
struct Args {
    /// Litter in the layer at the start, summed
    #[arg(value_enum)]
    initial: Vec<Litter>,

    /// Litter added once a year on day 270
    #[arg(long, value_enum, num_args = 0..)]
    yearly: Vec<Litter>,

    /// Litter spread evenly over every day of the year
    #[arg(long, value_enum, num_args = 0..)]
    daily: Vec<Litter>,

    /// Residence time of DOC in the layer (days), 0 flushes DOC every day
    #[arg(short = 'r', long, default_value_t = 0.0)]
    doc_retention: f64,

    /// Number of simulated days
    #[arg(long, default_value_t = 19 * 365)]
    days: usize,

    /// Step length (days)
    #[arg(long, default_value_t = 1.0)]
    dt: f64,

    /// Print the trajectory as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Log the simulation progress
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args, registry: &Arc<ComponentRegistry>) -> DecompResult<Trajectory> {
    let mut initial = Som::zero(Arc::clone(registry));
    for litter in &args.initial {
        initial += litter.into_som(registry)?;
    }

    let mut inputs = Vec::new();
    for litter in &args.yearly {
        inputs.push(LitterInput::yearly(litter.into_som(registry)?));
    }
    for litter in &args.daily {
        inputs.push(LitterInput::daily(litter.into_som(registry)?));
    }
    info!("Initial state {}", initial);

    let config = SimulationConfig {
        days: args.days,
        doc_retention_time: args.doc_retention,
        dt: args.dt,
    };
    simulate(&initial, &inputs, &SeasonalClimate::default(), &config)
}

/// Tab separated table: step start time, all pools, C/N, the flux of every flux-only
/// component and the nitrogen flux
fn render_table(trajectory: &Trajectory, registry: &ComponentRegistry) -> String {
    let exported: Vec<_> = registry
        .components()
        .filter(|c| !c.is_stored)
        .map(|c| (c.id(), c.name.as_str()))
        .collect();

    let mut columns = vec!["time".to_string()];
    columns.extend(trajectory.components.iter().cloned());
    columns.push("CN".to_string());
    columns.extend(exported.iter().map(|(_, name)| format!("{}_flux", name)));
    columns.push("N_flux".to_string());

    let mut table = columns.join("\t");
    table.push('\n');
    for step in 0..trajectory.steps() {
        let mut row = vec![trajectory.time[step].to_string()];
        row.extend(trajectory.states.row(step).iter().map(|v| format!("{:.6}", v)));
        row.push(format!("{:.3}", trajectory.cn[step]));
        row.extend(
            exported
                .iter()
                .map(|(id, _)| format!("{:.6e}", trajectory.fluxes[[step, *id]])),
        );
        row.push(format!("{:.6e}", trajectory.n_flux[step]));
        let _ = writeln!(table, "{}", row.join("\t"));
    }
    table
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let registry = Arc::new(ComponentRegistry::wallman2006());
    let trajectory = match run(&args, &registry) {
        Ok(trajectory) => trajectory,
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            std::process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&trajectory) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialise trajectory: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", render_table(&trajectory, &registry));
    }
}
