//! Tileflash Cluster Simulator
//!
//! Usage: `tileflash-sim [tiles] [line|spiral] [--config path] [--events]`

use std::env;
use std::process::ExitCode;

use tileflash_sim::{Cluster, Simulation, SimulationConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

enum Shape {
    Line,
    Spiral,
}

struct Args {
    tiles: usize,
    shape: Shape,
    config: Option<String>,
    events: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        tiles: 19,
        shape: Shape::Spiral,
        config: None,
        events: false,
    };
    let mut positional = 0;
    let mut rest = env::args().skip(1);

    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" => {
                args.config = Some(rest.next().ok_or("--config needs a path")?);
            }
            "--events" => args.events = true,
            "line" => args.shape = Shape::Line,
            "spiral" => args.shape = Shape::Spiral,
            other if positional == 0 => {
                args.tiles = other.parse().map_err(|_| format!("not a tile count: {other}"))?;
                positional += 1;
            }
            other => return Err(format!("unexpected argument: {other}")),
        }
    }
    Ok(args)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tileflash_sim=info,tileflash_viral=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let cluster = match args.shape {
        Shape::Line => Cluster::line(args.tiles)?,
        Shape::Spiral => Cluster::spiral(args.tiles)?,
    };

    let mut sim = Simulation::new(cluster, config)?;
    let report = sim.run();

    if args.events {
        for event in sim.events() {
            println!("{}", serde_json::to_string(event)?);
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("Tileflash Cluster Simulator");
    println!("===========================");
    println!();
    println!("  Tiles:      {}", report.tiles.len());
    println!("  Pages:      {}", sim.image().page_count());
    match report.depth {
        Some(depth) => println!("  Depth:      {depth} hops"),
        None => println!("  Depth:      some tiles unreachable"),
    }
    println!("  Elapsed:    {} ms", report.elapsed_ms);
    println!("  Staged:     {}", report.staged_count());
    println!("  Fallback:   {}", report.fallback_count());
    println!("  Unfinished: {}", report.unfinished_count());
    println!(
        "  Frames:     {} sent, {} lost, {} corrupted, {} overrun",
        report.links.sent, report.links.lost, report.links.corrupted, report.links.overrun
    );
    println!();
    for tile in &report.tiles {
        let outcome = match tile.outcome {
            Some(program) => format!("{program:?}"),
            None => "running".to_string(),
        };
        println!(
            "  {} at {:<8} {:>2}/{:<2} pages  {:<8} go={} writes={}",
            tile.tile,
            tile.coord.to_string(),
            tile.pages,
            tile.total_pages,
            outcome,
            tile.go_observed,
            tile.flash_writes
        );
    }

    Ok(if report.all_staged() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
