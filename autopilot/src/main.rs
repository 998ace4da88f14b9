use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use autopilot::benchmark::{run_benchmark, seed_sequence, BenchmarkConfig};
use autopilot::bias::BiasTables;
use autopilot::runner::run_game;
use autopilot::solver::SolverOptions;

#[derive(Parser, Debug)]
#[command(name = "autopilot")]
#[command(about = "Probabilistic solver for the helicarrier battleship variant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play one full game against an in-process judge
    Play {
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Boards per game
        #[arg(long, default_value_t = 200)]
        maps: u32,
        /// Break heat ties toward the board centre instead of at random
        #[arg(long, default_value_t = false)]
        center_bias: bool,
        /// JSON file with tuned bias tables
        #[arg(long)]
        bias_file: Option<PathBuf>,
        /// Print per-map move counts
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// Run multi-seed games in parallel and aggregate shot counts
    Benchmark {
        #[arg(long, default_value_t = 1)]
        seed_start: u64,
        #[arg(long, default_value_t = 8)]
        seed_count: u32,
        #[arg(long, default_value_t = 20)]
        maps: u32,
        #[arg(long, default_value_t = false)]
        center_bias: bool,
        /// Worker threads (default: all cores)
        #[arg(long)]
        jobs: Option<usize>,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Play {
            seed,
            maps,
            center_bias,
            bias_file,
            verbose,
        } => {
            let bias = match bias_file {
                Some(path) => BiasTables::from_json_file(&path)?,
                None => BiasTables::default(),
            };
            let options = SolverOptions {
                center_bias,
                ..SolverOptions::default()
            };
            let metrics = run_game(seed, maps, Arc::new(bias), &options)?;

            println!("seed={seed}");
            println!("maps={}", metrics.maps.len());
            println!("total_moves={}", metrics.total_moves);
            println!("avg_moves_per_map={:.2}", metrics.average_moves());
            if verbose {
                for map in &metrics.maps {
                    println!(
                        "  map={} moves={} avenger_used={}",
                        map.map_id, map.moves, map.avenger_used
                    );
                }
            }
        }
        Commands::Benchmark {
            seed_start,
            seed_count,
            maps,
            center_bias,
            jobs,
        } => {
            let report = run_benchmark(BenchmarkConfig {
                seeds: seed_sequence(seed_start, seed_count),
                maps_per_game: maps,
                options: SolverOptions {
                    center_bias,
                    ..SolverOptions::default()
                },
                jobs,
            })?;

            println!("games={}", report.runs.len());
            println!("total_maps={}", report.total_maps);
            println!("total_moves={}", report.total_moves);
            println!("avg_moves_per_map={:.2}", report.avg_moves_per_map);
            println!("best_game={}", report.best_game);
            println!("worst_game={}", report.worst_game);
            for run in &report.runs {
                println!(
                    "  seed={:#018x} total_moves={} avg={:.2}",
                    run.seed,
                    run.total_moves,
                    run.average_moves()
                );
            }
        }
    }
    Ok(())
}
