use std::sync::Arc;

use anyhow::Context;
use rayon::prelude::*;
use serde::Serialize;

use crate::bias::BiasTables;
use crate::runner::{run_game, GameMetrics};
use crate::solver::SolverOptions;

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub seeds: Vec<u64>,
    pub maps_per_game: u32,
    pub options: SolverOptions,
    /// Worker threads; None lets rayon decide.
    pub jobs: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkReport {
    pub runs: Vec<GameMetrics>,
    pub total_maps: u32,
    pub total_moves: u32,
    pub avg_moves_per_map: f64,
    pub best_game: u32,
    pub worst_game: u32,
}

/// Run full games across seeds in parallel and aggregate shot counts.
pub fn run_benchmark(config: BenchmarkConfig) -> anyhow::Result<BenchmarkReport> {
    let bias = Arc::new(BiasTables::default());
    let play = |seed: &u64| run_game(*seed, config.maps_per_game, bias.clone(), &config.options);

    let runs: Vec<GameMetrics> = match config.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build worker pool")?
            .install(|| config.seeds.par_iter().map(play).collect::<Result<_, _>>())?,
        None => config.seeds.par_iter().map(play).collect::<Result<_, _>>()?,
    };

    let total_maps: u32 = runs.iter().map(|r| r.maps.len() as u32).sum();
    let total_moves: u32 = runs.iter().map(|r| r.total_moves).sum();
    let best_game = runs.iter().map(|r| r.total_moves).min().unwrap_or(0);
    let worst_game = runs.iter().map(|r| r.total_moves).max().unwrap_or(0);

    Ok(BenchmarkReport {
        avg_moves_per_map: if total_maps == 0 {
            0.0
        } else {
            total_moves as f64 / total_maps as f64
        },
        runs,
        total_maps,
        total_moves,
        best_game,
        worst_game,
    })
}

/// Seed chain for multi-game runs: each successive seed is one LCG step
/// from the previous.
pub fn seed_sequence(start: u64, count: u32) -> Vec<u64> {
    let mut out = Vec::with_capacity(count as usize);
    let mut cur = start;
    for _ in 0..count {
        out.push(cur);
        cur = cur.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    }
    out
}
