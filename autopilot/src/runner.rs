use std::sync::Arc;

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use helicarrier_core::{
    Avenger, AvengerResult, Board, FireResponse, Shot, GRID_CELLS,
};

use crate::bias::BiasTables;
use crate::solver::{Solver, SolverOptions};

/// The judge as the bot sees it: a status probe and a fire endpoint.
/// Transport stays out of scope; implementations answer in-process.
pub trait Judge {
    fn status(&mut self) -> anyhow::Result<FireResponse>;
    fn fire(
        &mut self,
        x: usize,
        y: usize,
        avenger: Option<Avenger>,
    ) -> anyhow::Result<FireResponse>;
}

/// In-process judge over the rules engine, mirroring the server's session
/// semantics: boards spawn on demand, completions retire them and count
/// toward the game score.
pub struct LocalJudge {
    board: Option<Board>,
    rng: StdRng,
    next_map_id: u64,
    maps_remaining: u32,
    total_moves: u32,
}

impl LocalJudge {
    pub fn new(seed: u64, maps: u32) -> Self {
        LocalJudge {
            board: None,
            rng: StdRng::seed_from_u64(seed),
            next_map_id: 0,
            maps_remaining: maps,
            total_moves: 0,
        }
    }

    pub fn total_moves(&self) -> u32 {
        self.total_moves
    }

    /// Truth access for verification in tests and analysis.
    pub fn current_board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    fn ensure_board(&mut self) -> anyhow::Result<&mut Board> {
        if self.board.is_none() {
            if self.maps_remaining == 0 {
                bail!("no maps remaining in this game");
            }
            self.next_map_id += 1;
            self.board = Some(Board::place_random(self.next_map_id, &mut self.rng));
        }
        Ok(self.board.as_mut().expect("board just ensured"))
    }

    fn respond(
        &mut self,
        shot: Option<Shot>,
        reveals: Option<Vec<helicarrier_core::AvengerReveal>>,
    ) -> FireResponse {
        let board = self.board.as_ref().expect("board present");
        let finished = board.all_discovered();
        let response = FireResponse {
            grid: board.render_grid(),
            cell: shot
                .map(|s| s.cell.to_wire().to_string())
                .unwrap_or_default(),
            result: shot.map(|s| !s.repeat).unwrap_or(false),
            avenger_available: board.avenger_available(),
            map_id: board.id(),
            map_count: self.maps_remaining,
            move_count: board.move_count(),
            finished,
            avenger_result: reveals
                .map(|r| r.into_iter().map(AvengerResult::from_reveal).collect()),
        };
        if finished {
            self.total_moves += board.move_count();
            self.maps_remaining -= 1;
            self.board = None;
        }
        response
    }
}

impl Judge for LocalJudge {
    fn status(&mut self) -> anyhow::Result<FireResponse> {
        self.ensure_board()?;
        Ok(self.respond(None, None))
    }

    fn fire(
        &mut self,
        x: usize,
        y: usize,
        avenger: Option<Avenger>,
    ) -> anyhow::Result<FireResponse> {
        self.ensure_board()?;
        let LocalJudge { board, rng, .. } = &mut *self;
        let board = board.as_mut().expect("board just ensured");
        let (shot, reveals) = match avenger {
            None => (board.fire(x as i32, y as i32)?, None),
            Some(avenger) => {
                let (shot, reveals) = board.fire_avenger(x as i32, y as i32, avenger, rng)?;
                (shot, Some(reveals))
            }
        };
        Ok(self.respond(Some(shot), reveals))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MapMetrics {
    pub map_id: u64,
    pub moves: u32,
    pub avenger_used: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameMetrics {
    pub seed: u64,
    pub maps: Vec<MapMetrics>,
    pub total_moves: u32,
}

impl GameMetrics {
    pub fn average_moves(&self) -> f64 {
        if self.maps.is_empty() {
            return 0.0;
        }
        self.total_moves as f64 / self.maps.len() as f64
    }
}

/// Play a full game of `maps` boards against an in-process judge, one
/// fresh solver per board.
pub fn run_game(
    seed: u64,
    maps: u32,
    bias: Arc<BiasTables>,
    options: &SolverOptions,
) -> anyhow::Result<GameMetrics> {
    let mut judge = LocalJudge::new(seed, maps);
    run_game_against(&mut judge, seed, maps, bias, options)
}

/// Same loop against any judge implementation.
pub fn run_game_against(
    judge: &mut impl Judge,
    seed: u64,
    maps: u32,
    bias: Arc<BiasTables>,
    options: &SolverOptions,
) -> anyhow::Result<GameMetrics> {
    let mut metrics = Vec::with_capacity(maps as usize);
    let mut solver_seed = seed;

    for _ in 0..maps {
        // One LCG step per board gives each solver its own rng stream.
        solver_seed = solver_seed
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        let mut solver = Solver::new(solver_seed, bias.clone(), options.clone());

        let mut response = judge.status()?;
        solver.observe(&response)?;

        let mut avenger_used = false;
        // A 12x12 board can never take more shots than it has cells.
        for _ in 0..=GRID_CELLS {
            if response.finished {
                break;
            }
            let plan = solver
                .next_plan()
                .context("no shootable cell left on an unfinished board")?;
            avenger_used |= plan.avenger.is_some();
            response = judge.fire(plan.x, plan.y, plan.avenger)?;
            solver.observe(&response)?;
        }
        if !response.finished {
            bail!("board {} did not terminate", response.map_id);
        }

        metrics.push(MapMetrics {
            map_id: response.map_id,
            moves: response.move_count,
            avenger_used,
        });
    }

    Ok(GameMetrics {
        seed,
        total_moves: metrics.iter().map(|m| m.moves).sum(),
        maps: metrics,
    })
}
