use rand::seq::SliceRandom;
use rand::Rng;

use helicarrier_core::{Avenger, Cell, Ship, BOARD_SIZE};

use crate::belief::BeliefMap;

/// Below this many observed cells an avenger defaults to Thor's broadcast
/// reveal; past it, IronMan's localization pays better.
pub const THOR_EARLY_DISCOVERY_LIMIT: u32 = 40;

const BOARD_CENTER: (f64, f64) = (5.5, 5.5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShotPlan {
    pub x: usize,
    pub y: usize,
    pub avenger: Option<Avenger>,
}

/// Highest-heat unobserved cell; ties break uniformly at random, or by
/// distance to the board centre in center-bias mode. None means the board
/// offers nothing left to shoot.
pub fn next_target<R: Rng>(
    belief: &BeliefMap,
    center_bias: bool,
    rng: &mut R,
) -> Option<(usize, usize)> {
    let mut best = f64::NEG_INFINITY;
    let mut ties: Vec<(usize, usize)> = Vec::new();
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            if belief.original(x, y) != Cell::Unknown {
                continue;
            }
            let heat = belief.heat(x, y);
            if heat > best {
                best = heat;
                ties.clear();
                ties.push((x, y));
            } else if heat == best {
                ties.push((x, y));
            }
        }
    }

    if ties.is_empty() {
        return None;
    }
    if center_bias {
        let dist = |&(x, y): &(usize, usize)| {
            let dx = x as f64 - BOARD_CENTER.0;
            let dy = y as f64 - BOARD_CENTER.1;
            dx * dx + dy * dy
        };
        let closest = ties
            .iter()
            .map(dist)
            .fold(f64::INFINITY, f64::min);
        ties.retain(|cell| dist(cell) == closest);
    }
    ties.choose(rng).copied()
}

/// Pick the next shot, spending an available avenger per the playbook:
/// finish a wounded ship with Hulk, broadcast with Thor while the board is
/// still dark, localize the smallest ship with IronMan otherwise.
pub fn plan_shot<R: Rng>(
    belief: &BeliefMap,
    avenger_available: bool,
    center_bias: bool,
    rng: &mut R,
) -> Option<ShotPlan> {
    if !avenger_available {
        return next_target(belief, center_bias, rng).map(|(x, y)| ShotPlan {
            x,
            y,
            avenger: None,
        });
    }

    if let Some((x, y)) = hulk_target(belief) {
        return Some(ShotPlan {
            x,
            y,
            avenger: Some(Avenger::Hulk),
        });
    }

    let (x, y) = next_target(belief, center_bias, rng)?;
    let observed = observed_count(belief);
    let avenger = if observed < THOR_EARLY_DISCOVERY_LIMIT {
        Avenger::Thor
    } else {
        Avenger::IronMan
    };
    Some(ShotPlan {
        x,
        y,
        avenger: Some(avenger),
    })
}

fn observed_count(belief: &BeliefMap) -> u32 {
    let mut n = 0;
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            if belief.original(x, y) != Cell::Unknown {
                n += 1;
            }
        }
    }
    n
}

/// A cell that lets Hulk finish a wounded ship. An already-hit cell of a
/// part-discovered ship is ideal: the base shot is a repeat, so the kill
/// costs no moves at all.
fn hulk_target(belief: &BeliefMap) -> Option<(usize, usize)> {
    // Confirmed wounded ships first, largest first.
    let mut wounded: Vec<Ship> = Vec::new();
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            if let Some(ship) = belief.confirmed_at(x, y) {
                if !wounded.contains(&ship) && ship_has_unobserved_cell(belief, &ship) {
                    wounded.push(ship);
                }
            }
        }
    }
    wounded.sort_by_key(|ship| std::cmp::Reverse(ship.shape.cell_count()));

    if let Some(ship) = wounded.first() {
        let cells = ship.cells();
        let hit = cells
            .iter()
            .find(|&&(x, y)| belief.original(x, y) == Cell::Ship);
        let target = hit.or_else(|| cells.first()).copied();
        return target;
    }

    // Unconfirmed hit: the ship under it cannot be fully known, so the
    // splash reveals the rest for free.
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            if belief.original(x, y) == Cell::Ship && belief.confirmed_at(x, y).is_none() {
                return Some((x, y));
            }
        }
    }
    None
}

fn ship_has_unobserved_cell(belief: &BeliefMap, ship: &Ship) -> bool {
    ship.cells()
        .into_iter()
        .any(|(x, y)| belief.original(x, y) == Cell::Unknown)
}
