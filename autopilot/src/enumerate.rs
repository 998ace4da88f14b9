use anyhow::bail;
use rand::Rng;

use helicarrier_core::{Cell, Rotation, ShapeKind, BOARD_SIZE};

use crate::belief::{BeliefMap, HEAT_MAX};
use crate::bias::{BiasTables, TARGET_MODE_FACTOR};
use crate::candidates::table;

/// Above this many raw configurations the enumerator switches from
/// exhaustive search to Monte-Carlo sampling.
pub const EXHAUSTIVE_LIMIT: u64 = 10_000_000;
pub const SAMPLE_MIN_ATTEMPTS: u64 = 1_000_000;
pub const SAMPLE_MIN_ACCEPTED: u64 = 10_000;
/// Runaway guard for degenerate acceptance rates.
const SAMPLE_ATTEMPT_CAP: u64 = 50_000_000;

#[derive(Clone, Copy, Debug)]
pub struct EnumerationOptions {
    pub exhaustive_limit: u64,
    pub sample_min_attempts: u64,
    pub sample_min_accepted: u64,
}

impl Default for EnumerationOptions {
    fn default() -> Self {
        EnumerationOptions {
            exhaustive_limit: EXHAUSTIVE_LIMIT,
            sample_min_attempts: SAMPLE_MIN_ATTEMPTS,
            sample_min_accepted: SAMPLE_MIN_ACCEPTED,
        }
    }
}

/// Belief-consistent placements of one unconfirmed shape.
pub struct ShapeCandidates {
    pub kind: ShapeKind,
    /// Global placement-table indices.
    pub placements: Vec<usize>,
    /// Parallel to `placements`: covers at least one inferred ship cell.
    pub target_mode: Vec<bool>,
}

/// Collect candidate placements for every unconfirmed shape.
pub fn candidates(belief: &BeliefMap) -> Vec<ShapeCandidates> {
    let table = table();
    let mut out = Vec::new();
    for kind in ShapeKind::ALL {
        if belief.is_confirmed(kind) {
            continue;
        }
        let range = table.range_of(kind);
        let mut placements = Vec::new();
        let mut target_mode = Vec::new();
        for index in range {
            let p = table.get(index);
            if !belief.placement_fits(p) {
                continue;
            }
            placements.push(index);
            target_mode.push(
                p.cells
                    .iter()
                    .any(|&(x, y)| belief.inferred(x, y) == Cell::Ship),
            );
        }
        out.push(ShapeCandidates {
            kind,
            placements,
            target_mode,
        });
    }
    out
}

pub struct EnumerationOutcome {
    /// Per global placement index: number of valid (or accepted sampled)
    /// configurations containing it.
    pub freq: Vec<u64>,
    pub valid_configurations: u64,
    pub sampled: bool,
}

/// Count fleet configurations consistent with the candidate sets:
/// exhaustively below the limit, by rejection sampling above it.
pub fn enumerate<R: Rng>(
    cands: &[ShapeCandidates],
    options: &EnumerationOptions,
    rng: &mut R,
) -> anyhow::Result<EnumerationOutcome> {
    let mut freq = vec![0u64; table().all().len()];

    if cands.is_empty() {
        // Every shape confirmed; the one remaining configuration is fixed.
        return Ok(EnumerationOutcome {
            freq,
            valid_configurations: 1,
            sampled: false,
        });
    }

    let mut total: u128 = 1;
    for sc in cands {
        if sc.placements.is_empty() {
            bail!("no belief-consistent placement left for {}", sc.kind.as_str());
        }
        total *= sc.placements.len() as u128;
    }

    if total <= options.exhaustive_limit as u128 {
        let valid = exhaustive(cands, &mut freq);
        if valid == 0 {
            bail!("no consistent fleet configuration exists");
        }
        Ok(EnumerationOutcome {
            freq,
            valid_configurations: valid,
            sampled: false,
        })
    } else {
        let accepted = sample(cands, options, &mut freq, rng);
        if accepted == 0 {
            bail!("monte-carlo sampling accepted no fleet configuration");
        }
        Ok(EnumerationOutcome {
            freq,
            valid_configurations: accepted,
            sampled: true,
        })
    }
}

/// Backtracking DFS over the shapes in reverse insertion order, rejecting a
/// candidate as soon as it clashes with an already-chosen placement.
fn exhaustive(cands: &[ShapeCandidates], freq: &mut [u64]) -> u64 {
    fn dfs(
        levels: &[&ShapeCandidates],
        depth: usize,
        chosen: &mut Vec<usize>,
        freq: &mut [u64],
    ) -> u64 {
        if depth == levels.len() {
            for &index in chosen.iter() {
                freq[index] += 1;
            }
            return 1;
        }
        let mut found = 0;
        'next: for &index in &levels[depth].placements {
            for &taken in chosen.iter() {
                if table().incompatible(index, taken) {
                    continue 'next;
                }
            }
            chosen.push(index);
            found += dfs(levels, depth + 1, chosen, freq);
            chosen.pop();
        }
        found
    }

    let levels: Vec<&ShapeCandidates> = cands.iter().rev().collect();
    dfs(&levels, 0, &mut Vec::with_capacity(levels.len()), freq)
}

/// Rejection sampling: draw one placement per shape uniformly, discard the
/// sample on any pairwise clash. Runs until both attempt and acceptance
/// minimums are met.
fn sample<R: Rng>(
    cands: &[ShapeCandidates],
    options: &EnumerationOptions,
    freq: &mut [u64],
    rng: &mut R,
) -> u64 {
    let mut attempts = 0u64;
    let mut accepted = 0u64;
    let mut draw = vec![0usize; cands.len()];

    while attempts < options.sample_min_attempts || accepted < options.sample_min_accepted {
        if attempts >= SAMPLE_ATTEMPT_CAP {
            break;
        }
        attempts += 1;

        for (slot, sc) in draw.iter_mut().zip(cands) {
            *slot = sc.placements[rng.gen_range(0..sc.placements.len())];
        }
        let clash = (0..draw.len()).any(|i| {
            (i + 1..draw.len()).any(|j| table().incompatible(draw[i], draw[j]))
        });
        if clash {
            continue;
        }
        accepted += 1;
        for &index in &draw {
            freq[index] += 1;
        }
    }
    accepted
}

/// Rebuild the heat map from a fresh enumeration, then demote unknown
/// cells no configuration can reach.
pub fn refresh_heat<R: Rng>(
    belief: &mut BeliefMap,
    bias: &BiasTables,
    options: &EnumerationOptions,
    rng: &mut R,
) -> anyhow::Result<()> {
    let cands = candidates(belief);
    let outcome = enumerate(&cands, options, rng)?;
    let table = table();

    let mut weight = [[0f64; BOARD_SIZE]; BOARD_SIZE];
    let mut covered = [[false; BOARD_SIZE]; BOARD_SIZE];
    for sc in &cands {
        let shape_index = sc.kind.index();
        for (i, &index) in sc.placements.iter().enumerate() {
            let p = table.get(index);
            for &(x, y) in &p.cells {
                covered[x][y] = true;
            }
            let count = outcome.freq[index];
            if count == 0 {
                continue;
            }
            let mut w = count as f64;
            if sc.target_mode[i] {
                w *= TARGET_MODE_FACTOR;
            }
            w *= edge_bias(bias, p.ship.x, p.ship.y, p.ship.rotation);
            for &(x, y) in &p.cells {
                weight[x][y] += w * bias.shape[shape_index][x][y];
            }
        }
    }

    let scale = 1000.0 / outcome.valid_configurations as f64;
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            if belief.original(x, y) != Cell::Unknown {
                continue;
            }
            if belief.inferred(x, y) == Cell::Ship {
                belief.set_heat(x, y, HEAT_MAX);
                continue;
            }
            let heat = weight[x][y] * scale * bias.cell[x][y];
            belief.set_heat(x, y, heat);
            // Zero heat demotes the cell to water. Sampled frequencies can
            // miss a live placement by chance, so a sampled run only
            // demotes cells no candidate covers at all.
            let unreachable = !covered[x][y] || !outcome.sampled;
            if belief.inferred(x, y) == Cell::Unknown && heat == 0.0 && unreachable {
                belief.set_water(x, y);
            }
        }
    }
    Ok(())
}

fn edge_bias(bias: &BiasTables, x: usize, y: usize, rotation: Rotation) -> f64 {
    if x == 0 && y != 0 && rotation == Rotation::Horizontal {
        bias.edge_left_horizontal
    } else if x != 0 && y == 0 && rotation == Rotation::Vertical {
        bias.edge_top_vertical
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::HEAT_NONE;
    use helicarrier_core::Ship;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn confirm_all_but(belief: &mut BeliefMap, keep: ShapeKind) {
        // Pack the rest of the fleet into known spots away from the top-left
        // corner so the kept shape has room there.
        let spots = [
            (ShapeKind::Helicarrier, Ship::new(ShapeKind::Helicarrier, 9, 7, Rotation::Vertical)),
            (ShapeKind::Carrier, Ship::new(ShapeKind::Carrier, 7, 0, Rotation::Vertical)),
            (ShapeKind::Battleship, Ship::new(ShapeKind::Battleship, 5, 7, Rotation::Vertical)),
            (ShapeKind::Destroyer, Ship::new(ShapeKind::Destroyer, 9, 0, Rotation::Vertical)),
            (ShapeKind::Submarine, Ship::new(ShapeKind::Submarine, 0, 9, Rotation::Horizontal)),
            (ShapeKind::PatrolBoat, Ship::new(ShapeKind::PatrolBoat, 5, 0, Rotation::Vertical)),
        ];
        for (kind, ship) in spots {
            if kind != keep {
                belief.confirm_ship(ship).unwrap();
            }
        }
    }

    #[test]
    fn exhaustive_counts_single_open_shape() {
        let mut belief = BeliefMap::new();
        confirm_all_but(&mut belief, ShapeKind::PatrolBoat);

        let cands = candidates(&belief);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].kind, ShapeKind::PatrolBoat);
        let open = cands[0].placements.len();
        assert!(open > 0);

        let outcome = enumerate(
            &cands,
            &EnumerationOptions::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        assert!(!outcome.sampled);
        // With one shape open, every candidate is its own configuration.
        assert_eq!(outcome.valid_configurations, open as u64);
        assert_eq!(outcome.freq.iter().sum::<u64>(), open as u64);
    }

    #[test]
    fn empty_board_takes_the_sampling_path() {
        let belief = BeliefMap::new();
        let cands = candidates(&belief);
        let total: u128 = cands.iter().map(|c| c.placements.len() as u128).product();
        assert!(total > EXHAUSTIVE_LIMIT as u128);

        let options = EnumerationOptions {
            exhaustive_limit: EXHAUSTIVE_LIMIT,
            sample_min_attempts: 5_000,
            sample_min_accepted: 50,
        };
        let outcome =
            enumerate(&cands, &options, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(outcome.sampled);
        assert!(outcome.valid_configurations >= 50);
    }

    #[test]
    fn heat_prefers_the_wounded_ship() {
        let mut belief = BeliefMap::new();
        // One hit in open water engages target mode around it.
        belief.force_ship_for_tests(6, 6);

        let options = EnumerationOptions {
            exhaustive_limit: EXHAUSTIVE_LIMIT,
            sample_min_attempts: 20_000,
            sample_min_accepted: 200,
        };
        refresh_heat(
            &mut belief,
            &BiasTables::default(),
            &options,
            &mut StdRng::seed_from_u64(2),
        )
        .unwrap();

        // The hit itself is sentinel-hot; its in-line neighbours beat any
        // far-away open-water cell thanks to the target-mode factor.
        assert_eq!(belief.heat(6, 6), HEAT_MAX);
        let near = belief.heat(6, 5).max(belief.heat(6, 7));
        assert!(near > belief.heat(0, 11) * 10.0, "near={near}");
    }

    #[test]
    fn unreachable_cells_are_demoted_to_water() {
        let mut belief = BeliefMap::new();
        confirm_all_but(&mut belief, ShapeKind::PatrolBoat);
        // Wall off the top-left corner: water on (1, 0) and (0, 1) leaves
        // (0, 0) unreachable by the one remaining 1x2 shape.
        belief.set_water(1, 0);
        belief.set_water(0, 1);

        refresh_heat(
            &mut belief,
            &BiasTables::default(),
            &EnumerationOptions::default(),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();

        assert_eq!(belief.inferred(0, 0), Cell::Water);
        assert_eq!(belief.heat(0, 0), HEAT_NONE);
    }

    #[test]
    fn edge_bias_matches_the_reference_constants() {
        let bias = BiasTables::default();
        assert_eq!(
            edge_bias(&bias, 0, 3, Rotation::Horizontal),
            bias.edge_left_horizontal
        );
        assert_eq!(
            edge_bias(&bias, 4, 0, Rotation::Vertical),
            bias.edge_top_vertical
        );
        // The corner and mismatched rotations stay neutral.
        assert_eq!(edge_bias(&bias, 0, 0, Rotation::Horizontal), 1.0);
        assert_eq!(edge_bias(&bias, 0, 3, Rotation::Vertical), 1.0);
        assert_eq!(edge_bias(&bias, 4, 0, Rotation::Horizontal), 1.0);
    }
}
