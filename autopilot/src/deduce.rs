use anyhow::bail;

use helicarrier_core::{Cell, ShapeKind, BOARD_SIZE};

use crate::belief::BeliefMap;
use crate::candidates::{table, Placement};

/// Run deterministic deduction to fixpoint: keep scanning inferred ship
/// cells for forced placements until a full pass confirms nothing new.
pub fn propagate(belief: &mut BeliefMap) -> anyhow::Result<()> {
    while single_pass(belief)? {}
    Ok(())
}

/// One deduction pass. Returns true when it confirmed a ship (the caller
/// restarts, since freshly watered cells can unlock further deductions).
fn single_pass(belief: &mut BeliefMap) -> anyhow::Result<bool> {
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            if belief.inferred(x, y) != Cell::Ship || belief.confirmed_at(x, y).is_some() {
                continue;
            }
            if deduce_cell(belief, x, y)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn deduce_cell(belief: &mut BeliefMap, x: usize, y: usize) -> anyhow::Result<bool> {
    let constrained = belief.possible_at(x, y);
    let kinds = if constrained.is_empty() {
        belief.unconfirmed_shapes()
    } else {
        constrained
    };

    // Candidate placements per still-open shape kind covering this cell.
    let mut valid: Vec<(ShapeKind, Vec<&Placement>)> = Vec::new();
    for kind in kinds.iter() {
        if belief.is_confirmed(kind) {
            continue;
        }
        let mine: Vec<&Placement> = table()
            .of(kind)
            .iter()
            .filter(|p| p.covers(x, y) && belief.placement_fits(p))
            .collect();
        if !mine.is_empty() {
            valid.push((kind, mine));
        }
    }

    if valid.is_empty() {
        bail!("ship cell at ({x}, {y}) fits no remaining shape");
    }

    // Unique-shape rule: a single viable kind, or the destroyer/submarine
    // pair which shares its geometry, pins the shape; a unique placement of
    // that shape then pins the ship.
    let chosen = match valid.as_slice() {
        [(kind, _)] => Some(*kind),
        [(a, _), (b, _)]
            if (*a, *b) == (ShapeKind::Destroyer, ShapeKind::Submarine) =>
        {
            Some(*a)
        }
        _ => None,
    };
    if let Some(kind) = chosen {
        let list = &valid.iter().find(|(k, _)| *k == kind).unwrap().1;
        if list.len() == 1 {
            belief.confirm_ship(list[0].ship)?;
            return Ok(true);
        }
    }

    // Unique-unknown-free rule: the largest unconfirmed shape with exactly
    // one placement here that sits entirely on inferred ship cells.
    let largest = ShapeKind::ALL
        .into_iter()
        .find(|&k| !belief.is_confirmed(k));
    if let Some(largest) = largest {
        if let Some((_, list)) = valid.iter().find(|(k, _)| *k == largest) {
            let mut full = list.iter().filter(|p| {
                p.cells
                    .iter()
                    .all(|&(cx, cy)| belief.inferred(cx, cy) == Cell::Ship)
            });
            if let (Some(only), None) = (full.next(), full.next()) {
                belief.confirm_ship(only.ship)?;
                return Ok(true);
            }
        }
    }

    Ok(false)
}
