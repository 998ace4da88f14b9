use std::ops::Range;

use once_cell::sync::Lazy;

use helicarrier_core::{Rotation, ShapeKind, Ship, BOARD_SIZE};

/// One legal placement on an empty board, with its footprint and halo
/// precomputed for the hot loops.
pub struct Placement {
    pub ship: Ship,
    pub cells: Vec<(usize, usize)>,
    /// In-bounds cells adjacent to the footprint (footprint excluded).
    /// Covers the no-touch rule and, for the helicarrier, the gap corners.
    pub halo: Vec<(usize, usize)>,
}

impl Placement {
    fn new(ship: Ship) -> Self {
        let cells = ship.cells();
        let mut halo = Vec::new();
        for &(x, y) in &cells {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx < 0 || ny < 0 || nx >= BOARD_SIZE as i32 || ny >= BOARD_SIZE as i32 {
                        continue;
                    }
                    let n = (nx as usize, ny as usize);
                    if !cells.contains(&n) && !halo.contains(&n) {
                        halo.push(n);
                    }
                }
            }
        }
        Placement { ship, cells, halo }
    }

    pub fn covers(&self, x: usize, y: usize) -> bool {
        self.cells.contains(&(x, y))
    }
}

/// Every legal placement of every shape on an empty 12x12 board, plus the
/// dense pairwise incompatibility relation. Built once per process; shared
/// read-only afterwards.
pub struct PlacementTable {
    placements: Vec<Placement>,
    by_shape: [Range<usize>; ShapeKind::COUNT],
    incompatible: Vec<u64>,
    words_per_row: usize,
}

impl PlacementTable {
    fn build() -> Self {
        let mut placements = Vec::new();
        let mut by_shape: [Range<usize>; ShapeKind::COUNT] = std::array::from_fn(|_| 0..0);

        for kind in ShapeKind::ALL {
            let start = placements.len();
            for rotation in [Rotation::Vertical, Rotation::Horizontal] {
                let (w, h) = Ship::new(kind, 0, 0, rotation).dims();
                for y in 0..=BOARD_SIZE - h {
                    for x in 0..=BOARD_SIZE - w {
                        placements.push(Placement::new(Ship::new(kind, x, y, rotation)));
                    }
                }
            }
            by_shape[kind.index()] = start..placements.len();
        }

        let n = placements.len();
        let words_per_row = (n + 63) / 64;
        let mut incompatible = vec![0u64; n * words_per_row];
        for a in 0..n {
            for b in a + 1..n {
                if conflicts(&placements[a], &placements[b]) {
                    incompatible[a * words_per_row + b / 64] |= 1 << (b % 64);
                    incompatible[b * words_per_row + a / 64] |= 1 << (a % 64);
                }
            }
        }

        PlacementTable {
            placements,
            by_shape,
            incompatible,
            words_per_row,
        }
    }

    pub fn all(&self) -> &[Placement] {
        &self.placements
    }

    pub fn get(&self, index: usize) -> &Placement {
        &self.placements[index]
    }

    pub fn range_of(&self, kind: ShapeKind) -> Range<usize> {
        self.by_shape[kind.index()].clone()
    }

    pub fn of(&self, kind: ShapeKind) -> &[Placement] {
        &self.placements[self.range_of(kind)]
    }

    /// Whether two placements overlap or violate the no-touch rule.
    pub fn incompatible(&self, a: usize, b: usize) -> bool {
        self.incompatible[a * self.words_per_row + b / 64] >> (b % 64) & 1 == 1
    }
}

/// Overlap-or-touch: any two cells within Chebyshev distance 1.
fn conflicts(a: &Placement, b: &Placement) -> bool {
    a.cells.iter().any(|&(ax, ay)| {
        b.cells
            .iter()
            .any(|&(bx, by)| ax.abs_diff(bx) <= 1 && ay.abs_diff(by) <= 1)
    })
}

static TABLE: Lazy<PlacementTable> = Lazy::new(PlacementTable::build);

pub fn table() -> &'static PlacementTable {
    &TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_shape_position() {
        let table = table();
        // Linear 1xL shapes: 2 rotations * 12 * (13 - L); helicarrier: 2 * 10 * 8.
        assert_eq!(table.of(ShapeKind::Helicarrier).len(), 160);
        assert_eq!(table.of(ShapeKind::Carrier).len(), 192);
        assert_eq!(table.of(ShapeKind::Battleship).len(), 216);
        assert_eq!(table.of(ShapeKind::Destroyer).len(), 240);
        assert_eq!(table.of(ShapeKind::Submarine).len(), 240);
        assert_eq!(table.of(ShapeKind::PatrolBoat).len(), 264);
        assert_eq!(table.all().len(), 1312);
    }

    fn index_of(ship: Ship) -> usize {
        let table = table();
        let range = table.range_of(ship.shape);
        range
            .clone()
            .find(|&i| table.get(i).ship == ship)
            .unwrap_or_else(|| panic!("{ship:?} not in table"))
    }

    #[test]
    fn touching_placements_are_incompatible() {
        let table = table();
        let a = index_of(Ship::new(ShapeKind::Carrier, 0, 0, Rotation::Vertical));

        // Overlapping.
        let b = index_of(Ship::new(ShapeKind::Destroyer, 0, 2, Rotation::Vertical));
        assert!(table.incompatible(a, b));

        // Diagonally adjacent.
        let c = index_of(Ship::new(ShapeKind::PatrolBoat, 1, 5, Rotation::Vertical));
        assert!(table.incompatible(a, c));

        // One column of water between them.
        let d = index_of(Ship::new(ShapeKind::PatrolBoat, 2, 0, Rotation::Vertical));
        assert!(!table.incompatible(a, d));
        assert!(!table.incompatible(d, a));
    }

    #[test]
    fn halo_surrounds_the_footprint() {
        let table = table();
        let idx = index_of(Ship::new(ShapeKind::PatrolBoat, 5, 5, Rotation::Vertical));
        let p = table.get(idx);
        // A 1x2 ship away from the edges has a 4x3 bounding ring minus the
        // two footprint cells.
        assert_eq!(p.halo.len(), 10);
        assert!(p.halo.contains(&(4, 4)));
        assert!(!p.halo.contains(&(5, 5)));
    }

    #[test]
    fn helicarrier_halo_includes_gap_corners() {
        let table = table();
        let idx = index_of(Ship::new(ShapeKind::Helicarrier, 4, 4, Rotation::Vertical));
        let p = table.get(idx);
        for corner in [(4, 4), (6, 4), (4, 8), (6, 8)] {
            assert!(p.halo.contains(&corner), "missing gap corner {corner:?}");
            assert!(!p.cells.contains(&corner));
        }
    }
}
