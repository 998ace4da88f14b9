use anyhow::bail;

use helicarrier_core::{decode_grid, Cell, FireResponse, ShapeKind, Ship, BOARD_SIZE};

use crate::candidates::{table, Placement};

pub const HEAT_NONE: f64 = 0.0;
/// Sentinel for a ship cell the bot knows about but has not fired yet;
/// larger than any synthesized weight.
pub const HEAT_MAX: f64 = 1e12;

/// Compact set of shape kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ShapeSet(u8);

impl ShapeSet {
    pub const EMPTY: ShapeSet = ShapeSet(0);

    pub fn full() -> Self {
        ShapeSet((1 << ShapeKind::COUNT) - 1)
    }

    pub fn only(kind: ShapeKind) -> Self {
        ShapeSet(1 << kind.index())
    }

    pub fn insert(&mut self, kind: ShapeKind) {
        self.0 |= 1 << kind.index();
    }

    pub fn remove(&mut self, kind: ShapeKind) {
        self.0 &= !(1 << kind.index());
    }

    pub fn contains(self, kind: ShapeKind) -> bool {
        self.0 >> kind.index() & 1 == 1
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = ShapeKind> {
        ShapeKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

/// Everything the bot believes about the current board.
///
/// `inferred` is monotone: once a cell leaves Unknown it never changes, and
/// a server grid that disagrees with it is a fatal error.
pub struct BeliefMap {
    inferred: [[Cell; BOARD_SIZE]; BOARD_SIZE],
    original: [[Cell; BOARD_SIZE]; BOARD_SIZE],
    confirmed: [[Option<Ship>; BOARD_SIZE]; BOARD_SIZE],
    /// Empty set means "any still-unconfirmed shape".
    possible: [[ShapeSet; BOARD_SIZE]; BOARD_SIZE],
    confirmed_shapes: ShapeSet,
    heat: [[f64; BOARD_SIZE]; BOARD_SIZE],
    gaps_marked: bool,
}

impl Default for BeliefMap {
    fn default() -> Self {
        Self::new()
    }
}

impl BeliefMap {
    pub fn new() -> Self {
        BeliefMap {
            inferred: [[Cell::Unknown; BOARD_SIZE]; BOARD_SIZE],
            original: [[Cell::Unknown; BOARD_SIZE]; BOARD_SIZE],
            confirmed: [[None; BOARD_SIZE]; BOARD_SIZE],
            possible: [[ShapeSet::EMPTY; BOARD_SIZE]; BOARD_SIZE],
            confirmed_shapes: ShapeSet::EMPTY,
            heat: [[HEAT_NONE; BOARD_SIZE]; BOARD_SIZE],
            gaps_marked: false,
        }
    }

    pub fn inferred(&self, x: usize, y: usize) -> Cell {
        self.inferred[x][y]
    }

    pub fn original(&self, x: usize, y: usize) -> Cell {
        self.original[x][y]
    }

    pub fn heat(&self, x: usize, y: usize) -> f64 {
        self.heat[x][y]
    }

    pub fn set_heat(&mut self, x: usize, y: usize, heat: f64) {
        self.heat[x][y] = heat;
    }

    pub fn confirmed_at(&self, x: usize, y: usize) -> Option<Ship> {
        self.confirmed[x][y]
    }

    pub fn possible_at(&self, x: usize, y: usize) -> ShapeSet {
        self.possible[x][y]
    }

    pub fn is_confirmed(&self, kind: ShapeKind) -> bool {
        self.confirmed_shapes.contains(kind)
    }

    pub fn unconfirmed_shapes(&self) -> ShapeSet {
        let mut set = ShapeSet::full();
        for kind in self.confirmed_shapes.iter() {
            set.remove(kind);
        }
        set
    }

    /// Demote a deduced-water cell. Only valid for Unknown cells.
    pub fn set_water(&mut self, x: usize, y: usize) {
        debug_assert_eq!(self.inferred[x][y], Cell::Unknown);
        self.inferred[x][y] = Cell::Water;
        self.heat[x][y] = HEAT_NONE;
    }

    /// Fold a server response into the belief. Any disagreement between a
    /// non-Unknown inferred cell and the server grid is fatal.
    pub fn update_from_response(&mut self, response: &FireResponse) -> anyhow::Result<()> {
        let grid = decode_grid(&response.grid)?;
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let server = grid[x][y];
                if server != Cell::Unknown {
                    match self.inferred[x][y] {
                        Cell::Unknown => self.inferred[x][y] = server,
                        held if held != server => bail!(
                            "belief contradicts server grid at ({x}, {y}): held {held:?}, server {server:?}"
                        ),
                        _ => {}
                    }
                }
                self.original[x][y] = server;
            }
        }

        if response.avenger_available && !self.gaps_marked {
            self.mark_helicarrier_gaps()?;
        }
        Ok(())
    }

    /// The avenger flag means the helicarrier outline is fully on the grid;
    /// the no-touch rule forces its four box corners to be water.
    fn mark_helicarrier_gaps(&mut self) -> anyhow::Result<()> {
        let full = table()
            .of(ShapeKind::Helicarrier)
            .iter()
            .find(|p| {
                p.cells
                    .iter()
                    .all(|&(x, y)| self.inferred[x][y] == Cell::Ship)
            })
            .map(|p| p.ship);
        let Some(ship) = full else {
            bail!("avenger granted but no fully discovered helicarrier found");
        };
        for (x, y) in ship.gap_cells() {
            if self.inferred[x][y] == Cell::Unknown {
                self.set_water(x, y);
            }
        }
        self.gaps_marked = true;
        Ok(())
    }

    /// Whether a placement is consistent with the belief: no footprint cell
    /// on water or outside the cell's allowed shapes, and no inferred ship
    /// touching the placement from outside.
    pub fn placement_fits(&self, placement: &Placement) -> bool {
        for &(x, y) in &placement.cells {
            if self.inferred[x][y] == Cell::Water {
                return false;
            }
            let allowed = self.possible[x][y];
            if !allowed.is_empty() && !allowed.contains(placement.ship.shape) {
                return false;
            }
        }
        placement
            .halo
            .iter()
            .all(|&(x, y)| self.inferred[x][y] != Cell::Ship)
    }

    /// Lock in a ship whose exact placement is now known.
    pub fn confirm_ship(&mut self, ship: Ship) -> anyhow::Result<()> {
        if self.confirmed_shapes.contains(ship.shape) {
            bail!("{} confirmed twice", ship.shape.as_str());
        }
        self.confirmed_shapes.insert(ship.shape);

        let cells = ship.cells();
        for &(x, y) in &cells {
            if self.inferred[x][y] == Cell::Water {
                bail!(
                    "confirmed {} overlaps inferred water at ({x}, {y})",
                    ship.shape.as_str()
                );
            }
            self.inferred[x][y] = Cell::Ship;
            self.confirmed[x][y] = Some(ship);
            self.possible[x][y] = ShapeSet::only(ship.shape);
            self.heat[x][y] = HEAT_MAX;
        }

        // No ship touches another: every unknown neighbour is water.
        for &(x, y) in &cells {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx < 0 || ny < 0 || nx >= BOARD_SIZE as i32 || ny >= BOARD_SIZE as i32 {
                        continue;
                    }
                    let (nx, ny) = (nx as usize, ny as usize);
                    if self.inferred[nx][ny] == Cell::Unknown {
                        self.set_water(nx, ny);
                    }
                }
            }
        }
        Ok(())
    }

    /// Fold in an IronMan hint: the cell is a ship cell of the smallest
    /// still-unconfirmed shape class.
    pub fn iron_man_hint(&mut self, x: usize, y: usize) -> anyhow::Result<()> {
        if self.inferred[x][y] == Cell::Water {
            bail!("iron man hinted ({x}, {y}) but it is inferred water");
        }
        self.inferred[x][y] = Cell::Ship;
        self.heat[x][y] = HEAT_MAX;

        let unconfirmed = self.unconfirmed_shapes();
        let Some(smallest) = unconfirmed.iter().map(|k| k.cell_count()).min() else {
            bail!("iron man hint with every shape already confirmed");
        };
        let mut allowed = ShapeSet::EMPTY;
        for kind in unconfirmed.iter() {
            if kind.cell_count() <= smallest {
                allowed.insert(kind);
            }
        }
        self.possible[x][y] = allowed;

        self.reproject_possible()
    }

    #[cfg(test)]
    pub(crate) fn force_ship_for_tests(&mut self, x: usize, y: usize) {
        self.inferred[x][y] = Cell::Ship;
    }

    #[cfg(test)]
    pub(crate) fn observe_ship_for_tests(&mut self, x: usize, y: usize) {
        self.inferred[x][y] = Cell::Ship;
        self.original[x][y] = Cell::Ship;
    }

    #[cfg(test)]
    pub(crate) fn observe_water_for_tests(&mut self, x: usize, y: usize) {
        self.inferred[x][y] = Cell::Water;
        self.original[x][y] = Cell::Water;
        self.heat[x][y] = HEAT_NONE;
    }

    /// Re-derive every constrained cell's shape set: a kind stays only if
    /// some fitting placement of it covers the cell.
    fn reproject_possible(&mut self) -> anyhow::Result<()> {
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let set = self.possible[x][y];
                if set.is_empty() || self.confirmed[x][y].is_some() {
                    continue;
                }
                let mut kept = ShapeSet::EMPTY;
                for kind in set.iter() {
                    if self.is_confirmed(kind) {
                        continue;
                    }
                    let reachable = table()
                        .of(kind)
                        .iter()
                        .any(|p| p.covers(x, y) && self.placement_fits(p));
                    if reachable {
                        kept.insert(kind);
                    }
                }
                if kept.is_empty() {
                    if self.inferred[x][y] == Cell::Ship {
                        bail!("ship cell at ({x}, {y}) lost every candidate shape");
                    }
                    self.possible[x][y] = ShapeSet::EMPTY;
                    if self.inferred[x][y] == Cell::Unknown {
                        self.set_water(x, y);
                    }
                } else {
                    self.possible[x][y] = kept;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helicarrier_core::{Rotation, GRID_CELLS};

    fn response_with_grid(grid: String) -> FireResponse {
        FireResponse {
            grid,
            cell: String::new(),
            result: false,
            avenger_available: false,
            map_id: 1,
            map_count: 200,
            move_count: 0,
            finished: false,
            avenger_result: None,
        }
    }

    fn grid_with(cells: &[(usize, usize, char)]) -> String {
        let mut grid = vec!['*'; GRID_CELLS];
        for &(x, y, c) in cells {
            grid[y * BOARD_SIZE + x] = c;
        }
        grid.into_iter().collect()
    }

    #[test]
    fn shape_set_basics() {
        let mut set = ShapeSet::EMPTY;
        assert!(set.is_empty());
        set.insert(ShapeKind::Destroyer);
        set.insert(ShapeKind::Submarine);
        assert_eq!(set.len(), 2);
        assert!(set.contains(ShapeKind::Destroyer));
        assert!(!set.contains(ShapeKind::Carrier));
        // Iteration follows the descending-size order of ALL.
        let kinds: Vec<ShapeKind> = set.iter().collect();
        assert_eq!(kinds, vec![ShapeKind::Destroyer, ShapeKind::Submarine]);
        set.remove(ShapeKind::Destroyer);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn server_cells_promote_unknown() {
        let mut belief = BeliefMap::new();
        let response = response_with_grid(grid_with(&[(2, 3, 'X'), (4, 4, '.')]));
        belief.update_from_response(&response).unwrap();
        assert_eq!(belief.inferred(2, 3), Cell::Ship);
        assert_eq!(belief.inferred(4, 4), Cell::Water);
        assert_eq!(belief.original(2, 3), Cell::Ship);
        assert_eq!(belief.inferred(0, 0), Cell::Unknown);
    }

    #[test]
    fn contradicting_grid_is_fatal() {
        let mut belief = BeliefMap::new();
        belief
            .update_from_response(&response_with_grid(grid_with(&[(2, 3, 'X')])))
            .unwrap();
        let err = belief
            .update_from_response(&response_with_grid(grid_with(&[(2, 3, '.')])))
            .unwrap_err();
        assert!(err.to_string().contains("contradicts"));
    }

    #[test]
    fn deduced_cells_survive_an_unknown_server_grid() {
        let mut belief = BeliefMap::new();
        belief.set_water(7, 7);
        belief
            .update_from_response(&response_with_grid(grid_with(&[])))
            .unwrap();
        // The server has not fired there; the deduction stands.
        assert_eq!(belief.inferred(7, 7), Cell::Water);
        assert_eq!(belief.original(7, 7), Cell::Unknown);
    }

    #[test]
    fn confirming_waters_the_neighbourhood() {
        let mut belief = BeliefMap::new();
        let ship = Ship::new(ShapeKind::PatrolBoat, 5, 5, Rotation::Vertical);
        belief.confirm_ship(ship).unwrap();

        assert!(belief.is_confirmed(ShapeKind::PatrolBoat));
        for (x, y) in ship.cells() {
            assert_eq!(belief.inferred(x, y), Cell::Ship);
            assert_eq!(belief.confirmed_at(x, y), Some(ship));
            assert_eq!(belief.heat(x, y), HEAT_MAX);
            assert_eq!(belief.possible_at(x, y), ShapeSet::only(ShapeKind::PatrolBoat));
        }
        for (x, y) in [(4, 4), (6, 4), (4, 7), (6, 7), (5, 4), (5, 7)] {
            assert_eq!(belief.inferred(x, y), Cell::Water, "({x}, {y})");
        }

        let again = belief.confirm_ship(ship).unwrap_err();
        assert!(again.to_string().contains("twice"));
    }

    #[test]
    fn avenger_flag_waters_the_helicarrier_gaps() {
        let mut belief = BeliefMap::new();
        let ship = Ship::new(ShapeKind::Helicarrier, 4, 4, Rotation::Vertical);
        let marks: Vec<(usize, usize, char)> =
            ship.cells().into_iter().map(|(x, y)| (x, y, 'X')).collect();
        let mut response = response_with_grid(grid_with(&marks));
        response.avenger_available = true;
        belief.update_from_response(&response).unwrap();

        for (x, y) in ship.gap_cells() {
            assert_eq!(belief.inferred(x, y), Cell::Water, "gap ({x}, {y})");
        }
    }

    #[test]
    fn iron_man_hint_restricts_to_smallest_unconfirmed() {
        let mut belief = BeliefMap::new();
        belief.iron_man_hint(6, 6).unwrap();
        assert_eq!(belief.inferred(6, 6), Cell::Ship);
        assert_eq!(belief.heat(6, 6), HEAT_MAX);
        // Smallest unconfirmed shape class is the 2-cell patrol boat.
        assert_eq!(belief.possible_at(6, 6), ShapeSet::only(ShapeKind::PatrolBoat));
    }

    #[test]
    fn placement_fits_respects_water_and_touch() {
        let mut belief = BeliefMap::new();
        let table = table();

        let fits_at = |belief: &BeliefMap, ship: Ship| {
            table
                .of(ship.shape)
                .iter()
                .find(|p| p.ship == ship)
                .map(|p| belief.placement_fits(p))
                .unwrap()
        };

        let boat = Ship::new(ShapeKind::PatrolBoat, 5, 5, Rotation::Vertical);
        assert!(fits_at(&belief, boat));

        belief.set_water(5, 5);
        assert!(!fits_at(&belief, boat), "footprint on water");

        let mut belief = BeliefMap::new();
        belief.inferred[4][4] = Cell::Ship;
        assert!(!fits_at(&belief, boat), "touches an outside ship cell");

        let mut belief = BeliefMap::new();
        belief.possible[5][5] = ShapeSet::only(ShapeKind::Carrier);
        assert!(!fits_at(&belief, boat), "cell restricted to another shape");
    }
}
