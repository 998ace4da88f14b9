use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geometry::{Cell, Rotation, ShapeKind, Ship};

pub const BOARD_SIZE: usize = 12;
pub const FLEET_SIZE: usize = 6;
/// How many undiscovered cells a Thor strike reveals on top of the base shot.
pub const THOR_REVEAL_COUNT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Avenger {
    Thor,
    IronMan,
    Hulk,
}

impl Avenger {
    pub fn as_str(self) -> &'static str {
        match self {
            Avenger::Thor => "thor",
            Avenger::IronMan => "ironman",
            Avenger::Hulk => "hulk",
        }
    }
}

impl FromStr for Avenger {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thor" => Ok(Avenger::Thor),
            "ironman" => Ok(Avenger::IronMan),
            "hulk" => Ok(Avenger::Hulk),
            _ => Err(EngineError::Data(format!("unknown avenger: {s}"))),
        }
    }
}

/// Outcome of a single shot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shot {
    pub cell: Cell,
    /// The cell was already discovered; the shot did not count.
    pub repeat: bool,
}

/// One cell revealed (or hinted) by an avenger, in engine coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AvengerReveal {
    pub x: usize,
    pub y: usize,
    pub hit: bool,
}

/// Authoritative state of one 12x12 map.
#[derive(Clone, Debug, PartialEq)]
pub struct Board {
    id: u64,
    ships: Vec<Ship>,
    /// Ship index per occupied cell.
    grid: [[Option<u8>; BOARD_SIZE]; BOARD_SIZE],
    discovered: [[bool; BOARD_SIZE]; BOARD_SIZE],
    move_count: u32,
    avenger_available: bool,
}

impl Board {
    pub(crate) fn empty(id: u64) -> Self {
        Board {
            id,
            ships: Vec::with_capacity(FLEET_SIZE),
            grid: [[None; BOARD_SIZE]; BOARD_SIZE],
            discovered: [[false; BOARD_SIZE]; BOARD_SIZE],
            move_count: 0,
            avenger_available: false,
        }
    }

    /// Place the full fleet uniformly at random. Shapes go in descending
    /// size order; a dead-end (some shape with no legal position left)
    /// restarts the whole board.
    pub fn place_random<R: Rng>(id: u64, rng: &mut R) -> Board {
        loop {
            if let Some(board) = Self::try_place_random(id, rng) {
                return board;
            }
        }
    }

    fn try_place_random<R: Rng>(id: u64, rng: &mut R) -> Option<Board> {
        let mut board = Board::empty(id);
        for kind in ShapeKind::ALL {
            let options = board.legal_positions(kind);
            let ship = *options.choose(rng)?;
            board.place(ship).ok()?;
        }
        Some(board)
    }

    /// Every (x, y, rotation) at which `kind` currently fits.
    pub fn legal_positions(&self, kind: ShapeKind) -> Vec<Ship> {
        let mut out = Vec::new();
        for rotation in [Rotation::Vertical, Rotation::Horizontal] {
            let (w, h) = Ship::new(kind, 0, 0, rotation).dims();
            for y in 0..=BOARD_SIZE - h {
                for x in 0..=BOARD_SIZE - w {
                    let ship = Ship::new(kind, x, y, rotation);
                    if self.can_place(&ship) {
                        out.push(ship);
                    }
                }
            }
        }
        out
    }

    /// Bounding box in bounds, and every occupied cell's nine-cell
    /// neighbourhood free of already-placed ships (the no-touch rule).
    pub fn can_place(&self, ship: &Ship) -> bool {
        let (w, h) = ship.dims();
        if ship.x + w > BOARD_SIZE || ship.y + h > BOARD_SIZE {
            return false;
        }
        ship.cells()
            .iter()
            .all(|&(cx, cy)| self.neighbourhood_free(cx, cy))
    }

    fn neighbourhood_free(&self, x: usize, y: usize) -> bool {
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if !in_bounds(nx, ny) {
                    continue;
                }
                if self.grid[nx as usize][ny as usize].is_some() {
                    return false;
                }
            }
        }
        true
    }

    pub fn place(&mut self, ship: Ship) -> Result<(), EngineError> {
        if self.ships.len() == FLEET_SIZE || !self.can_place(&ship) {
            return Err(EngineError::PlacementConflict);
        }
        let idx = self.ships.len() as u8;
        for (cx, cy) in ship.cells() {
            self.grid[cx][cy] = Some(idx);
        }
        self.ships.push(ship);
        Ok(())
    }

    pub fn fire(&mut self, x: i32, y: i32) -> Result<Shot, EngineError> {
        let (ux, uy) = checked(x, y)?;
        let cell = self.cell_at(ux, uy);
        if self.discovered[ux][uy] {
            return Ok(Shot { cell, repeat: true });
        }
        self.discover(ux, uy);
        self.move_count += 1;
        Ok(Shot {
            cell,
            repeat: false,
        })
    }

    /// Spend the avenger on a shot at (x, y). The avenger is consumed even
    /// when its effect turns out redundant; only the base shot can add to
    /// the move count.
    pub fn fire_avenger<R: Rng>(
        &mut self,
        x: i32,
        y: i32,
        avenger: Avenger,
        rng: &mut R,
    ) -> Result<(Shot, Vec<AvengerReveal>), EngineError> {
        if !self.avenger_available {
            return Err(EngineError::AvengerUnavailable);
        }
        let (ux, uy) = checked(x, y)?;
        self.avenger_available = false;

        let cell = self.cell_at(ux, uy);
        let repeat = self.discovered[ux][uy];
        if !repeat {
            self.discover(ux, uy);
            self.move_count += 1;
        }
        let shot = Shot { cell, repeat };

        let reveals = match avenger {
            Avenger::Thor => self.thor(rng),
            Avenger::IronMan => self.iron_man(rng),
            Avenger::Hulk => self.hulk(ux, uy),
        };
        Ok((shot, reveals))
    }

    /// Reveal up to ten undiscovered cells, drawn uniformly without
    /// replacement. Free of move-count charges.
    fn thor<R: Rng>(&mut self, rng: &mut R) -> Vec<AvengerReveal> {
        let mut pool: Vec<(usize, usize)> = Vec::new();
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                if !self.discovered[x][y] {
                    pool.push((x, y));
                }
            }
        }
        let count = pool.len().min(THOR_REVEAL_COUNT);
        let (picked, _) = pool.partial_shuffle(rng, count);

        let mut reveals = Vec::with_capacity(count);
        for &(x, y) in picked.iter() {
            let hit = self.cell_at(x, y) == Cell::Ship;
            self.discover(x, y);
            reveals.push(AvengerReveal { x, y, hit });
        }
        reveals
    }

    /// Hint one undiscovered cell of the smallest non-destroyed ship
    /// (ties: first placed). The cell is NOT marked discovered.
    fn iron_man<R: Rng>(&mut self, rng: &mut R) -> Vec<AvengerReveal> {
        let target = (0..self.ships.len())
            .filter(|&i| !self.ship_destroyed(i))
            .min_by_key(|&i| self.ships[i].shape.cell_count());
        let Some(idx) = target else {
            return Vec::new();
        };

        let open: Vec<(usize, usize)> = self.ships[idx]
            .cells()
            .into_iter()
            .filter(|&(cx, cy)| !self.discovered[cx][cy])
            .collect();
        // A non-destroyed ship always has an open cell.
        match open.choose(rng) {
            Some(&(x, y)) => vec![AvengerReveal { x, y, hit: true }],
            None => Vec::new(),
        }
    }

    /// Reveal the whole ship under (x, y); nothing extra on water.
    fn hulk(&mut self, x: usize, y: usize) -> Vec<AvengerReveal> {
        let Some(idx) = self.grid[x][y] else {
            return Vec::new();
        };
        let cells = self.ships[idx as usize].cells();
        let mut reveals = Vec::with_capacity(cells.len());
        for (cx, cy) in cells {
            self.discover(cx, cy);
            reveals.push(AvengerReveal {
                x: cx,
                y: cy,
                hit: true,
            });
        }
        reveals
    }

    /// Mark a cell discovered; grants the avenger on the discovery that
    /// completes the helicarrier.
    fn discover(&mut self, x: usize, y: usize) {
        if self.discovered[x][y] {
            return;
        }
        self.discovered[x][y] = true;

        if let Some(idx) = self.grid[x][y] {
            let ship = self.ships[idx as usize];
            if ship.shape == ShapeKind::Helicarrier && self.ship_destroyed(idx as usize) {
                self.avenger_available = true;
            }
        }
    }

    pub fn ship_destroyed(&self, idx: usize) -> bool {
        self.ships[idx]
            .cells()
            .into_iter()
            .all(|(x, y)| self.discovered[x][y])
    }

    pub fn all_discovered(&self) -> bool {
        (0..self.ships.len()).all(|i| self.ship_destroyed(i))
    }

    /// Ground truth at a cell, ignoring discovery state.
    pub fn cell_at(&self, x: usize, y: usize) -> Cell {
        if self.grid[x][y].is_some() {
            Cell::Ship
        } else {
            Cell::Water
        }
    }

    pub fn is_discovered(&self, x: usize, y: usize) -> bool {
        self.discovered[x][y]
    }

    /// Observer view of a cell: undiscovered cells stay unknown.
    pub fn observed(&self, x: usize, y: usize) -> Cell {
        if self.discovered[x][y] {
            self.cell_at(x, y)
        } else {
            Cell::Unknown
        }
    }

    /// 144-char row-major grid string (index = y * 12 + x).
    pub fn render_grid(&self) -> String {
        let mut out = String::with_capacity(BOARD_SIZE * BOARD_SIZE);
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                out.push(self.observed(x, y).to_wire());
            }
        }
        out
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn avenger_available(&self) -> bool {
        self.avenger_available
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn discovered_count(&self) -> u32 {
        let mut n = 0;
        for col in &self.discovered {
            for &d in col {
                if d {
                    n += 1;
                }
            }
        }
        n
    }

    pub(crate) fn restore_state(
        &mut self,
        discovered: &[(usize, usize)],
        move_count: u32,
        avenger_available: bool,
    ) {
        for &(x, y) in discovered {
            self.discovered[x][y] = true;
        }
        self.move_count = move_count;
        self.avenger_available = avenger_available;
    }

    pub(crate) fn discovered_cells(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                if self.discovered[x][y] {
                    out.push((x, y));
                }
            }
        }
        out
    }
}

pub fn in_bounds(x: i32, y: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&x) && (0..BOARD_SIZE as i32).contains(&y)
}

fn checked(x: i32, y: i32) -> Result<(usize, usize), EngineError> {
    if in_bounds(x, y) {
        Ok((x as usize, y as usize))
    } else {
        Err(EngineError::OutOfBounds { x, y })
    }
}
