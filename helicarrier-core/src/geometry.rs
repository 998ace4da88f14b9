use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// What a single board cell looks like to an observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Water,
    Ship,
    Unknown,
}

impl Cell {
    /// Wire encoding used in the 144-char grid string.
    pub fn to_wire(self) -> char {
        match self {
            Cell::Water => '.',
            Cell::Ship => 'X',
            Cell::Unknown => '*',
        }
    }

    pub fn from_wire(c: char) -> Option<Self> {
        match c {
            '.' => Some(Cell::Water),
            'X' => Some(Cell::Ship),
            '*' => Some(Cell::Unknown),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Vertical,
    Horizontal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Helicarrier,
    Carrier,
    Battleship,
    Destroyer,
    Submarine,
    PatrolBoat,
}

impl ShapeKind {
    /// All kinds in descending cell-count order. Placement iterates this
    /// order so the helicarrier, the hardest shape to fit, goes first.
    pub const ALL: [ShapeKind; 6] = [
        ShapeKind::Helicarrier,
        ShapeKind::Carrier,
        ShapeKind::Battleship,
        ShapeKind::Destroyer,
        ShapeKind::Submarine,
        ShapeKind::PatrolBoat,
    ];

    pub const COUNT: usize = 6;

    pub fn index(self) -> usize {
        match self {
            ShapeKind::Helicarrier => 0,
            ShapeKind::Carrier => 1,
            ShapeKind::Battleship => 2,
            ShapeKind::Destroyer => 3,
            ShapeKind::Submarine => 4,
            ShapeKind::PatrolBoat => 5,
        }
    }

    pub fn shape(self) -> &'static Shape {
        &SHAPES[self.index()]
    }

    pub fn cell_count(self) -> usize {
        self.shape().cells.len()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Helicarrier => "helicarrier",
            ShapeKind::Carrier => "carrier",
            ShapeKind::Battleship => "battleship",
            ShapeKind::Destroyer => "destroyer",
            ShapeKind::Submarine => "submarine",
            ShapeKind::PatrolBoat => "patrol_boat",
        }
    }
}

/// Canonical (vertical) footprint of one ship kind, interned per process.
#[derive(Debug)]
pub struct Shape {
    pub kind: ShapeKind,
    pub width: usize,
    pub height: usize,
    /// Occupied cells of the canonical vertical layout, row-major.
    pub cells: Vec<(usize, usize)>,
}

impl Shape {
    fn from_rows(kind: ShapeKind, rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows[0].len();
        let mut cells = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            debug_assert_eq!(row.len(), width);
            for (x, c) in row.chars().enumerate() {
                if c == 'X' {
                    cells.push((x, y));
                }
            }
        }
        Shape {
            kind,
            width,
            height,
            cells,
        }
    }
}

// The helicarrier is the only non-linear shape: an 11-cell block in a 3x5
// box whose four corners stay water.
static SHAPES: Lazy<[Shape; 6]> = Lazy::new(|| {
    [
        Shape::from_rows(
            ShapeKind::Helicarrier,
            &[".X.", "XXX", "XXX", "XXX", ".X."],
        ),
        Shape::from_rows(ShapeKind::Carrier, &["X", "X", "X", "X", "X"]),
        Shape::from_rows(ShapeKind::Battleship, &["X", "X", "X", "X"]),
        Shape::from_rows(ShapeKind::Destroyer, &["X", "X", "X"]),
        Shape::from_rows(ShapeKind::Submarine, &["X", "X", "X"]),
        Shape::from_rows(ShapeKind::PatrolBoat, &["X", "X"]),
    ]
});

/// One placed ship: a shape anchored at (x, y) with a rotation. Equality is
/// structural on all four fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ship {
    pub shape: ShapeKind,
    pub x: usize,
    pub y: usize,
    pub rotation: Rotation,
}

impl Ship {
    pub fn new(shape: ShapeKind, x: usize, y: usize, rotation: Rotation) -> Self {
        Ship {
            shape,
            x,
            y,
            rotation,
        }
    }

    /// Width and height after rotation; horizontal swaps the axes.
    pub fn dims(&self) -> (usize, usize) {
        let shape = self.shape.shape();
        match self.rotation {
            Rotation::Vertical => (shape.width, shape.height),
            Rotation::Horizontal => (shape.height, shape.width),
        }
    }

    /// Absolute occupied cells. Horizontal rotation swaps the relative
    /// coordinate axes of the canonical layout.
    pub fn cells(&self) -> Vec<(usize, usize)> {
        let shape = self.shape.shape();
        shape
            .cells
            .iter()
            .map(|&(cx, cy)| match self.rotation {
                Rotation::Vertical => (self.x + cx, self.y + cy),
                Rotation::Horizontal => (self.x + cy, self.y + cx),
            })
            .collect()
    }

    /// Bounding-box cells that the shape leaves unoccupied (the
    /// helicarrier's four corner gaps; empty for the linear shapes).
    pub fn gap_cells(&self) -> Vec<(usize, usize)> {
        let (w, h) = self.dims();
        let occupied = self.cells();
        let mut gaps = Vec::new();
        for gy in self.y..self.y + h {
            for gx in self.x..self.x + w {
                if !occupied.contains(&(gx, gy)) {
                    gaps.push((gx, gy));
                }
            }
        }
        gaps
    }

    pub fn covers(&self, x: usize, y: usize) -> bool {
        self.cells().contains(&(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_counts_match_the_fleet() {
        let counts: Vec<usize> = ShapeKind::ALL.iter().map(|k| k.cell_count()).collect();
        assert_eq!(counts, vec![11, 5, 4, 3, 3, 2]);
        assert_eq!(counts.iter().sum::<usize>(), 28);
    }

    #[test]
    fn helicarrier_box_and_gaps() {
        let shape = ShapeKind::Helicarrier.shape();
        assert_eq!((shape.width, shape.height), (3, 5));

        let ship = Ship::new(ShapeKind::Helicarrier, 0, 0, Rotation::Vertical);
        let gaps = ship.gap_cells();
        assert_eq!(gaps, vec![(0, 0), (2, 0), (0, 4), (2, 4)]);
    }

    #[test]
    fn horizontal_rotation_swaps_axes() {
        for kind in ShapeKind::ALL {
            let vertical = Ship::new(kind, 0, 0, Rotation::Vertical);
            let horizontal = Ship::new(kind, 0, 0, Rotation::Horizontal);

            let swapped: Vec<(usize, usize)> =
                vertical.cells().into_iter().map(|(x, y)| (y, x)).collect();
            assert_eq!(horizontal.cells(), swapped, "{kind:?}");

            let (w, h) = vertical.dims();
            assert_eq!(horizontal.dims(), (h, w), "{kind:?}");
        }
    }

    #[test]
    fn helicarrier_dims_per_rotation() {
        let v = Ship::new(ShapeKind::Helicarrier, 0, 0, Rotation::Vertical);
        let h = Ship::new(ShapeKind::Helicarrier, 0, 0, Rotation::Horizontal);
        assert_eq!(v.dims(), (3, 5));
        assert_eq!(h.dims(), (5, 3));
    }

    #[test]
    fn linear_shapes_have_one_column() {
        for kind in [
            ShapeKind::Carrier,
            ShapeKind::Battleship,
            ShapeKind::Destroyer,
            ShapeKind::Submarine,
            ShapeKind::PatrolBoat,
        ] {
            let shape = kind.shape();
            assert_eq!(shape.width, 1);
            assert_eq!(shape.height, kind.cell_count());
            assert!(Ship::new(kind, 3, 3, Rotation::Vertical).gap_cells().is_empty());
        }
    }

    #[test]
    fn wire_chars_round_trip() {
        for cell in [Cell::Water, Cell::Ship, Cell::Unknown] {
            assert_eq!(Cell::from_wire(cell.to_wire()), Some(cell));
        }
        assert_eq!(Cell::from_wire('?'), None);
    }
}
