//! Fixed build locations for towers.

use glam::Vec2;
use tower_duel_core::GridCell;

/// Side length of the square footprint reserved by each spot.
pub const SPOT_FOOTPRINT: u32 = 4;

/// Number of buildable spots on the map.
pub const SPOT_COUNT: usize = 4;

const SPOT_ORIGINS: [Vec2; SPOT_COUNT] = [
    Vec2::new(5.0, 3.0),
    Vec2::new(8.0, 11.0),
    Vec2::new(15.0, 3.0),
    Vec2::new(15.0, 11.0),
];

/// One of the fixed locations where a tower may be built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSpot {
    origin: Vec2,
    /// Set once a tower stands on the spot.
    pub occupied: bool,
}

impl TowerSpot {
    /// Upper-left corner of the spot in grid coordinates.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Grid cell anchoring the spot's footprint.
    #[must_use]
    pub fn cell(&self) -> GridCell {
        GridCell::containing(self.origin)
    }

    /// Reports whether the cell falls inside the spot's footprint.
    #[must_use]
    pub fn contains(&self, cell: GridCell) -> bool {
        cell.is_within(self.cell(), SPOT_FOOTPRINT, SPOT_FOOTPRINT)
    }
}

/// Spots laid out for a fresh match, all unoccupied.
pub(crate) fn initial_spots() -> [TowerSpot; SPOT_COUNT] {
    SPOT_ORIGINS.map(|origin| TowerSpot {
        origin,
        occupied: false,
    })
}
