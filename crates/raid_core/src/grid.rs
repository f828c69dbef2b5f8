//! Uniform-cell spatial index over static world objects.
//!
//! Resource nodes and walls never move, so they are registered once in the
//! cell their position truncates into. Players, turrets, spikes and
//! projectiles are not indexed; there are few of them and they would need
//! re-indexing every tick, so callers scan those in full.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::{Fixed, Vec2Fixed};

/// Cell coordinate `(column, row)`.
pub type CellIndex = (i32, i32);

/// Square-cell grid covering the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialGrid {
    cell_size: u32,
    width: u32,
    height: u32,
    columns: i32,
    rows: i32,
    cells: Vec<Vec<EntityId>>,
}

impl SpatialGrid {
    /// Create an empty grid for a `width` x `height` map.
    ///
    /// Partial cells at the far edges are kept, so every in-bounds point
    /// maps to a cell.
    #[must_use]
    pub fn new(width: u32, height: u32, cell_size: u32) -> Self {
        let cell_size = cell_size.max(1);
        let columns = i32::try_from(width.div_ceil(cell_size)).unwrap_or(i32::MAX);
        let rows = i32::try_from(height.div_ceil(cell_size)).unwrap_or(i32::MAX);
        let count = usize::try_from(columns).unwrap_or(0) * usize::try_from(rows).unwrap_or(0);
        Self {
            cell_size,
            width,
            height,
            columns,
            rows,
            cells: vec![Vec::new(); count],
        }
    }

    /// Cell containing `position` (floor division, may be out of range).
    #[must_use]
    pub fn cell_of(&self, position: Vec2Fixed) -> CellIndex {
        let size = Fixed::from_num(self.cell_size);
        let column = (position.x / size).floor().to_num::<i32>();
        let row = (position.y / size).floor().to_num::<i32>();
        (column, row)
    }

    fn slot(&self, (column, row): CellIndex) -> Option<usize> {
        if column < 0 || row < 0 || column >= self.columns || row >= self.rows {
            return None;
        }
        usize::try_from(row * self.columns + column).ok()
    }

    /// Whether a point lies on the map (`0..=width-1`, `0..=height-1`).
    #[must_use]
    pub fn within_bounds(&self, position: Vec2Fixed) -> bool {
        let max_x = Fixed::from_num(self.width) - Fixed::ONE;
        let max_y = Fixed::from_num(self.height) - Fixed::ONE;
        position.x >= Fixed::ZERO
            && position.y >= Fixed::ZERO
            && position.x <= max_x
            && position.y <= max_y
    }

    /// Register an entity at `position`.
    ///
    /// Returns `false` (and registers nothing) if the position falls
    /// outside every cell.
    pub fn add(&mut self, id: EntityId, position: Vec2Fixed) -> bool {
        let Some(slot) = self.slot(self.cell_of(position)) else {
            return false;
        };
        self.cells[slot].push(id);
        true
    }

    /// Deregister an entity previously added at `position`.
    ///
    /// Removing an entity that is not registered there is a no-op and
    /// returns `false`; other entries in the cell are untouched.
    pub fn remove(&mut self, id: EntityId, position: Vec2Fixed) -> bool {
        let Some(slot) = self.slot(self.cell_of(position)) else {
            return false;
        };
        let cell = &mut self.cells[slot];
        // newest entries are the most likely to be removed
        match cell.iter().rposition(|&entry| entry == id) {
            Some(index) => {
                cell.remove(index);
                true
            }
            None => false,
        }
    }

    /// All entities in the `(2 * ring + 1)^2` block of cells centred on
    /// the cell containing `position`.
    ///
    /// Out-of-range cells contribute nothing. Order is deterministic:
    /// column-major over the block, insertion order within a cell.
    #[must_use]
    pub fn query_near(&self, position: Vec2Fixed, ring: i32) -> Vec<EntityId> {
        let (column, row) = self.cell_of(position);
        let ring = ring.max(0);
        let mut found = Vec::new();
        for dx in -ring..=ring {
            for dy in -ring..=ring {
                if let Some(slot) = self.slot((column + dx, row + dy)) {
                    found.extend_from_slice(&self.cells[slot]);
                }
            }
        }
        found
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Whether no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }
}
