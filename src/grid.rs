//! Spatial grid: per-cell depth, terrain class and occupancy.
//!
//! Each cell has one agent slot and one food slot. Occupancy is only ever
//! changed through [`Grid::try_occupy`] and [`Grid::vacate`].

use crate::config::WorldConfig;
use crate::geometry::Position;
use serde::{Deserialize, Serialize};

/// Terrain class of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    OpenWater,
    SeaFloor,
}

impl CellType {
    /// Whether agents may move into a cell of this type
    #[inline]
    pub fn is_passable(self) -> bool {
        matches!(self, CellType::OpenWater)
    }
}

/// Kind of entity holding a cell slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Agent,
    Food,
}

/// An occupied slot: entity id plus its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occupant {
    pub id: u64,
    pub kind: EntityKind,
}

/// A single grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub depth: f32,
    pub cell_type: CellType,
    agent: Option<u64>,
    food: Option<u64>,
}

impl Cell {
    pub fn new(depth: f32, cell_type: CellType) -> Self {
        Self {
            depth,
            cell_type,
            agent: None,
            food: None,
        }
    }

    /// True when neither slot is held
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agent.is_none() && self.food.is_none()
    }

    /// Id held in the slot for `kind`
    #[inline]
    pub fn slot(&self, kind: EntityKind) -> Option<u64> {
        match kind {
            EntityKind::Agent => self.agent,
            EntityKind::Food => self.food,
        }
    }

    /// Topmost occupant: the agent if present, otherwise the food
    pub fn occupant(&self) -> Option<Occupant> {
        self.agent
            .map(|id| Occupant { id, kind: EntityKind::Agent })
            .or_else(|| self.food.map(|id| Occupant { id, kind: EntityKind::Food }))
    }

    fn slot_mut(&mut self, kind: EntityKind) -> &mut Option<u64> {
        match kind {
            EntityKind::Agent => &mut self.agent,
            EntityKind::Food => &mut self.food,
        }
    }
}

/// Fixed-size 2D array of cells, stored row-major
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    max_depth: f32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build the grid, assigning depth by row gradient and classifying
    /// the bottom rows (and anything past the depth threshold) as sea floor.
    pub fn new(config: &WorldConfig) -> Self {
        let width = config.width;
        let height = config.height;
        let mut cells = Vec::with_capacity(width * height);

        for row in 0..height {
            let depth = depth_at_row(config, row);
            let cell_type = classify(config, row, depth);
            for _ in 0..width {
                cells.push(Cell::new(depth, cell_type));
            }
        }

        Self {
            width,
            height,
            max_depth: config.max_depth,
            cells,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn is_within_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.is_within_bounds(x, y) {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    /// Cell at `(x, y)`
    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Depth and type of the cell at `(x, y)`
    pub fn cell_properties(&self, x: i32, y: i32) -> Option<(f32, CellType)> {
        self.cell(x, y).map(|c| (c.depth, c.cell_type))
    }

    /// Whether any slot of the cell is held; `None` out of bounds
    pub fn is_occupied(&self, x: i32, y: i32) -> Option<bool> {
        self.cell(x, y).map(|c| !c.is_empty())
    }

    /// Id of the topmost occupant (agent over food)
    pub fn occupant_id(&self, x: i32, y: i32) -> Option<u64> {
        self.cell(x, y).and_then(Cell::occupant).map(|o| o.id)
    }

    /// Id held in the `kind` slot of the cell
    pub fn occupant(&self, x: i32, y: i32, kind: EntityKind) -> Option<u64> {
        self.cell(x, y).and_then(|c| c.slot(kind))
    }

    /// Atomically claim the `kind` slot at `(x, y)` for `id`.
    ///
    /// Fails without touching anything when out of bounds or when the slot
    /// is already held.
    pub fn try_occupy(&mut self, x: i32, y: i32, id: u64, kind: EntityKind) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        let slot = self.cells[i].slot_mut(kind);
        if slot.is_some() {
            return false;
        }
        *slot = Some(id);
        true
    }

    /// Release the `kind` slot at `(x, y)`. Empty or out-of-range cells
    /// are a no-op.
    pub fn vacate(&mut self, x: i32, y: i32, kind: EntityKind) {
        if let Some(i) = self.index(x, y) {
            *self.cells[i].slot_mut(kind) = None;
        }
    }

    /// In bounds and open water
    #[inline]
    pub fn is_passable(&self, x: i32, y: i32) -> bool {
        self.cell(x, y).is_some_and(|c| c.cell_type.is_passable())
    }

    /// Cell depth scaled into `[0, 1]` by the deepest configured depth
    pub fn normalized_depth(&self, x: i32, y: i32) -> Option<f32> {
        let cell = self.cell(x, y)?;
        if self.max_depth > 0.0 {
            Some((cell.depth / self.max_depth).clamp(0.0, 1.0))
        } else {
            Some(0.0)
        }
    }

    /// Unoccupied open-water cells in row-major order
    pub fn free_open_water(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_empty() && c.cell_type.is_passable())
            .map(|(i, _)| self.position_of(i))
            .collect()
    }

    /// Every held slot as `(position, occupant)`, row-major
    pub fn occupied_slots(&self) -> Vec<(Position, Occupant)> {
        let mut slots = Vec::new();
        for (i, cell) in self.cells.iter().enumerate() {
            for kind in [EntityKind::Agent, EntityKind::Food] {
                if let Some(id) = cell.slot(kind) {
                    slots.push((self.position_of(i), Occupant { id, kind }));
                }
            }
        }
        slots
    }

    /// Number of held slots of `kind`
    pub fn count(&self, kind: EntityKind) -> usize {
        self.cells.iter().filter(|c| c.slot(kind).is_some()).count()
    }

    /// Number of cells of `cell_type`
    pub fn count_type(&self, cell_type: CellType) -> usize {
        self.cells.iter().filter(|c| c.cell_type == cell_type).count()
    }

    #[inline]
    fn position_of(&self, index: usize) -> Position {
        Position::new((index % self.width) as i32, (index / self.width) as i32)
    }
}

/// Linear depth gradient from `surface_depth` (row 0) to `max_depth` (last row)
pub fn depth_at_row(config: &WorldConfig, row: usize) -> f32 {
    let ratio = if config.height > 1 {
        row as f32 / (config.height - 1) as f32
    } else {
        0.0
    };
    config.surface_depth + (config.max_depth - config.surface_depth) * ratio
}

fn classify(config: &WorldConfig, row: usize, depth: f32) -> CellType {
    let bottom_row = row + config.seafloor_rows >= config.height;
    let below_threshold = config.seafloor_depth.is_some_and(|limit| depth >= limit);
    if bottom_row || below_threshold {
        CellType::SeaFloor
    } else {
        CellType::OpenWater
    }
}
