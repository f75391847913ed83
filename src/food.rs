//! Food pellets and the food store.

use crate::error::SpawnError;
use crate::geometry::Position;
use crate::grid::{EntityKind, Grid};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique pellet identifier, never reused within a run
pub type FoodId = u64;

/// A consumable pellet occupying the food slot of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPellet {
    pub id: FoodId,
    pub position: Position,
    pub energy_value: f32,
    pub age_ticks: u64,
}

impl FoodPellet {
    /// Whether the pellet has outlived `lifespan`
    #[inline]
    pub fn is_expired(&self, lifespan: Option<u64>) -> bool {
        lifespan.is_some_and(|limit| self.age_ticks >= limit)
    }
}

/// Live pellets keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodStore {
    pellets: BTreeMap<FoodId, FoodPellet>,
    next_id: FoodId,
}

impl FoodStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a pellet on an empty cell. Fails without side effects.
    pub fn spawn(
        &mut self,
        grid: &mut Grid,
        position: Position,
        energy_value: f32,
    ) -> Result<FoodId, SpawnError> {
        match grid.is_occupied(position.x, position.y) {
            None => return Err(SpawnError::OutOfBounds),
            Some(true) => return Err(SpawnError::CellOccupied),
            Some(false) => {}
        }

        let id = self.next_id;
        if !grid.try_occupy(position.x, position.y, id, EntityKind::Food) {
            return Err(SpawnError::CellOccupied);
        }
        self.next_id += 1;
        self.pellets.insert(
            id,
            FoodPellet {
                id,
                position,
                energy_value,
                age_ticks: 0,
            },
        );
        Ok(id)
    }

    /// Spawn up to `count` pellets on empty open-water cells chosen
    /// uniformly at random. Spawns fewer when fewer cells are free.
    pub fn spawn_random<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        rng: &mut R,
        count: usize,
        energy_value: f32,
    ) -> Vec<FoodId> {
        if count == 0 {
            return Vec::new();
        }
        let candidates = grid.free_open_water();
        let chosen: Vec<Position> = candidates.choose_multiple(rng, count).copied().collect();

        chosen
            .into_iter()
            .filter_map(|pos| self.spawn(grid, pos, energy_value).ok())
            .collect()
    }

    /// Eat whatever pellet sits at `position`: remove it, release its
    /// slot and return its energy value. `None` when there is nothing.
    pub fn consume_at(&mut self, grid: &mut Grid, position: Position) -> Option<f32> {
        let id = grid.occupant(position.x, position.y, EntityKind::Food)?;
        grid.vacate(position.x, position.y, EntityKind::Food);
        match self.pellets.remove(&id) {
            Some(pellet) => Some(pellet.energy_value),
            None => {
                log::error!("food slot at {} held unknown pellet {}", position, id);
                None
            }
        }
    }

    /// Age every pellet by one tick and remove those past `lifespan`.
    /// Returns the removed pellets.
    pub fn age_and_expire(&mut self, grid: &mut Grid, lifespan: Option<u64>) -> Vec<FoodPellet> {
        for pellet in self.pellets.values_mut() {
            pellet.age_ticks += 1;
        }

        let expired: Vec<FoodId> = self
            .pellets
            .values()
            .filter(|p| p.is_expired(lifespan))
            .map(|p| p.id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| {
                let pellet = self.pellets.remove(&id)?;
                let Position { x, y } = pellet.position;
                if grid.occupant(x, y, EntityKind::Food) == Some(id) {
                    grid.vacate(x, y, EntityKind::Food);
                }
                Some(pellet)
            })
            .collect()
    }

    /// Pellet at `position`, if any
    pub fn at(&self, grid: &Grid, position: Position) -> Option<&FoodPellet> {
        grid.occupant(position.x, position.y, EntityKind::Food)
            .and_then(|id| self.pellets.get(&id))
    }

    #[inline]
    pub fn get(&self, id: FoodId) -> Option<&FoodPellet> {
        self.pellets.get(&id)
    }

    /// Drop the record without touching the grid
    pub fn remove(&mut self, id: FoodId) -> Option<FoodPellet> {
        self.pellets.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FoodPellet> {
        self.pellets.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pellets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pellets.is_empty()
    }

    #[inline]
    pub fn next_id(&self) -> FoodId {
        self.next_id
    }
}
