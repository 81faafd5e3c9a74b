//! The shuffled pile of undealt tiles that players draw from.

use crate::error::Error;
use crate::rng::GameRng;
use crate::tile::{Tile, Tileset};
use serde::{Deserialize, Serialize};

/// The number of tiles dealt into a fresh rack.
pub const RACK_SIZE: usize = 14;

/// The pile of tiles that players can draw from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pile {
    tiles: Vec<Tile>,
}

impl Pile {
    pub fn new(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Draws one tile uniformly at random, removing it from the pile.
    pub fn draw(&mut self, rng: &mut GameRng) -> Result<Tile, Error> {
        let tile = rng.pick(&self.tiles)?;
        self.tiles.retain(|&candidate| candidate != tile);
        Ok(tile)
    }

    /// Draws a full starting rack of [`RACK_SIZE`] random tiles.
    pub fn draw_rack(&mut self, rng: &mut GameRng) -> Result<Tileset, Error> {
        let mut tiles = Vec::with_capacity(RACK_SIZE);
        for _ in 0..RACK_SIZE {
            tiles.push(self.draw(rng)?);
        }
        Ok(Tileset::new(tiles))
    }

    /// Puts the tiles from a rack back on the pile, reshuffling everything.
    pub fn return_rack(&mut self, rack: &Tileset, rng: &mut GameRng) {
        let mut tiles = self.tiles.clone();
        tiles.extend_from_slice(rack.tiles());
        self.tiles = rng.shuffle(&tiles);
    }
}
