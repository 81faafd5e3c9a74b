//! The tile, tileset and board primitives that every other part of the game
//! is built on.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::EnumIter;
use thiserror::Error;

/// Number of tiles in a full deck: two copies of 4 colors x 13 values, plus
/// two jokers.
pub const DECK_SIZE: usize = 106;

/// Number of tiles in one copy of the deck. Ids at or above this value (other
/// than the jokers) are the second copy of the tile `id - COPY_SIZE`.
pub const COPY_SIZE: u8 = 52;

/// The id of the first of the two jokers.
pub const FIRST_JOKER: Tile = Tile(104);

/// The id of the second of the two jokers.
pub const SECOND_JOKER: Tile = Tile(105);

/// A single tile, identified by an integer id in `[0, 105]`.
///
/// Ids `0..=103` encode regular tiles: the copy is `id / 52`, the color is
/// `(id % 52) / 13`, and the face value is `id % 13 + 1`. Ids `104` and `105`
/// are the jokers. The id is the identity of the tile: two tiles with the
/// same color and value but different copies are different tiles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tile(u8);

impl Tile {
    /// Creates a tile from a raw id, validating the `[0, 105]` range.
    pub fn new(id: u8) -> Result<Self, InvalidTileError> {
        if id as usize >= DECK_SIZE {
            return Err(InvalidTileError(id));
        }
        Ok(Tile(id))
    }

    pub const fn id(self) -> u8 {
        self.0
    }

    pub fn is_joker(self) -> bool {
        self == FIRST_JOKER || self == SECOND_JOKER
    }

    /// The color of the tile. Jokers have no color.
    pub fn color(self) -> Option<Color> {
        if self.is_joker() {
            return None;
        }
        Some(match (self.0 % COPY_SIZE) / 13 {
            0 => Color::Red,
            1 => Color::Yellow,
            2 => Color::Black,
            _ => Color::Blue,
        })
    }

    /// The face value of the tile, `1..=13`.
    ///
    /// Only meaningful for regular tiles; the score a joker contributes is
    /// decided by the tileset it stands in for, never by this value.
    pub fn face_value(self) -> u32 {
        (self.0 % 13) as u32 + 1
    }

    /// The key used to order tiles for presentation.
    ///
    /// Second-copy tiles sort next to their first-copy twin so that clients
    /// render the two copies of each `(color, value)` adjacently. The id
    /// itself is untouched; only the ordering changes.
    pub fn presentation_key(self) -> u8 {
        if self.0 < COPY_SIZE || self.is_joker() {
            self.0
        } else {
            self.0 - COPY_SIZE
        }
    }
}

/// The four tile colors, in id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum Color {
    Red,
    Yellow,
    Black,
    Blue,
}

impl Color {
    /// The id of the tile with this color and face value, in the given copy
    /// of the deck.
    pub fn tile(self, value: u8, copy: u8) -> Tile {
        debug_assert!((1..=13).contains(&value));
        debug_assert!(copy < 2);
        Tile(copy * COPY_SIZE + self as u8 * 13 + (value - 1))
    }
}

lazy_static! {
    /// All 106 tile ids of a full deck, in id order.
    pub static ref FULL_DECK: Vec<Tile> = (0..DECK_SIZE as u8).map(Tile).collect();
}

/// A set of tiles, stored as a sorted tuple of ids.
///
/// Equality and hashing are by tuple value, so two tilesets built from the
/// same tiles in any order compare equal. Serializes as a plain JSON array of
/// ids in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tileset {
    tiles: Vec<Tile>,
}

impl Tileset {
    /// Creates a new tileset, sorting the tiles into canonical order.
    pub fn new(tiles: impl IntoIterator<Item = Tile>) -> Self {
        let mut tiles: Vec<Tile> = tiles.into_iter().collect();
        tiles.sort_unstable();
        Self { tiles }
    }

    /// The tile ids in this set, in canonical order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.tiles.binary_search(&tile).is_ok()
    }

    pub fn contains_jokers(&self) -> bool {
        self.tiles.iter().any(|tile| tile.is_joker())
    }

    pub fn jokers_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_joker()).count()
    }

    /// The tiles in this set without the jokers.
    pub fn without_jokers(&self) -> Vec<Tile> {
        self.tiles
            .iter()
            .copied()
            .filter(|tile| !tile.is_joker())
            .collect()
    }

    /// Returns a copy of the set with one tile added.
    pub fn with_new_tile(&self, tile: Tile) -> Tileset {
        Tileset::new(self.tiles.iter().copied().chain([tile]))
    }

    /// The tile ids reordered for presentation, second copies next to their
    /// first-copy twins. See [`Tile::presentation_key`].
    pub fn presentation_order(&self) -> Vec<Tile> {
        presentation_order(&self.tiles)
    }
}

impl FromIterator<Tile> for Tileset {
    fn from_iter<T: IntoIterator<Item = Tile>>(iter: T) -> Self {
        Tileset::new(iter)
    }
}

/// The sets of tiles that have been played, in the order clients render them.
///
/// The order of tilesets on a board carries no meaning for rule checks, but
/// it is preserved on the wire so that clients keep a stable layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    tilesets: Vec<Tileset>,
}

impl Board {
    pub fn new(tilesets: Vec<Tileset>) -> Self {
        Self { tilesets }
    }

    /// Builds a board from raw lists of tile ids, validating every id.
    pub fn from_ids(tilesets: &[Vec<u8>]) -> Result<Self, InvalidTileError> {
        let tilesets = tilesets
            .iter()
            .map(|tiles| {
                tiles
                    .iter()
                    .map(|&id| Tile::new(id))
                    .collect::<Result<Tileset, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tilesets })
    }

    pub fn tilesets(&self) -> &[Tileset] {
        &self.tilesets
    }

    /// All tiles present on the board, flattened.
    pub fn all_tiles(&self) -> Vec<Tile> {
        self.tilesets
            .iter()
            .flat_map(|tileset| tileset.tiles().iter().copied())
            .collect()
    }

    /// All tiles present on the board, as a set of ids.
    pub fn tile_set(&self) -> HashSet<Tile> {
        self.all_tiles().into_iter().collect()
    }

    /// The board as raw lists of tile ids.
    pub fn as_ids(&self) -> Vec<Vec<u8>> {
        self.tilesets
            .iter()
            .map(|tileset| tileset.tiles().iter().map(|tile| tile.id()).collect())
            .collect()
    }
}

/// Reorders tiles by their presentation key, keeping ids intact.
pub fn presentation_order(tiles: &[Tile]) -> Vec<Tile> {
    let mut tiles: Vec<Tile> = tiles.to_vec();
    tiles.sort_by_key(|tile| tile.presentation_key());
    tiles
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("Tile id {0} is outside the valid range 0..=105")]
pub struct InvalidTileError(pub u8);
