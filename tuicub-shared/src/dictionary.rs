//! The catalog of every legal tileset, and joker-aware validity and scoring.
//!
//! A legal tileset is either a group (3 or 4 tiles of equal value, all
//! distinct colors) or a run (3 or more consecutive values in one color).
//! The catalog enumerates legal sets as exact id sets, so both copies of a
//! tile produce their own entries and membership can be checked on canonical
//! sorted ids alone. Jokers are handled by searching the catalog for an
//! entry the non-joker remainder fits into.

use crate::tile::{Color, Tile, Tileset};
use lazy_static::lazy_static;
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use strum::IntoEnumIterator;

/// Bound for each of the two memo caches.
const CACHE_CAPACITY: usize = 10_000;

lazy_static! {
    /// The process-wide dictionary instance.
    pub static ref DICTIONARY: TilesetDictionary = TilesetDictionary::new(build_catalog());
}

/// Validity and value lookups over the legal-tileset catalog, memoized.
pub struct TilesetDictionary {
    catalog: HashSet<Vec<u8>>,
    validity_cache: Mutex<LruCache<Tileset, bool>>,
    value_cache: Mutex<LruCache<Tileset, u32>>,
}

impl TilesetDictionary {
    pub fn new(catalog: HashSet<Vec<u8>>) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap();
        Self {
            catalog,
            validity_cache: Mutex::new(LruCache::new(capacity)),
            value_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Whether the tileset is a legal group or run, treating jokers as
    /// wildcards.
    pub fn is_valid(&self, tileset: &Tileset) -> bool {
        if let Some(&cached) = self.validity_cache.lock().unwrap().get(tileset) {
            return cached;
        }

        let result = self.compute_validity(tileset);
        self.validity_cache
            .lock()
            .unwrap()
            .put(tileset.clone(), result);
        result
    }

    /// The value of the tileset for the opening-meld rule.
    ///
    /// Invalid tilesets are worth 0. With jokers, the value is the largest
    /// value among all catalog entries the non-joker tiles fit into.
    pub fn value_of(&self, tileset: &Tileset) -> u32 {
        if let Some(&cached) = self.value_cache.lock().unwrap().get(tileset) {
            return cached;
        }

        if !self.is_valid(tileset) {
            return 0;
        }

        let result = self.compute_value(tileset);
        self.value_cache
            .lock()
            .unwrap()
            .put(tileset.clone(), result);
        result
    }

    fn compute_validity(&self, tileset: &Tileset) -> bool {
        if !tileset.contains_jokers() {
            let ids: Vec<u8> = tileset.tiles().iter().map(|tile| tile.id()).collect();
            return self.catalog.contains(&ids);
        }

        let remainder = tileset.without_jokers();
        let jokers = tileset.jokers_count();
        let has_match = self.matching_entries(&remainder, jokers).next().is_some();
        has_match
    }

    fn compute_value(&self, tileset: &Tileset) -> u32 {
        if !tileset.contains_jokers() {
            return tile_sum(tileset.tiles());
        }

        let remainder = tileset.without_jokers();
        let jokers = tileset.jokers_count();
        self.matching_entries(&remainder, jokers)
            .map(|entry| entry.iter().map(|&id| (id % 13) as u32 + 1).sum())
            .max()
            .unwrap_or(0)
    }

    /// Catalog entries of size `|remainder| + jokers` that contain every
    /// remainder tile.
    fn matching_entries<'a>(
        &'a self,
        remainder: &'a [Tile],
        jokers: usize,
    ) -> impl Iterator<Item = &'a Vec<u8>> + 'a {
        let wanted_len = remainder.len() + jokers;
        self.catalog.iter().filter(move |entry| {
            entry.len() == wanted_len
                && remainder
                    .iter()
                    .all(|tile| entry.contains(&tile.id()))
        })
    }
}

/// Sum of face values over a slice of tiles.
fn tile_sum(tiles: &[Tile]) -> u32 {
    tiles.iter().map(|tile| tile.face_value()).sum()
}

/// Builds the full catalog of legal joker-free tilesets.
///
/// Every entry is a canonically sorted id list. For each shape (a run of
/// values in one color, or a group of one value across colors) every
/// combination of copies is enumerated, since the two copies of a tile have
/// distinct ids.
fn build_catalog() -> HashSet<Vec<u8>> {
    let mut catalog = HashSet::new();

    // Runs: 3..=13 consecutive values in one color.
    for color in Color::iter() {
        for len in 3..=13u8 {
            for start in 1..=(14 - len) {
                let values: Vec<u8> = (start..start + len).collect();
                push_copy_combinations(&mut catalog, &values, |value, copy| {
                    color.tile(value, copy)
                });
            }
        }
    }

    // Groups: 3 or 4 distinct colors sharing one value.
    let colors: Vec<Color> = Color::iter().collect();
    for value in 1..=13u8 {
        for skipped in 0..colors.len() {
            let trio: Vec<Color> = colors
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != skipped)
                .map(|(_, &color)| color)
                .collect();
            push_copy_combinations(&mut catalog, &trio, |color, copy| {
                color.tile(value, copy)
            });
        }
        push_copy_combinations(&mut catalog, &colors, |color, copy| {
            color.tile(value, copy)
        });
    }

    tracing::debug!(entries = catalog.len(), "Built the legal-tileset catalog");
    catalog
}

/// Adds one entry per copy assignment over the members of a shape.
fn push_copy_combinations<T: Copy>(
    catalog: &mut HashSet<Vec<u8>>,
    members: &[T],
    tile_for: impl Fn(T, u8) -> Tile,
) {
    for mask in 0..(1u32 << members.len()) {
        let mut ids: Vec<u8> = members
            .iter()
            .enumerate()
            .map(|(index, &member)| tile_for(member, ((mask >> index) & 1) as u8).id())
            .collect();
        ids.sort_unstable();
        catalog.insert(ids);
    }
}
