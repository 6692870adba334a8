//! Static generation table
//!
//! Nine generations whose id ranges partition `1..=1025`.

use crate::error::{CatalogError, Result};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Highest national dex id served by the catalog
pub const MAX_POKEMON_ID: u32 = 1025;

/// One game generation and its national dex id range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Generation {
    /// Generation number, 1-9
    pub id: u32,
    /// Display name, such as `Gen 1`
    pub name: &'static str,
    /// Region introduced by the generation
    pub region: &'static str,
    /// First national dex id in this generation
    pub start: u32,
    /// Number of Pokemon introduced
    pub count: u32,
}

impl Generation {
    const fn new(
        id: u32,
        name: &'static str,
        region: &'static str,
        start: u32,
        count: u32,
    ) -> Self {
        Self {
            id,
            name,
            region,
            start,
            count,
        }
    }

    /// Last id in the generation, inclusive
    pub const fn end(&self) -> u32 {
        self.start + self.count - 1
    }

    /// Every id in the generation
    pub const fn ids(&self) -> RangeInclusive<u32> {
        self.start..=self.end()
    }

    /// Whether `id` falls inside the generation
    pub const fn contains(&self, id: u32) -> bool {
        id >= self.start && id <= self.end()
    }
}

/// All generations in order
pub static GENERATIONS: [Generation; 9] = [
    Generation::new(1, "Gen 1", "Kanto", 1, 151),
    Generation::new(2, "Gen 2", "Johto", 152, 100),
    Generation::new(3, "Gen 3", "Hoenn", 252, 135),
    Generation::new(4, "Gen 4", "Sinnoh", 387, 107),
    Generation::new(5, "Gen 5", "Unova", 494, 156),
    Generation::new(6, "Gen 6", "Kalos", 650, 72),
    Generation::new(7, "Gen 7", "Alola", 722, 88),
    Generation::new(8, "Gen 8", "Galar", 810, 96),
    Generation::new(9, "Gen 9", "Paldea", 906, 120),
];

/// Look up a generation by number
pub fn generation(id: u32) -> Result<&'static Generation> {
    GENERATIONS
        .iter()
        .find(|g| g.id == id)
        .ok_or(CatalogError::InvalidGeneration(id))
}

/// Id range for an optional generation filter
pub fn id_range(generation_id: Option<u32>) -> Result<RangeInclusive<u32>> {
    match generation_id {
        None => Ok(1..=MAX_POKEMON_ID),
        Some(id) => generation(id).map(Generation::ids),
    }
}

/// Generation an id belongs to
pub fn generation_of(pokemon_id: u32) -> Option<&'static Generation> {
    GENERATIONS.iter().find(|g| g.contains(pokemon_id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generations_partition_national_dex() {
        let mut expected_start = 1;
        for generation in &GENERATIONS {
            let name = generation.name;
            assert_eq!(generation.start, expected_start, "gap before {name}");
            expected_start = generation.end() + 1;
        }
        assert_eq!(expected_start - 1, MAX_POKEMON_ID);
    }

    #[test]
    fn test_lookup() {
        let kanto = generation(1).unwrap();
        assert_eq!(kanto.ids(), 1..=151);
        assert_eq!(generation(9).map(|g| g.end()), Ok(1025));
        assert_eq!(generation(0), Err(CatalogError::InvalidGeneration(0)));
        assert_eq!(generation(10), Err(CatalogError::InvalidGeneration(10)));
    }

    #[test]
    fn test_id_range() {
        assert_eq!(id_range(None), Ok(1..=1025));
        assert_eq!(id_range(Some(4)), Ok(387..=493));
        assert!(id_range(Some(42)).is_err());
    }

    #[test]
    fn test_generation_of() {
        assert_eq!(generation_of(151).map(|g| g.region), Some("Kanto"));
        assert_eq!(generation_of(152).map(|g| g.region), Some("Johto"));
        assert_eq!(generation_of(1025).map(|g| g.id), Some(9));
        assert_eq!(generation_of(0), None);
        assert_eq!(generation_of(1026), None);
    }
}
