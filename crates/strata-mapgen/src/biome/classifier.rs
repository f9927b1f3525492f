//! Nearest-point biome classification over heat and humidity.

use super::{Biome, BiomeId};

/// Picks the biome whose `(heat_point, humidity_point)` is closest to a column's
/// climate, among biomes whose height range contains the column's surface.
#[derive(Clone, Debug)]
pub struct BiomeClassifier {
    biomes: Vec<Biome>,
    default: BiomeId,
    fallback: Biome,
}

impl BiomeClassifier {
    /// Creates a classifier over resolved biomes, in registration order.
    ///
    /// The first biome becomes the default; with no biomes, the built-in fallback is used.
    pub fn new(biomes: Vec<Biome>) -> Self {
        let default = biomes.first().map_or(BiomeId::NONE, |b| b.id);
        Self {
            biomes,
            default,
            fallback: Biome::fallback(),
        }
    }

    /// Overrides the default biome. Ignored if `id` is not among the usable biomes.
    pub fn set_default(&mut self, id: BiomeId) {
        if self.biomes.iter().any(|b| b.id == id) {
            self.default = id;
        } else {
            tracing::warn!("default biome {id:?} is not usable; keeping {:?}", self.default);
        }
    }

    /// The biome used when no biome matches.
    pub fn default_biome(&self) -> BiomeId {
        self.default
    }

    /// Number of usable biomes.
    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    /// Returns `true` if only the fallback biome is available.
    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Returns the closest biome for the given climate and height.
    ///
    /// Ties keep the earliest registered biome.
    pub fn classify(&self, heat: f64, humidity: f64, y: i32) -> BiomeId {
        let mut best = None;
        let mut best_dist = f64::INFINITY;
        for biome in self.biomes.iter().filter(|b| b.contains_height(y)) {
            let dh = heat - biome.heat_point;
            let dm = humidity - biome.humidity_point;
            let dist = dh * dh + dm * dm;
            if dist < best_dist {
                best_dist = dist;
                best = Some(biome.id);
            }
        }
        best.unwrap_or(self.default)
    }

    /// Returns the resolved biome for `id`; unknown ids map to the fallback biome.
    pub fn get(&self, id: BiomeId) -> &Biome {
        // Ids ascend in registration order.
        match self.biomes.binary_search_by_key(&id, |b| b.id) {
            Ok(i) => &self.biomes[i],
            Err(_) => &self.fallback,
        }
    }

    /// Iterates usable biomes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Biome> {
        self.biomes.iter()
    }
}
