//! World-wide generation parameters.

use std::fmt;

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::noise::NoiseParams;

/// Errors from changing generation parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("unknown noise parameter set '{0}'")]
    UnknownNoise(String),
    #[error("unknown mapgen flag '{0}'")]
    UnknownFlag(String),
    #[error("chunksize must be between 1 and {max}, got {value}")]
    InvalidChunksize { value: i32, max: i32 },
}

/// Passes that can be switched off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapgenFlags {
    /// Default trees and grass.
    pub trees: bool,
    pub caves: bool,
    pub ores: bool,
    pub decorations: bool,
    /// Biome dust on top of the finished surface.
    pub dust: bool,
}

impl Default for MapgenFlags {
    fn default() -> Self {
        Self {
            trees: true,
            caves: true,
            ores: true,
            decorations: true,
            dust: true,
        }
    }
}

impl MapgenFlags {
    const NAMES: [&'static str; 5] = ["trees", "caves", "ores", "decorations", "dust"];

    fn slot(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "trees" => Some(&mut self.trees),
            "caves" => Some(&mut self.caves),
            "ores" => Some(&mut self.ores),
            "decorations" => Some(&mut self.decorations),
            "dust" => Some(&mut self.dust),
            _ => None,
        }
    }

    fn get(&self, name: &str) -> bool {
        match name {
            "trees" => self.trees,
            "caves" => self.caves,
            "ores" => self.ores,
            "decorations" => self.decorations,
            _ => self.dust,
        }
    }

    /// Applies a flag string such as `"trees, nocaves"`.
    ///
    /// Listed flags are set, flags prefixed with `no` are cleared, and unlisted flags keep
    /// their value. Nothing changes if any entry is unknown.
    pub fn apply(&mut self, s: &str) -> Result<(), ParamsError> {
        let mut next = *self;
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = match entry.strip_prefix("no") {
                Some(rest) if Self::NAMES.contains(&rest) => (rest, false),
                _ => (entry, true),
            };
            let slot = next
                .slot(name)
                .ok_or_else(|| ParamsError::UnknownFlag(entry.to_string()))?;
            *slot = value;
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for MapgenFlags {
    /// Writes every flag, e.g. `trees, nocaves, ores, decorations, dust`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in Self::NAMES.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if !self.get(name) {
                f.write_str("no")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Cave carving thresholds. The noise itself is [`MapgenParams::np_cave`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaveConfig {
    /// Normalized noise above which a cell is carved, before depth fading.
    pub threshold: f64,
    /// No carving within this many nodes below the surface.
    pub min_depth: i32,
    /// No carving deeper than this below the surface.
    pub max_depth: i32,
    /// Underwater columns keep this many nodes of solid ground below the water level.
    pub ocean_floor_buffer: i32,
}

impl Default for CaveConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            min_depth: 5,
            max_depth: 200,
            ocean_floor_buffer: 10,
        }
    }
}

/// Parameters shared by every chunk of a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapgenParams {
    pub seed: u64,
    pub water_level: i32,
    /// Chunk side length in map blocks.
    pub chunksize: i32,
    pub flags: MapgenFlags,
    /// Biome noise above which the beach band turns into desert sand.
    pub freq_desert: f64,
    /// Beach noise above which the beach band turns into sand.
    pub freq_beach: f64,
    pub np_terrain_base: NoiseParams,
    pub np_terrain_higher: NoiseParams,
    pub np_steepness: NoiseParams,
    pub np_height_select: NoiseParams,
    pub np_mud: NoiseParams,
    pub np_beach: NoiseParams,
    pub np_biome: NoiseParams,
    pub np_cave: NoiseParams,
    pub np_trees: NoiseParams,
    pub np_apple_trees: NoiseParams,
    pub np_heat: NoiseParams,
    pub np_humidity: NoiseParams,
    pub cave: CaveConfig,
}

impl Default for MapgenParams {
    fn default() -> Self {
        Self {
            seed: 0,
            water_level: 1,
            chunksize: 5,
            flags: MapgenFlags::default(),
            freq_desert: 0.45,
            freq_beach: 0.15,
            np_terrain_base: NoiseParams::new(-4.0, 20.0, DVec3::splat(250.0), 82341, 5, 0.6),
            np_terrain_higher: NoiseParams::new(20.0, 16.0, DVec3::splat(500.0), 85039, 5, 0.6),
            np_steepness: NoiseParams::new(0.85, 0.5, DVec3::splat(125.0), -932, 5, 0.7),
            np_height_select: NoiseParams::new(0.5, 1.0, DVec3::splat(250.0), 4213, 5, 0.69),
            np_mud: NoiseParams::new(4.0, 2.0, DVec3::splat(200.0), 91013, 3, 0.55),
            np_beach: NoiseParams::new(0.0, 1.0, DVec3::splat(250.0), 59420, 3, 0.5),
            np_biome: NoiseParams::new(0.0, 1.0, DVec3::splat(250.0), 9130, 3, 0.5),
            np_cave: NoiseParams::new(0.0, 1.0, DVec3::new(40.0, 20.0, 40.0), 34329, 3, 0.5),
            np_trees: NoiseParams::new(0.0, 1.0, DVec3::splat(125.0), 2, 4, 0.66),
            np_apple_trees: NoiseParams::new(0.0, 1.0, DVec3::splat(100.0), 342902, 3, 0.45),
            np_heat: NoiseParams::new(25.0, 50.0, DVec3::splat(500.0), 35293, 1, 0.0),
            np_humidity: NoiseParams::new(50.0, 31.25, DVec3::splat(750.0), 12094, 2, 0.6),
            cave: CaveConfig::default(),
        }
    }
}

impl MapgenParams {
    /// Largest accepted chunk size, in map blocks.
    pub const MAX_CHUNKSIZE: i32 = 10;

    /// Checks values that would make chunk layout meaningless.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(1..=Self::MAX_CHUNKSIZE).contains(&self.chunksize) {
            return Err(ParamsError::InvalidChunksize {
                value: self.chunksize,
                max: Self::MAX_CHUNKSIZE,
            });
        }
        Ok(())
    }

    fn noise_slot(&mut self, name: &str) -> Option<&mut NoiseParams> {
        let name = name.strip_prefix("np_").unwrap_or(name);
        Some(match name {
            "terrain_base" => &mut self.np_terrain_base,
            "terrain_higher" => &mut self.np_terrain_higher,
            "steepness" => &mut self.np_steepness,
            "height_select" => &mut self.np_height_select,
            "mud" => &mut self.np_mud,
            "beach" => &mut self.np_beach,
            "biome" => &mut self.np_biome,
            "cave" => &mut self.np_cave,
            "trees" => &mut self.np_trees,
            "apple_trees" => &mut self.np_apple_trees,
            "heat" => &mut self.np_heat,
            "humidity" => &mut self.np_humidity,
            _ => return None,
        })
    }

    /// Returns a named noise parameter set (`"mud"` or `"np_mud"`).
    pub fn noise_params(&self, name: &str) -> Option<&NoiseParams> {
        let name = name.strip_prefix("np_").unwrap_or(name);
        Some(match name {
            "terrain_base" => &self.np_terrain_base,
            "terrain_higher" => &self.np_terrain_higher,
            "steepness" => &self.np_steepness,
            "height_select" => &self.np_height_select,
            "mud" => &self.np_mud,
            "beach" => &self.np_beach,
            "biome" => &self.np_biome,
            "cave" => &self.np_cave,
            "trees" => &self.np_trees,
            "apple_trees" => &self.np_apple_trees,
            "heat" => &self.np_heat,
            "humidity" => &self.np_humidity,
            _ => return None,
        })
    }

    /// Replaces a named noise parameter set.
    pub fn set_noise_params(&mut self, name: &str, np: NoiseParams) -> Result<(), ParamsError> {
        let slot = self
            .noise_slot(name)
            .ok_or_else(|| ParamsError::UnknownNoise(name.to_string()))?;
        *slot = np;
        Ok(())
    }

    /// Block range `(min, max)` of the chunk containing `blockpos`.
    ///
    /// Chunks are `chunksize` blocks wide and offset so that one chunk is centred on the
    /// origin block.
    pub fn chunk_containing(&self, blockpos: IVec3) -> (IVec3, IVec3) {
        let size = self.chunksize.max(1);
        let offset = IVec3::splat(-(size / 2));
        let min = (blockpos - offset).div_euclid(IVec3::splat(size)) * size + offset;
        (min, min + IVec3::splat(size - 1))
    }
}
