//! Seeded multi-octave coherent noise.
//!
//! [`NoiseParams`] fully describe a fractal Perlin field. A [`NoiseSampler`] binds
//! them to a world seed for point queries, and a [`NoiseField`] evaluates a whole
//! 2D or 3D lattice into a dense cached array.

use glam::{DVec3, IVec2, IVec3};
use ::noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Parameters of a fractal noise field.
///
/// Output is `offset + scale * Σ perlin(p * lacunarity^i / spread) * persistence^i`
/// over `octaves` layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Constant added to the scaled sum.
    pub offset: f64,
    /// Multiplier applied to the octave sum.
    pub scale: f64,
    /// Period of the first octave along each axis, in nodes. 2D fields use `x` and `z`.
    pub spread: DVec3,
    /// Per-field seed, mixed with the world seed.
    pub seed: i32,
    /// Number of octaves. Zero yields a constant field equal to `offset`.
    pub octaves: u32,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
}

impl NoiseParams {
    /// Creates parameters with the default lacunarity of 2.
    pub const fn new(
        offset: f64,
        scale: f64,
        spread: DVec3,
        seed: i32,
        octaves: u32,
        persistence: f64,
    ) -> Self {
        Self {
            offset,
            scale,
            spread,
            seed,
            octaves,
            persistence,
            lacunarity: 2.0,
        }
    }

    /// Theoretical bound of `|value - offset|`.
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = 1.0;
        for _ in 0..self.octaves {
            sum += amp;
            amp *= self.persistence;
        }
        sum * self.scale.abs()
    }
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self::new(0.0, 1.0, DVec3::splat(250.0), 0, 3, 0.5)
    }
}

/// Seed of one octave's gradient table.
fn octave_seed(world_seed: u64, field_seed: i32, octave: u32) -> u32 {
    let folded = (world_seed as u32) ^ ((world_seed >> 32) as u32);
    folded
        .wrapping_add(field_seed as u32)
        .wrapping_add(octave.wrapping_mul(0x9E37_79B9))
}

/// [`NoiseParams`] bound to a world seed, evaluated one point at a time.
#[derive(Clone, Debug)]
pub struct NoiseSampler {
    params: NoiseParams,
    octaves: Vec<Perlin>,
}

impl NoiseSampler {
    /// Builds one gradient source per octave.
    pub fn new(params: NoiseParams, world_seed: u64) -> Self {
        let octaves = (0..params.octaves)
            .map(|i| Perlin::new(octave_seed(world_seed, params.seed, i)))
            .collect();
        Self { params, octaves }
    }

    /// The parameters this sampler evaluates.
    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Samples the 2D field at horizontal position `(x, z)`.
    pub fn sample_2d(&self, x: f64, z: f64) -> f64 {
        let p = &self.params;
        let (mut freq, mut amp, mut sum) = (1.0, 1.0, 0.0);
        for source in &self.octaves {
            sum += source.get([x / p.spread.x * freq, z / p.spread.z * freq]) * amp;
            freq *= p.lacunarity;
            amp *= p.persistence;
        }
        p.offset + p.scale * sum
    }

    /// Samples the 3D field at `pos`.
    pub fn sample_3d(&self, pos: DVec3) -> f64 {
        let p = &self.params;
        let (mut freq, mut amp, mut sum) = (1.0, 1.0, 0.0);
        for source in &self.octaves {
            let scaled = pos / p.spread * freq;
            sum += source.get([scaled.x, scaled.y, scaled.z]) * amp;
            freq *= p.lacunarity;
            amp *= p.persistence;
        }
        p.offset + p.scale * sum
    }
}

/// A noise lattice evaluated into a dense array.
///
/// 2D results are indexed `x + z * size.x`; 3D results `x + y * size.x + z * size.x * size.y`.
/// The array is overwritten by every `evaluate_*` call.
#[derive(Clone, Debug)]
pub struct NoiseField {
    sampler: NoiseSampler,
    result: Vec<f64>,
}

impl NoiseField {
    /// Creates an empty field for the given parameters and world seed.
    pub fn new(params: NoiseParams, world_seed: u64) -> Self {
        Self::from_sampler(NoiseSampler::new(params, world_seed))
    }

    /// Creates an empty field reusing an existing sampler.
    pub fn from_sampler(sampler: NoiseSampler) -> Self {
        Self {
            sampler,
            result: Vec::new(),
        }
    }

    /// Evaluates a horizontal lattice of `size.x * size.y` points (the second
    /// component is the Z axis) starting at `origin` and spaced `step` nodes apart.
    pub fn evaluate_2d(&mut self, origin: IVec2, size: IVec2, step: f64) -> &[f64] {
        self.result.clear();
        self.result.reserve(size.x.max(0) as usize * size.y.max(0) as usize);
        for z in 0..size.y {
            for x in 0..size.x {
                let px = origin.x as f64 + x as f64 * step;
                let pz = origin.y as f64 + z as f64 * step;
                self.result.push(self.sampler.sample_2d(px, pz));
            }
        }
        &self.result
    }

    /// Evaluates a 3D lattice of `size` points starting at `origin`, spaced `step` nodes apart.
    pub fn evaluate_3d(&mut self, origin: IVec3, size: IVec3, step: f64) -> &[f64] {
        self.result.clear();
        self.result
            .reserve(size.x.max(0) as usize * size.y.max(0) as usize * size.z.max(0) as usize);
        let base = origin.as_dvec3();
        for z in 0..size.z {
            for y in 0..size.y {
                for x in 0..size.x {
                    let offset = DVec3::new(x as f64, y as f64, z as f64) * step;
                    self.result.push(self.sampler.sample_3d(base + offset));
                }
            }
        }
        &self.result
    }

    /// The most recently evaluated values.
    pub fn result(&self) -> &[f64] {
        &self.result
    }

    /// The sampler backing this field.
    pub fn sampler(&self) -> &NoiseSampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain_like() -> NoiseParams {
        NoiseParams::new(-4.0, 20.0, DVec3::splat(250.0), 82341, 5, 0.6)
    }

    #[test]
    fn test_evaluate_twice_is_identical() {
        let mut a = NoiseField::new(terrain_like(), 1234);
        let mut b = NoiseField::new(terrain_like(), 1234);
        let ra = a.evaluate_2d(IVec2::new(-40, 16), IVec2::new(80, 80), 1.0).to_vec();
        let rb = b.evaluate_2d(IVec2::new(-40, 16), IVec2::new(80, 80), 1.0).to_vec();
        assert_eq!(ra, rb);
        let again = a.evaluate_2d(IVec2::new(-40, 16), IVec2::new(80, 80), 1.0);
        assert_eq!(ra.as_slice(), again);
    }

    #[test]
    fn test_changing_seed_changes_output() {
        let mut base = terrain_like();
        let mut a = NoiseField::new(base, 7);
        let ra = a.evaluate_2d(IVec2::new(3, 5), IVec2::new(32, 32), 1.0).to_vec();

        base.seed += 1;
        let mut b = NoiseField::new(base, 7);
        let rb = b.evaluate_2d(IVec2::new(3, 5), IVec2::new(32, 32), 1.0).to_vec();
        assert_ne!(ra, rb, "field seed must affect output");

        let mut c = NoiseField::new(terrain_like(), 8);
        let rc = c.evaluate_2d(IVec2::new(3, 5), IVec2::new(32, 32), 1.0).to_vec();
        assert_ne!(ra, rc, "world seed must affect output");
    }

    #[test]
    fn test_zero_octaves_is_constant_offset() {
        let params = NoiseParams {
            octaves: 0,
            offset: 3.5,
            ..terrain_like()
        };
        let mut field = NoiseField::new(params, 99);
        let values = field.evaluate_3d(IVec3::new(-8, -8, -8), IVec3::splat(8), 1.0);
        assert_eq!(values.len(), 512);
        assert!(values.iter().all(|&v| v == 3.5));
    }

    #[test]
    fn test_values_within_amplitude_bound() {
        let params = terrain_like();
        let bound = params.max_amplitude();
        let mut field = NoiseField::new(params, 5);
        for &v in field.evaluate_2d(IVec2::new(-500, -500), IVec2::new(64, 64), 7.0) {
            assert!((v - params.offset).abs() <= bound + 1e-9, "{v} exceeds bound {bound}");
        }
    }

    #[test]
    fn test_2d_layout_is_x_fastest() {
        let mut field = NoiseField::new(terrain_like(), 11);
        let values = field
            .evaluate_2d(IVec2::new(10, 20), IVec2::new(4, 3), 1.0)
            .to_vec();
        let sampler = field.sampler();
        assert_eq!(values[1 + 2 * 4], sampler.sample_2d(11.0, 22.0));
    }

    #[test]
    fn test_3d_layout_matches_point_samples() {
        let params = NoiseParams::new(0.0, 1.0, DVec3::new(40.0, 20.0, 40.0), 34329, 3, 0.5);
        let mut field = NoiseField::new(params, 77);
        let size = IVec3::new(5, 4, 3);
        let values = field.evaluate_3d(IVec3::new(-2, 0, 9), size, 1.0).to_vec();
        let idx = 2 + 3 * size.x as usize + 1 * (size.x * size.y) as usize;
        assert_eq!(
            values[idx],
            field.sampler().sample_3d(DVec3::new(0.0, 3.0, 10.0))
        );
    }

    #[test]
    fn test_smooth_between_neighbours() {
        let sampler = NoiseSampler::new(terrain_like(), 42);
        let max_delta = terrain_like().max_amplitude() * 0.1;
        for i in 0..2000 {
            let x = i as f64 * 0.5;
            let delta = (sampler.sample_2d(x + 0.5, 0.3) - sampler.sample_2d(x, 0.3)).abs();
            assert!(delta < max_delta, "discontinuity at x={x}: {delta}");
        }
    }
}
