//! Noise-driven surface fill for the demo host space.
//!
//! Structures need ground to stand on; this gives [`GridSpace`] a rolling
//! surface so `top_solid_y` has something to find.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use glam::{IVec2, IVec3};

use crate::constants::SEA_LEVEL;
use crate::core::{CellState, Identifier, IdentifierError, SetFlags};
use crate::world::space::{GridSpace, SpaceError, TargetSpace};

/// Cell states used by [`SurfaceGenerator`].
#[derive(Clone, Debug)]
pub struct TerrainPalette {
    pub stone: CellState,
    pub soil: CellState,
    pub surface: CellState,
    pub water: CellState,
}

impl TerrainPalette {
    pub fn overworld() -> Result<Self, IdentifierError> {
        let state = |name: &str| Identifier::with_default_namespace(name).map(CellState::of);
        Ok(TerrainPalette {
            stone: state("stone")?,
            soil: state("dirt")?,
            surface: state("grass_block")?,
            water: state("water")?,
        })
    }
}

pub struct SurfaceGenerator {
    noise_terrain: FastNoiseLite,
    noise_detail: FastNoiseLite,
    palette: TerrainPalette,
    base_height: i32,
    amplitude: f32,
    pub seed: u32,
}

impl SurfaceGenerator {
    pub fn new(seed: u32, palette: TerrainPalette) -> Self {
        SurfaceGenerator {
            noise_terrain: Self::create_fbm_noise(seed, 0.008),
            noise_detail: Self::create_fbm_noise(seed.wrapping_add(1), 0.03),
            palette,
            base_height: SEA_LEVEL + 8,
            amplitude: 12.0,
            seed,
        }
    }

    fn create_fbm_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(4));
        noise.set_fractal_lacunarity(Some(2.0));
        noise.set_fractal_gain(Some(0.5));
        noise.set_frequency(Some(frequency));
        noise
    }

    /// Height of the first free cell above the surface at `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let fx = x as f32;
        let fz = z as f32;
        let terrain = self.noise_terrain.get_noise_2d(fx, fz);
        let detail = self.noise_detail.get_noise_2d(fx, fz) * 0.25;
        self.base_height + ((terrain + detail) * self.amplitude) as i32
    }

    /// Fill every column of `space` between `min_xz` and `max_xz` (exclusive).
    pub fn fill(&self, space: &mut GridSpace, min_xz: IVec2, max_xz: IVec2) -> Result<(), SpaceError> {
        let floor = space.min().y;
        for x in min_xz.x..max_xz.x {
            for z in min_xz.y..max_xz.y {
                let height = self.surface_height(x, z);
                for y in floor..height.max(SEA_LEVEL) {
                    let state = if y < height - 4 {
                        &self.palette.stone
                    } else if y < height - 1 {
                        &self.palette.soil
                    } else if y < height {
                        &self.palette.surface
                    } else {
                        &self.palette.water
                    };
                    space.set_cell(IVec3::new(x, y, z), state.clone(), SetFlags::NONE)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> TerrainPalette {
        TerrainPalette {
            stone: CellState::of("stone".parse().unwrap()),
            soil: CellState::of("dirt".parse().unwrap()),
            surface: CellState::of("grass_block".parse().unwrap()),
            water: CellState::of("water".parse().unwrap()),
        }
    }

    #[test]
    fn same_seed_same_surface() {
        let a = SurfaceGenerator::new(2137, palette());
        let b = SurfaceGenerator::new(2137, palette());
        for x in -20..20 {
            assert_eq!(a.surface_height(x, x * 3), b.surface_height(x, x * 3));
        }
    }

    #[test]
    fn fill_produces_findable_surface() {
        let generator = SurfaceGenerator::new(7, palette());
        let (min, max) = (IVec2::ZERO, IVec2::splat(4));
        let mut space = GridSpace::new(min, max);
        generator.fill(&mut space, min, max).unwrap();

        let top = space
            .top_solid_y(IVec2::new(2, 2), crate::world::space::Heightmap::WorldSurfaceWg)
            .unwrap();
        assert_eq!(top, generator.surface_height(2, 2).max(SEA_LEVEL));
    }
}
