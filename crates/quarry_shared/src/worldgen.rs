use noise::{NoiseFn, Perlin};

use crate::block::BlockCode;
use crate::chunk::ChunkVolume;
use crate::coords::{ChunkPos, LocalPos, CHUNK_DEPTH, CHUNK_HEIGHT_I32, CHUNK_WIDTH};

const BASE_HEIGHT: f64 = 64.0;
const HEIGHT_AMPLITUDE: f64 = 28.0;
const DETAIL_AMPLITUDE: f64 = 6.0;
const SEA_LEVEL: i32 = 58;
const SNOW_LINE: i32 = 86;
const DIRT_DEPTH: i32 = 3;

#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    pub seed: u64,
}

impl TerrainGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn surface_height(
        &self,
        terrain: &Perlin,
        detail: &Perlin,
        world_x: i64,
        world_z: i64,
    ) -> i32 {
        let wx = world_x as f64;
        let wz = world_z as f64;
        let broad = terrain.get([wx * 0.012, wz * 0.012]) * HEIGHT_AMPLITUDE;
        let fine = detail.get([wx * 0.06, wz * 0.06]) * DETAIL_AMPLITUDE;
        let height = (BASE_HEIGHT + broad + fine).round() as i32;
        height.clamp(1, CHUNK_HEIGHT_I32 - 1)
    }

    pub fn generate_chunk(&self, pos: ChunkPos) -> ChunkVolume {
        let mut volume = ChunkVolume::new_empty();
        self.generate_into(pos, &mut volume);
        volume
    }

    pub fn generate_into(&self, pos: ChunkPos, volume: &mut ChunkVolume) {
        volume.fill(BlockCode::AIR);

        let terrain = Perlin::new(self.seed as u32);
        let detail = Perlin::new(self.seed.wrapping_add(17) as u32);

        for z in 0..CHUNK_DEPTH {
            for x in 0..CHUNK_WIDTH {
                let world_x = i64::from(pos.x) * CHUNK_WIDTH as i64 + x as i64;
                let world_z = i64::from(pos.z) * CHUNK_DEPTH as i64 + z as i64;
                let surface = self.surface_height(&terrain, &detail, world_x, world_z);
                let top = surface_block(surface);

                for y in 0..=surface {
                    let block = if y == 0 {
                        BlockCode::BEDROCK
                    } else if y == surface {
                        top
                    } else if y > surface - DIRT_DEPTH {
                        if top == BlockCode::SAND {
                            BlockCode::SAND
                        } else {
                            BlockCode::DIRT
                        }
                    } else {
                        BlockCode::STONE
                    };
                    volume.set(
                        LocalPos {
                            x: x as u8,
                            y: y as u8,
                            z: z as u8,
                        },
                        block,
                    );
                }
            }
        }
    }
}

fn surface_block(surface: i32) -> BlockCode {
    if surface <= SEA_LEVEL + 1 {
        BlockCode::SAND
    } else if surface >= SNOW_LINE {
        BlockCode::SNOW
    } else {
        BlockCode::GRASS
    }
}
