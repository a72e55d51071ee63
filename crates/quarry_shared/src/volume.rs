use glam::IVec3;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::block::BlockCode;
use crate::chunk::ChunkVolume;
use crate::coords::{offset_to_world, world_to_chunk, ChunkPos};

/// Block at local `(x, y, z)` of `chunk`, one-cell halo included. Anything
/// unresolvable reads as [`BlockCode::AIR`].
pub trait BlockVolumeQuery {
    fn block_at(&self, chunk: ChunkPos, x: i32, y: i32, z: i32) -> BlockCode;
}

impl<Q: BlockVolumeQuery + ?Sized> BlockVolumeQuery for &Q {
    fn block_at(&self, chunk: ChunkPos, x: i32, y: i32, z: i32) -> BlockCode {
        (**self).block_at(chunk, x, y, z)
    }
}

impl BlockVolumeQuery for ChunkVolume {
    fn block_at(&self, _chunk: ChunkPos, x: i32, y: i32, z: i32) -> BlockCode {
        self.get_local_i32(x, y, z).unwrap_or(BlockCode::AIR)
    }
}

#[derive(Default, Debug, Clone)]
pub struct ChunkStore {
    loaded_chunks: FxHashMap<ChunkPos, ChunkVolume>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: ChunkPos, volume: ChunkVolume) -> Option<ChunkVolume> {
        trace!("chunk {:?} loaded into store", pos);
        self.loaded_chunks.insert(pos, volume)
    }

    pub fn remove(&mut self, pos: ChunkPos) -> Option<ChunkVolume> {
        trace!("chunk {:?} removed from store", pos);
        self.loaded_chunks.remove(&pos)
    }

    pub fn get(&self, pos: ChunkPos) -> Option<&ChunkVolume> {
        self.loaded_chunks.get(&pos)
    }

    pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut ChunkVolume> {
        self.loaded_chunks.get_mut(&pos)
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.loaded_chunks.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.loaded_chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded_chunks.is_empty()
    }

    pub fn positions(&self) -> Vec<ChunkPos> {
        let mut positions: Vec<ChunkPos> = self.loaded_chunks.keys().copied().collect();
        positions.sort_by_key(|pos| (pos.x, pos.z));
        positions
    }

    pub fn block(&self, world_pos: IVec3) -> BlockCode {
        let Some((chunk_pos, local)) = world_to_chunk(world_pos) else {
            return BlockCode::AIR;
        };
        self.loaded_chunks
            .get(&chunk_pos)
            .map(|volume| volume.get(local))
            .unwrap_or(BlockCode::AIR)
    }

    pub fn set_block(&mut self, world_pos: IVec3, block: BlockCode) -> Option<BlockCode> {
        let (chunk_pos, local) = world_to_chunk(world_pos)?;
        let volume = self.loaded_chunks.get_mut(&chunk_pos)?;
        let previous = volume.get(local);
        volume.set(local, block);
        Some(previous)
    }

    pub fn neighborhood(&self, center: ChunkPos) -> Option<ChunkNeighborhood<'_>> {
        let volume = self.loaded_chunks.get(&center)?;
        let neighbor = |dx, dz| {
            center
                .checked_offset(dx, dz)
                .and_then(|pos| self.loaded_chunks.get(&pos))
        };
        Some(ChunkNeighborhood {
            position: center,
            center: volume,
            pos_x: neighbor(1, 0),
            neg_x: neighbor(-1, 0),
            pos_z: neighbor(0, 1),
            neg_z: neighbor(0, -1),
        })
    }
}

impl BlockVolumeQuery for ChunkStore {
    fn block_at(&self, chunk: ChunkPos, x: i32, y: i32, z: i32) -> BlockCode {
        if let Some(volume) = self.loaded_chunks.get(&chunk) {
            if let Some(block) = volume.get_local_i32(x, y, z) {
                return block;
            }
        }
        offset_to_world(chunk, x, y, z)
            .map(|world| self.block(world))
            .unwrap_or(BlockCode::AIR)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ChunkNeighborhood<'a> {
    pub position: ChunkPos,
    pub center: &'a ChunkVolume,
    pub pos_x: Option<&'a ChunkVolume>,
    pub neg_x: Option<&'a ChunkVolume>,
    pub pos_z: Option<&'a ChunkVolume>,
    pub neg_z: Option<&'a ChunkVolume>,
}

impl<'a> ChunkNeighborhood<'a> {
    pub fn isolated(position: ChunkPos, center: &'a ChunkVolume) -> Self {
        Self {
            position,
            center,
            pos_x: None,
            neg_x: None,
            pos_z: None,
            neg_z: None,
        }
    }

    fn sample_world(&self, world: IVec3) -> BlockCode {
        let Some((chunk_pos, local)) = world_to_chunk(world) else {
            return BlockCode::AIR;
        };
        let dx = chunk_pos.x.checked_sub(self.position.x);
        let dz = chunk_pos.z.checked_sub(self.position.z);
        let volume = match (dx, dz) {
            (Some(0), Some(0)) => Some(self.center),
            (Some(1), Some(0)) => self.pos_x,
            (Some(-1), Some(0)) => self.neg_x,
            (Some(0), Some(1)) => self.pos_z,
            (Some(0), Some(-1)) => self.neg_z,
            _ => None,
        };
        volume
            .map(|volume| volume.get(local))
            .unwrap_or(BlockCode::AIR)
    }
}

impl BlockVolumeQuery for ChunkNeighborhood<'_> {
    fn block_at(&self, chunk: ChunkPos, x: i32, y: i32, z: i32) -> BlockCode {
        if chunk == self.position {
            if let Some(block) = self.center.get_local_i32(x, y, z) {
                return block;
            }
        }
        offset_to_world(chunk, x, y, z)
            .map(|world| self.sample_world(world))
            .unwrap_or(BlockCode::AIR)
    }
}
