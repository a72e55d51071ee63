use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

pub const CHUNK_WIDTH: usize = 16;
pub const CHUNK_HEIGHT: usize = 256;
pub const CHUNK_DEPTH: usize = 16;
pub const CHUNK_VOLUME: usize = CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_DEPTH;

pub const CHUNK_WIDTH_I32: i32 = CHUNK_WIDTH as i32;
pub const CHUNK_HEIGHT_I32: i32 = CHUNK_HEIGHT as i32;
pub const CHUNK_DEPTH_I32: i32 = CHUNK_DEPTH as i32;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn checked_offset(self, dx: i32, dz: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            z: self.z.checked_add(dz)?,
        })
    }
}

impl Add for ChunkPos {
    type Output = ChunkPos;

    fn add(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x + rhs.x,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for ChunkPos {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for ChunkPos {
    type Output = ChunkPos;

    fn sub(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x - rhs.x,
            z: self.z - rhs.z,
        }
    }
}

impl SubAssign for ChunkPos {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.z -= rhs.z;
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

/// `None` above or below the world.
pub fn world_to_chunk(world_pos: IVec3) -> Option<(ChunkPos, LocalPos)> {
    if !(0..CHUNK_HEIGHT_I32).contains(&world_pos.y) {
        return None;
    }

    let (chunk_x, local_x) = div_rem_floor(world_pos.x, CHUNK_WIDTH_I32);
    let (chunk_z, local_z) = div_rem_floor(world_pos.z, CHUNK_DEPTH_I32);

    Some((
        ChunkPos {
            x: chunk_x,
            z: chunk_z,
        },
        LocalPos {
            x: local_x as u8,
            y: world_pos.y as u8,
            z: local_z as u8,
        },
    ))
}

pub fn chunk_to_world(chunk_pos: ChunkPos, local: LocalPos) -> Option<IVec3> {
    offset_to_world(
        chunk_pos,
        i32::from(local.x),
        i32::from(local.y),
        i32::from(local.z),
    )
}

/// `None` when the cell lies outside the `i32` world grid.
pub fn offset_to_world(chunk_pos: ChunkPos, x: i32, y: i32, z: i32) -> Option<IVec3> {
    let world_x = chunk_pos.x.checked_mul(CHUNK_WIDTH_I32)?.checked_add(x)?;
    let world_z = chunk_pos.z.checked_mul(CHUNK_DEPTH_I32)?.checked_add(z)?;
    Some(IVec3::new(world_x, y, world_z))
}

pub fn chunk_origin(chunk_pos: ChunkPos) -> Vec3 {
    Vec3::new(
        (i64::from(chunk_pos.x) * CHUNK_WIDTH as i64) as f32,
        0.0,
        (i64::from(chunk_pos.z) * CHUNK_DEPTH as i64) as f32,
    )
}

pub fn local_to_index(local: LocalPos) -> usize {
    usize::from(local.x)
        + usize::from(local.z) * CHUNK_WIDTH
        + usize::from(local.y) * CHUNK_WIDTH * CHUNK_DEPTH
}

pub fn index_to_local(index: usize) -> LocalPos {
    assert!(index < CHUNK_VOLUME, "chunk index out of bounds: {index}");

    let y = index / (CHUNK_WIDTH * CHUNK_DEPTH);
    let rem = index % (CHUNK_WIDTH * CHUNK_DEPTH);
    let z = rem / CHUNK_WIDTH;
    let x = rem % CHUNK_WIDTH;

    LocalPos {
        x: x as u8,
        y: y as u8,
        z: z as u8,
    }
}

pub fn local_from_i32(x: i32, y: i32, z: i32) -> Option<LocalPos> {
    let in_bounds = (0..CHUNK_WIDTH_I32).contains(&x)
        && (0..CHUNK_HEIGHT_I32).contains(&y)
        && (0..CHUNK_DEPTH_I32).contains(&z);
    in_bounds.then(|| LocalPos {
        x: x as u8,
        y: y as u8,
        z: z as u8,
    })
}
