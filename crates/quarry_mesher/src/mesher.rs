use std::fmt;

use bitflags::bitflags;
use glam::Vec3;
use quarry_shared::block::BlockCode;
use quarry_shared::coords::{ChunkPos, CHUNK_DEPTH_I32, CHUNK_HEIGHT_I32, CHUNK_WIDTH_I32};
use quarry_shared::texture::{Direction, TextureLookup};
use quarry_shared::volume::BlockVolumeQuery;
use tracing::debug;

use crate::buffers::MeshBuffers;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VisibleFaces: u8 {
        const POS_X = 0b0000_0001;
        const NEG_X = 0b0000_0010;
        const POS_Y = 0b0000_0100;
        const NEG_Y = 0b0000_1000;
        const POS_Z = 0b0001_0000;
        const NEG_Z = 0b0010_0000;
    }
}

impl VisibleFaces {
    pub fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::PosX => Self::POS_X,
            Direction::NegX => Self::NEG_X,
            Direction::PosY => Self::POS_Y,
            Direction::NegY => Self::NEG_Y,
            Direction::PosZ => Self::POS_Z,
            Direction::NegZ => Self::NEG_Z,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub faces_per_direction: [u32; 6],
    pub solid_blocks: u32,
}

impl MeshStats {
    pub fn face_count(&self) -> u32 {
        self.faces_per_direction.iter().sum()
    }

    pub fn faces(&self, direction: Direction) -> u32 {
        self.faces_per_direction[direction.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshBuildError {
    MissingTextureMap { chunk: ChunkPos, block: BlockCode },
}

impl fmt::Display for MeshBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTextureMap { chunk, block } => write!(
                f,
                "no texture map for block {block} referenced by chunk ({}, {})",
                chunk.x, chunk.z
            ),
        }
    }
}

impl std::error::Error for MeshBuildError {}

pub fn visible_faces<Q>(query: &Q, chunk: ChunkPos, x: i32, y: i32, z: i32) -> VisibleFaces
where
    Q: BlockVolumeQuery + ?Sized,
{
    let mut faces = VisibleFaces::empty();
    for direction in Direction::ALL {
        let step = direction.offset();
        if query
            .block_at(chunk, x + step.x, y + step.y, z + step.z)
            .is_air()
        {
            faces |= VisibleFaces::from_direction(direction);
        }
    }
    faces
}

/// Appends to `out` without clearing it. On error `out` holds a partial mesh.
pub fn build_chunk_mesh<Q, T>(
    chunk: ChunkPos,
    query: &Q,
    textures: &T,
    out: &mut MeshBuffers,
) -> Result<MeshStats, MeshBuildError>
where
    Q: BlockVolumeQuery + ?Sized,
    T: TextureLookup + ?Sized,
{
    let mut stats = MeshStats::default();

    for z in 0..CHUNK_DEPTH_I32 {
        for y in 0..CHUNK_HEIGHT_I32 {
            for x in 0..CHUNK_WIDTH_I32 {
                let block = query.block_at(chunk, x, y, z);
                if block.is_air() {
                    continue;
                }
                stats.solid_blocks += 1;

                let faces = visible_faces(query, chunk, x, y, z);
                if faces.is_empty() {
                    continue;
                }

                let map = textures
                    .texture_map(block)
                    .ok_or(MeshBuildError::MissingTextureMap { chunk, block })?;

                for direction in Direction::ALL {
                    if !faces.contains(VisibleFaces::from_direction(direction)) {
                        continue;
                    }
                    emit_face(out, direction, x as f32, y as f32, z as f32);
                    out.add_texture_face(map.face(direction));
                    stats.faces_per_direction[direction.index()] += 1;
                }
            }
        }
    }

    debug!(
        "chunk ({}, {}) meshed: {} faces, {} vertices, {} solid blocks",
        chunk.x,
        chunk.z,
        stats.face_count(),
        out.vertices.len(),
        stats.solid_blocks
    );
    Ok(stats)
}

// `a-b-c` winds counter-clockwise seen from outside; corners pair with bl, tl, tr, br.
fn emit_face(out: &mut MeshBuffers, direction: Direction, x: f32, y: f32, z: f32) {
    let normal = direction.normal();
    match direction {
        Direction::PosX => out.add_face(
            Vec3::new(x + 1.0, y, z),
            Vec3::new(x + 1.0, y + 1.0, z),
            Vec3::new(x + 1.0, y + 1.0, z + 1.0),
            Vec3::new(x + 1.0, y, z + 1.0),
            normal,
        ),
        Direction::NegX => out.add_face(
            Vec3::new(x, y, z + 1.0),
            Vec3::new(x, y + 1.0, z + 1.0),
            Vec3::new(x, y + 1.0, z),
            Vec3::new(x, y, z),
            normal,
        ),
        Direction::PosY => out.add_face(
            Vec3::new(x, y + 1.0, z),
            Vec3::new(x, y + 1.0, z + 1.0),
            Vec3::new(x + 1.0, y + 1.0, z + 1.0),
            Vec3::new(x + 1.0, y + 1.0, z),
            normal,
        ),
        Direction::NegY => out.add_face(
            Vec3::new(x, y, z),
            Vec3::new(x + 1.0, y, z),
            Vec3::new(x + 1.0, y, z + 1.0),
            Vec3::new(x, y, z + 1.0),
            normal,
        ),
        Direction::PosZ => out.add_face(
            Vec3::new(x + 1.0, y, z + 1.0),
            Vec3::new(x + 1.0, y + 1.0, z + 1.0),
            Vec3::new(x, y + 1.0, z + 1.0),
            Vec3::new(x, y, z + 1.0),
            normal,
        ),
        Direction::NegZ => out.add_face(
            Vec3::new(x, y, z),
            Vec3::new(x, y + 1.0, z),
            Vec3::new(x + 1.0, y + 1.0, z),
            Vec3::new(x + 1.0, y, z),
            normal,
        ),
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};
    use quarry_shared::block::BlockCode;
    use quarry_shared::chunk::ChunkVolume;
    use quarry_shared::coords::{ChunkPos, LocalPos, CHUNK_DEPTH, CHUNK_WIDTH};
    use quarry_shared::texture::{Direction, TextureLookup, TextureMap, TextureMapper, UvQuad};
    use quarry_shared::volume::{BlockVolumeQuery, ChunkStore};

    use super::{build_chunk_mesh, visible_faces, MeshBuildError, VisibleFaces};
    use crate::buffers::MeshBuffers;

    struct SolidEverywhere(BlockCode);

    impl BlockVolumeQuery for SolidEverywhere {
        fn block_at(&self, _chunk: ChunkPos, _x: i32, _y: i32, _z: i32) -> BlockCode {
            self.0
        }
    }

    fn distinct_faces_mapper(block: BlockCode) -> TextureMapper {
        let quad =
            |i: f32| UvQuad::from_rect(Vec2::new(i * 0.1, 0.0), Vec2::new(i * 0.1 + 0.05, 0.5));
        let mut mapper = TextureMapper::new();
        mapper.insert(
            block,
            TextureMap {
                right: quad(0.0),
                left: quad(1.0),
                top: quad(2.0),
                bottom: quad(3.0),
                front: quad(4.0),
                back: quad(5.0),
            },
        );
        mapper
    }

    fn build(query: &impl BlockVolumeQuery, textures: &impl TextureLookup) -> MeshBuffers {
        let mut out = MeshBuffers::default();
        build_chunk_mesh(ChunkPos::default(), query, textures, &mut out).expect("build succeeds");
        out
    }

    #[test]
    fn empty_volume_produces_no_geometry() {
        let volume = ChunkVolume::new_empty();
        let out = build(&volume, &TextureMapper::new());
        assert!(out.is_empty());
        assert!(out.triangles.is_empty());
        assert_eq!(out.validate(), Ok(()));
    }

    #[test]
    fn single_block_in_vacuum_emits_six_textured_faces() {
        let mut volume = ChunkVolume::new_empty();
        volume.set(LocalPos { x: 4, y: 100, z: 9 }, BlockCode::STONE);
        let textures = distinct_faces_mapper(BlockCode::STONE);
        let map = *textures.texture_map(BlockCode::STONE).expect("mapped");

        let out = build(&volume, &textures);

        assert_eq!(out.vertices.len(), 24);
        assert_eq!(out.triangles.len(), 36);
        assert_eq!(out.normals.len(), 24);
        assert_eq!(out.uvs.len(), 24);
        assert_eq!(out.validate(), Ok(()));

        for (face, direction) in Direction::ALL.iter().enumerate() {
            let range = face * 4..face * 4 + 4;
            assert_eq!(out.normals[range.clone()], [direction.normal(); 4]);
            assert_eq!(out.uvs[range], map.face(*direction).corners());
        }
    }

    #[test]
    fn single_block_faces_hug_the_unit_cube() {
        let mut volume = ChunkVolume::new_empty();
        volume.set(LocalPos { x: 2, y: 3, z: 4 }, BlockCode::DIRT);
        let out = build(&volume, &distinct_faces_mapper(BlockCode::DIRT));

        assert_eq!(
            out.vertices[..4],
            [
                Vec3::new(3.0, 3.0, 4.0),
                Vec3::new(3.0, 4.0, 4.0),
                Vec3::new(3.0, 4.0, 5.0),
                Vec3::new(3.0, 3.0, 5.0),
            ]
        );
        let min = Vec3::new(2.0, 3.0, 4.0);
        let max = min + Vec3::ONE;
        for vertex in &out.vertices {
            assert!(vertex.cmpge(min).all() && vertex.cmple(max).all());
        }
    }

    #[test]
    fn every_quad_winds_towards_its_normal() {
        let mut volume = ChunkVolume::new_empty();
        volume.set(LocalPos { x: 0, y: 0, z: 0 }, BlockCode::STONE);
        volume.set(LocalPos { x: 8, y: 40, z: 8 }, BlockCode::STONE);
        volume.set(LocalPos { x: 8, y: 41, z: 8 }, BlockCode::STONE);
        let out = build(&volume, &distinct_faces_mapper(BlockCode::STONE));

        for (triangle, indices) in out.triangles.chunks_exact(3).enumerate() {
            let [a, b, c] = [
                out.vertices[indices[0] as usize],
                out.vertices[indices[1] as usize],
                out.vertices[indices[2] as usize],
            ];
            let normal = out.normals[indices[0] as usize];
            let winding = (b - a).cross(c - a);
            assert!(
                winding.normalize().dot(normal) > 0.999,
                "triangle {triangle} winds away from {normal:?}"
            );
        }
    }

    #[test]
    fn adjacent_blocks_cull_their_shared_faces() {
        let mut volume = ChunkVolume::new_empty();
        volume.set(LocalPos { x: 5, y: 5, z: 5 }, BlockCode::STONE);
        volume.set(LocalPos { x: 6, y: 5, z: 5 }, BlockCode::STONE);

        let mut out = MeshBuffers::default();
        let stats = build_chunk_mesh(
            ChunkPos::default(),
            &volume,
            &distinct_faces_mapper(BlockCode::STONE),
            &mut out,
        )
        .expect("build succeeds");

        assert_eq!(stats.face_count(), 10);
        assert_eq!(stats.faces(Direction::PosX), 1);
        assert_eq!(stats.faces(Direction::NegX), 1);
        assert_eq!(stats.faces(Direction::PosY), 2);
        assert_eq!(stats.solid_blocks, 2);
        assert_eq!(out.face_count(), 10);
    }

    #[test]
    fn fully_enclosed_chunk_emits_nothing() {
        let out = build(
            &SolidEverywhere(BlockCode::STONE),
            &distinct_faces_mapper(BlockCode::STONE),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn solid_chunk_between_solid_neighbors_only_shows_top_and_bottom() {
        let mut store = ChunkStore::new();
        for pos in [
            ChunkPos::new(0, 0),
            ChunkPos::new(1, 0),
            ChunkPos::new(-1, 0),
            ChunkPos::new(0, 1),
            ChunkPos::new(0, -1),
        ] {
            store.insert(pos, ChunkVolume::new_filled(BlockCode::STONE));
        }

        let mut out = MeshBuffers::default();
        let stats = build_chunk_mesh(
            ChunkPos::new(0, 0),
            &store,
            &distinct_faces_mapper(BlockCode::STONE),
            &mut out,
        )
        .expect("build succeeds");

        let layer = (CHUNK_WIDTH * CHUNK_DEPTH) as u32;
        assert_eq!(stats.faces(Direction::PosY), layer);
        assert_eq!(stats.faces(Direction::NegY), layer);
        assert_eq!(stats.face_count(), layer * 2);
        assert_eq!(out.validate(), Ok(()));
    }

    #[test]
    fn missing_neighbor_chunks_expose_the_boundary_shell() {
        let mut store = ChunkStore::new();
        store.insert(ChunkPos::new(0, 0), ChunkVolume::new_filled(BlockCode::STONE));
        store.insert(ChunkPos::new(1, 0), ChunkVolume::new_filled(BlockCode::STONE));

        let mut out = MeshBuffers::default();
        let stats = build_chunk_mesh(
            ChunkPos::new(0, 0),
            &store,
            &distinct_faces_mapper(BlockCode::STONE),
            &mut out,
        )
        .expect("build succeeds");

        let wall = 16 * 256;
        assert_eq!(stats.faces(Direction::PosX), 0);
        assert_eq!(stats.faces(Direction::NegX), wall);
        assert_eq!(stats.faces(Direction::PosZ), wall);
        assert_eq!(stats.faces(Direction::NegZ), wall);
    }

    #[test]
    fn chunks_at_the_edge_of_the_grid_expose_their_outer_faces() {
        let textures = distinct_faces_mapper(BlockCode::STONE);
        for (pos, local) in [
            (ChunkPos::new(i32::MAX / 16, 0), LocalPos { x: 15, y: 9, z: 3 }),
            (ChunkPos::new(i32::MIN / 16, 0), LocalPos { x: 0, y: 9, z: 3 }),
            (ChunkPos::new(i32::MAX, i32::MIN), LocalPos { x: 15, y: 9, z: 0 }),
        ] {
            // Solid chunks where an unchecked halo step would wrap around to.
            let mut store = ChunkStore::new();
            for wrapped in [ChunkPos::new(i32::MIN / 16, 0), ChunkPos::new(i32::MAX / 16, 0)] {
                store.insert(wrapped, ChunkVolume::new_filled(BlockCode::STONE));
            }
            let mut volume = ChunkVolume::new_empty();
            volume.set(local, BlockCode::STONE);
            store.insert(pos, volume);

            let mut out = MeshBuffers::default();
            let stats = build_chunk_mesh(pos, &store, &textures, &mut out).expect("build succeeds");
            assert_eq!(stats.face_count(), 6, "chunk {pos:?}");

            let view = store.neighborhood(pos).expect("chunk is loaded");
            let mut through_view = MeshBuffers::default();
            build_chunk_mesh(pos, &view, &textures, &mut through_view)
                .expect("build succeeds");
            assert_eq!(through_view, out);
        }
    }

    #[test]
    fn neighborhood_builds_match_store_builds() {
        let mut store = ChunkStore::new();
        let center = ChunkPos::new(-2, 6);
        let mut volume = ChunkVolume::new_empty();
        volume.set(LocalPos { x: 15, y: 20, z: 0 }, BlockCode::STONE);
        volume.set(LocalPos { x: 0, y: 21, z: 15 }, BlockCode::STONE);
        store.insert(center, volume);
        store.insert(center + ChunkPos::new(1, 0), ChunkVolume::new_filled(BlockCode::STONE));
        store.insert(center + ChunkPos::new(0, -1), ChunkVolume::new_filled(BlockCode::STONE));
        let textures = distinct_faces_mapper(BlockCode::STONE);

        let mut by_store = MeshBuffers::default();
        build_chunk_mesh(center, &store, &textures, &mut by_store).expect("store build");

        let view = store.neighborhood(center).expect("center is loaded");
        let mut by_view = MeshBuffers::default();
        let stats =
            build_chunk_mesh(center, &view, &textures, &mut by_view).expect("view build");

        assert_eq!(by_view, by_store);
        assert_eq!(stats.faces(Direction::PosX), 1);
        assert_eq!(stats.faces(Direction::NegZ), 1);
        assert_eq!(stats.face_count(), 10);
    }

    #[test]
    fn missing_texture_map_is_reported() {
        let mut volume = ChunkVolume::new_empty();
        volume.set(LocalPos { x: 1, y: 1, z: 1 }, BlockCode(42));

        let mut out = MeshBuffers::default();
        let err = build_chunk_mesh(ChunkPos::new(3, 4), &volume, &TextureMapper::new(), &mut out)
            .expect_err("unmapped block must fail");
        assert_eq!(
            err,
            MeshBuildError::MissingTextureMap {
                chunk: ChunkPos::new(3, 4),
                block: BlockCode(42),
            }
        );
        assert_eq!(
            err.to_string(),
            "no texture map for block #42 referenced by chunk (3, 4)"
        );
    }

    #[test]
    fn repeated_builds_are_byte_identical() {
        let mut volume = ChunkVolume::new_empty();
        for i in 0..16u8 {
            volume.set(LocalPos { x: i, y: i * 3, z: 15 - i }, BlockCode::STONE);
            volume.set(LocalPos { x: i, y: i * 3 + 1, z: 15 - i }, BlockCode::STONE);
        }
        let textures = distinct_faces_mapper(BlockCode::STONE);

        let first = build(&volume, &textures);
        let second = build(&volume, &textures);
        assert_eq!(
            bytemuck::cast_slice::<_, u8>(&first.interleaved()),
            bytemuck::cast_slice::<_, u8>(&second.interleaved())
        );
        assert_eq!(first.index_bytes(), second.index_bytes());
    }

    #[test]
    fn visible_faces_reports_air_neighbors() {
        let mut volume = ChunkVolume::new_empty();
        volume.set(LocalPos { x: 3, y: 3, z: 3 }, BlockCode::STONE);
        volume.set(LocalPos { x: 3, y: 4, z: 3 }, BlockCode::STONE);
        volume.set(LocalPos { x: 2, y: 3, z: 3 }, BlockCode::STONE);

        let faces = visible_faces(&volume, ChunkPos::default(), 3, 3, 3);
        assert_eq!(
            faces,
            VisibleFaces::POS_X | VisibleFaces::NEG_Y | VisibleFaces::POS_Z | VisibleFaces::NEG_Z
        );
    }
}
