use quarry_shared::coords::{chunk_origin, ChunkPos};
use quarry_shared::texture::TextureLookup;
use quarry_shared::volume::BlockVolumeQuery;
use tracing::{trace, warn};

use crate::buffers::MeshBuffers;
use crate::mesher::{build_chunk_mesh, MeshBuildError, MeshStats};
use crate::sink::MeshSink;

const INITIAL_FACE_CAPACITY: usize = 2_048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkState {
    #[default]
    Unloaded,
    Built,
}

/// Builds scan into `scratch` and swap with `published` only once the whole
/// volume is meshed, so a failed build leaves the previous mesh in place.
#[derive(Debug)]
pub struct Chunk<S> {
    position: ChunkPos,
    state: ChunkState,
    published: MeshBuffers,
    scratch: MeshBuffers,
    last_stats: Option<MeshStats>,
    sink: S,
}

impl<S: MeshSink> Chunk<S> {
    pub fn new(sink: S) -> Self {
        Self {
            position: ChunkPos::default(),
            state: ChunkState::Unloaded,
            published: MeshBuffers::with_face_capacity(INITIAL_FACE_CAPACITY),
            scratch: MeshBuffers::with_face_capacity(INITIAL_FACE_CAPACITY),
            last_stats: None,
            sink,
        }
    }

    pub fn with_position(position: ChunkPos, sink: S) -> Self {
        let mut chunk = Self::new(sink);
        chunk.initialize(position);
        chunk
    }

    pub fn initialize(&mut self, position: ChunkPos) {
        self.position = position;
    }

    pub fn build<Q, T>(&mut self, query: &Q, textures: &T) -> Result<MeshStats, MeshBuildError>
    where
        Q: BlockVolumeQuery + ?Sized,
        T: TextureLookup + ?Sized,
    {
        self.scratch.clear();
        let stats = match build_chunk_mesh(self.position, query, textures, &mut self.scratch) {
            Ok(stats) => stats,
            Err(err) => {
                warn!("chunk build aborted, keeping previous mesh: {}", err);
                self.scratch.clear();
                return Err(err);
            }
        };

        std::mem::swap(&mut self.published, &mut self.scratch);
        self.sink.set_origin(chunk_origin(self.position));
        self.sink.apply(&self.published);
        self.sink.set_visible(true);
        self.last_stats = Some(stats);
        trace!("chunk {:?}: {:?} -> Built", self.position, self.state);
        self.state = ChunkState::Built;
        Ok(stats)
    }

    pub fn unload(&mut self) {
        self.sink.set_visible(false);
        self.sink.clear();
        self.published.clear();
        self.scratch.clear();
        self.last_stats = None;
        trace!("chunk {:?}: {:?} -> Unloaded", self.position, self.state);
        self.state = ChunkState::Unloaded;
    }

    pub fn position(&self) -> ChunkPos {
        self.position
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ChunkState::Built
    }

    pub fn mesh(&self) -> &MeshBuffers {
        &self.published
    }

    pub fn last_stats(&self) -> Option<&MeshStats> {
        self.last_stats.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
