use std::collections::{HashSet, VecDeque};

use quarry_shared::coords::ChunkPos;
use quarry_shared::texture::TextureLookup;
use quarry_shared::volume::{BlockVolumeQuery, ChunkStore};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::debug;

use crate::chunk::Chunk;
use crate::mesher::{MeshBuildError, MeshStats};
use crate::sink::MeshSink;

pub type RebuildResult = (ChunkPos, Result<MeshStats, MeshBuildError>);

/// FIFO; re-requesting a queued position keeps its place.
#[derive(Debug, Default)]
pub struct RebuildQueue {
    pending: VecDeque<ChunkPos>,
    queued: HashSet<ChunkPos>,
}

impl RebuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, pos: ChunkPos) -> bool {
        if !self.queued.insert(pos) {
            return false;
        }
        self.pending.push_back(pos);
        true
    }

    pub fn take(&mut self, budget: usize) -> Vec<ChunkPos> {
        let count = budget.min(self.pending.len());
        let taken: Vec<ChunkPos> = self.pending.drain(..count).collect();
        for pos in &taken {
            self.queued.remove(pos);
        }
        taken
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.queued.contains(&pos)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub struct RebuildScheduler {
    pool: ThreadPool,
}

impl RebuildScheduler {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|index| format!("mesh-worker-{index}"));
        if let Some(count) = num_threads {
            builder = builder.num_threads(count);
        }

        let pool = builder.build()?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn rebuild_all<S, Q, T>(
        &self,
        chunks: &mut [Chunk<S>],
        query: &Q,
        textures: &T,
    ) -> Vec<RebuildResult>
    where
        S: MeshSink + Send,
        Q: BlockVolumeQuery + Sync + ?Sized,
        T: TextureLookup + Sync + ?Sized,
    {
        let results: Vec<RebuildResult> = self.pool.install(|| {
            chunks
                .par_iter_mut()
                .map(|chunk| (chunk.position(), chunk.build(query, textures)))
                .collect()
        });
        debug!("rebuilt {} chunks", results.len());
        results
    }

    /// Slots whose volume is not loaded read through the store and come out empty.
    pub fn rebuild_store<S, T>(
        &self,
        chunks: &mut [Chunk<S>],
        store: &ChunkStore,
        textures: &T,
    ) -> Vec<RebuildResult>
    where
        S: MeshSink + Send,
        T: TextureLookup + Sync + ?Sized,
    {
        let results: Vec<RebuildResult> = self.pool.install(|| {
            chunks
                .par_iter_mut()
                .map(|chunk| {
                    let pos = chunk.position();
                    let result = match store.neighborhood(pos) {
                        Some(view) => chunk.build(&view, textures),
                        None => chunk.build(store, textures),
                    };
                    (pos, result)
                })
                .collect()
        });
        debug!("rebuilt {} chunks from neighborhoods", results.len());
        results
    }

    /// Queued positions without a slot in `chunks` are dropped.
    pub fn rebuild_queued<S, Q, T>(
        &self,
        queue: &mut RebuildQueue,
        budget: usize,
        chunks: &mut [Chunk<S>],
        query: &Q,
        textures: &T,
    ) -> Vec<RebuildResult>
    where
        S: MeshSink + Send,
        Q: BlockVolumeQuery + Sync + ?Sized,
        T: TextureLookup + Sync + ?Sized,
    {
        let wanted: HashSet<ChunkPos> = queue.take(budget).into_iter().collect();
        if wanted.is_empty() {
            return Vec::new();
        }

        let results: Vec<RebuildResult> = self.pool.install(|| {
            chunks
                .par_iter_mut()
                .filter(|chunk| wanted.contains(&chunk.position()))
                .map(|chunk| (chunk.position(), chunk.build(query, textures)))
                .collect()
        });
        debug!(
            "rebuilt {} of {} requested chunks, {} still queued",
            results.len(),
            wanted.len(),
            queue.len()
        );
        results
    }
}
