pub mod buffers;
pub mod chunk;
pub mod mesher;
pub mod scheduler;
pub mod sink;

pub use buffers::{MeshBuffers, MeshVertex};
pub use chunk::{Chunk, ChunkState};
pub use mesher::{build_chunk_mesh, MeshBuildError, MeshStats, VisibleFaces};
pub use scheduler::{RebuildQueue, RebuildScheduler};
pub use sink::{MeshSink, SharedMesh};
