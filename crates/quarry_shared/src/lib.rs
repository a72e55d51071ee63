pub mod block;
pub mod chunk;
pub mod coords;
pub mod texture;
pub mod volume;
pub mod worldgen;
