use std::fmt;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::block::BlockCode;
use crate::coords::{local_from_i32, local_to_index, LocalPos, CHUNK_VOLUME};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkVolume {
    pub blocks: Box<[BlockCode; CHUNK_VOLUME]>,
}

#[derive(Debug)]
pub enum ChunkVolumeError {
    Encode(bincode::Error),
    Decode(bincode::Error),
}

impl fmt::Display for ChunkVolumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(source) => write!(f, "failed to encode chunk volume: {source}"),
            Self::Decode(source) => write!(f, "failed to decode chunk volume: {source}"),
        }
    }
}

impl std::error::Error for ChunkVolumeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(source) | Self::Decode(source) => Some(source.as_ref()),
        }
    }
}

impl ChunkVolume {
    pub fn new_empty() -> Self {
        Self::new_filled(BlockCode::AIR)
    }

    pub fn new_filled(block: BlockCode) -> Self {
        // Built through a Vec so the 64K-cell array never lives on the stack.
        let blocks: Box<[BlockCode]> = vec![block; CHUNK_VOLUME].into_boxed_slice();
        let blocks: Box<[BlockCode; CHUNK_VOLUME]> = match blocks.try_into() {
            Ok(blocks) => blocks,
            Err(_) => unreachable!("vec was allocated with CHUNK_VOLUME cells"),
        };
        Self { blocks }
    }

    pub fn get(&self, local: LocalPos) -> BlockCode {
        self.blocks[local_to_index(local)]
    }

    pub fn set(&mut self, local: LocalPos, block: BlockCode) {
        let index = local_to_index(local);
        self.blocks[index] = block;
    }

    pub fn get_local_i32(&self, x: i32, y: i32, z: i32) -> Option<BlockCode> {
        local_from_i32(x, y, z).map(|local| self.get(local))
    }

    pub fn fill(&mut self, block: BlockCode) {
        self.blocks.fill(block);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| block.is_air())
    }

    pub fn solid_count(&self) -> usize {
        self.blocks.iter().filter(|block| block.is_solid()).count()
    }

    pub fn encode(&self) -> Result<Vec<u8>, ChunkVolumeError> {
        bincode::serialize(self).map_err(ChunkVolumeError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ChunkVolumeError> {
        bincode::deserialize(bytes).map_err(ChunkVolumeError::Decode)
    }
}

impl Default for ChunkVolume {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl Serialize for ChunkVolume {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.blocks.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChunkVolume {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let blocks = Vec::<BlockCode>::deserialize(deserializer)?;
        if blocks.len() != CHUNK_VOLUME {
            return Err(de::Error::custom(format!(
                "expected {CHUNK_VOLUME} blocks, got {}",
                blocks.len()
            )));
        }

        let blocks: Box<[BlockCode; CHUNK_VOLUME]> = blocks
            .into_boxed_slice()
            .try_into()
            .map_err(|_| de::Error::custom("failed to deserialize chunk block array"))?;

        Ok(Self { blocks })
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkVolume;
    use crate::block::BlockCode;
    use crate::coords::{local_to_index, LocalPos, CHUNK_VOLUME};

    #[test]
    fn volume_creation_and_get_set_work() {
        let mut volume = ChunkVolume::new_empty();
        let pos = LocalPos { x: 3, y: 200, z: 11 };
        assert_eq!(volume.get(pos), BlockCode::AIR);
        assert!(volume.is_empty());

        volume.set(pos, BlockCode::STONE);
        assert_eq!(volume.get(pos), BlockCode::STONE);
        assert_eq!(volume.blocks[local_to_index(pos)], BlockCode::STONE);
        assert_eq!(volume.get_local_i32(3, 200, 11), Some(BlockCode::STONE));
        assert_eq!(volume.solid_count(), 1);
        assert!(!volume.is_empty());
    }

    #[test]
    fn signed_reads_outside_the_volume_are_none() {
        let volume = ChunkVolume::new_filled(BlockCode::DIRT);
        assert_eq!(volume.get_local_i32(-1, 0, 0), None);
        assert_eq!(volume.get_local_i32(0, 256, 0), None);
        assert_eq!(volume.get_local_i32(0, 0, 16), None);
        assert_eq!(volume.get_local_i32(15, 255, 15), Some(BlockCode::DIRT));
    }

    #[test]
    fn fill_rewrites_every_cell_in_place() {
        let mut volume = ChunkVolume::new_filled(BlockCode::SAND);
        let before = volume.blocks.as_ptr();
        volume.fill(BlockCode::AIR);
        assert!(volume.is_empty());
        assert_eq!(volume.blocks.as_ptr(), before);
    }

    #[test]
    fn volume_bincode_round_trip_preserves_data() {
        let mut original = ChunkVolume::new_filled(BlockCode::STONE);
        original.set(LocalPos { x: 0, y: 0, z: 0 }, BlockCode::BEDROCK);
        original.set(LocalPos { x: 15, y: 255, z: 15 }, BlockCode::AIR);
        original.set(LocalPos { x: 5, y: 13, z: 7 }, BlockCode::GRASS);

        let encoded = original.encode().expect("encode volume");
        let decoded = ChunkVolume::decode(&encoded).expect("decode volume");

        assert_eq!(decoded.blocks.len(), CHUNK_VOLUME);
        assert_eq!(decoded, original);
    }

    #[test]
    fn decoding_a_short_payload_fails() {
        let short = bincode::serialize(&vec![BlockCode::STONE; 10]).expect("encode short");
        let err = ChunkVolume::decode(&short).expect_err("short payload must fail");
        assert!(err.to_string().contains("failed to decode chunk volume"));
    }
}
