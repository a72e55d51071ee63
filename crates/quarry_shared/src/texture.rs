use std::fmt;

use glam::{IVec3, Vec2, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::BlockCode;

const DEFAULT_ATLAS_TOML: &str = include_str!("../assets/texture_map.toml");

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosY,
        Direction::NegY,
        Direction::PosZ,
        Direction::NegZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn normal(self) -> Vec3 {
        self.offset().as_vec3()
    }

    pub fn offset(self) -> IVec3 {
        match self {
            Direction::PosX => IVec3::X,
            Direction::NegX => IVec3::NEG_X,
            Direction::PosY => IVec3::Y,
            Direction::NegY => IVec3::NEG_Y,
            Direction::PosZ => IVec3::Z,
            Direction::NegZ => IVec3::NEG_Z,
        }
    }

    pub fn is_horizontal(self) -> bool {
        !matches!(self, Direction::PosY | Direction::NegY)
    }

    fn config_key(self) -> &'static str {
        match self {
            Direction::PosX => "right",
            Direction::NegX => "left",
            Direction::PosY => "top",
            Direction::NegY => "bottom",
            Direction::PosZ => "front",
            Direction::NegZ => "back",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UvQuad {
    pub bl: Vec2,
    pub tl: Vec2,
    pub tr: Vec2,
    pub br: Vec2,
}

impl UvQuad {
    /// Quad covering `min..max`, where `min` is the bottom-left corner.
    pub fn from_rect(min: Vec2, max: Vec2) -> Self {
        Self {
            bl: min,
            tl: Vec2::new(min.x, max.y),
            tr: max,
            br: Vec2::new(max.x, min.y),
        }
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [self.bl, self.tl, self.tr, self.br]
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureMap {
    pub right: UvQuad,
    pub left: UvQuad,
    pub top: UvQuad,
    pub bottom: UvQuad,
    pub front: UvQuad,
    pub back: UvQuad,
}

impl TextureMap {
    pub fn uniform(quad: UvQuad) -> Self {
        Self {
            right: quad,
            left: quad,
            top: quad,
            bottom: quad,
            front: quad,
            back: quad,
        }
    }

    pub fn face(&self, direction: Direction) -> &UvQuad {
        match direction {
            Direction::PosX => &self.right,
            Direction::NegX => &self.left,
            Direction::PosY => &self.top,
            Direction::NegY => &self.bottom,
            Direction::PosZ => &self.front,
            Direction::NegZ => &self.back,
        }
    }
}

pub trait TextureLookup {
    fn texture_map(&self, block: BlockCode) -> Option<&TextureMap>;
}

impl<T: TextureLookup + ?Sized> TextureLookup for &T {
    fn texture_map(&self, block: BlockCode) -> Option<&TextureMap> {
        (**self).texture_map(block)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtlasConfig {
    pub atlas: AtlasGrid,
    #[serde(default)]
    pub blocks: Vec<BlockTextureEntry>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AtlasGrid {
    pub tiles_per_row: u32,
    pub tiles_per_column: u32,
    /// Shrinks every tile rectangle by this fraction of a tile on each edge.
    #[serde(default)]
    pub inset: f32,
}

impl AtlasGrid {
    pub fn capacity(&self) -> u32 {
        self.tiles_per_row.saturating_mul(self.tiles_per_column)
    }

    /// UV rectangle of a tile slot. Slot 0 is the top-left tile of the image.
    pub fn tile_quad(&self, slot: u32) -> UvQuad {
        let col = (slot % self.tiles_per_row) as f32;
        let row = (slot / self.tiles_per_row) as f32;
        let tpr = self.tiles_per_row as f32;
        let tpc = self.tiles_per_column as f32;

        let u0 = (col + self.inset) / tpr;
        let u1 = (col + 1.0 - self.inset) / tpr;
        let v_top = 1.0 - (row + self.inset) / tpc;
        let v_bottom = 1.0 - (row + 1.0 - self.inset) / tpc;

        UvQuad::from_rect(Vec2::new(u0, v_bottom), Vec2::new(u1, v_top))
    }
}

/// Face keys win over `side` (horizontal faces only), which wins over `all`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockTextureEntry {
    pub code: u16,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub all: Option<u32>,
    #[serde(default)]
    pub side: Option<u32>,
    #[serde(default)]
    pub right: Option<u32>,
    #[serde(default)]
    pub left: Option<u32>,
    #[serde(default)]
    pub top: Option<u32>,
    #[serde(default)]
    pub bottom: Option<u32>,
    #[serde(default)]
    pub front: Option<u32>,
    #[serde(default)]
    pub back: Option<u32>,
}

impl BlockTextureEntry {
    fn tile_for(&self, direction: Direction) -> Option<u32> {
        let explicit = match direction {
            Direction::PosX => self.right,
            Direction::NegX => self.left,
            Direction::PosY => self.top,
            Direction::NegY => self.bottom,
            Direction::PosZ => self.front,
            Direction::NegZ => self.back,
        };
        explicit
            .or_else(|| self.side.filter(|_| direction.is_horizontal()))
            .or(self.all)
    }

    fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("'{name}' ({})", BlockCode(self.code)),
            None => BlockCode(self.code).to_string(),
        }
    }
}

#[derive(Debug)]
pub enum TextureConfigError {
    Parse(toml::de::Error),
    EmptyGrid,
    InvalidInset(f32),
    AirEntry,
    DuplicateBlock {
        block: String,
    },
    TileOutOfRange {
        block: String,
        face: Direction,
        tile: u32,
        capacity: u32,
    },
    MissingFace {
        block: String,
        face: Direction,
    },
}

impl fmt::Display for TextureConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(source) => write!(f, "failed to parse texture map: {source}"),
            Self::EmptyGrid => write!(f, "atlas grid must have at least one row and column"),
            Self::InvalidInset(inset) => {
                write!(f, "atlas inset {inset} must be within 0.0..0.5")
            }
            Self::AirEntry => write!(f, "block code 0 is air and cannot be textured"),
            Self::DuplicateBlock { block } => {
                write!(f, "block {block} has more than one texture entry")
            }
            Self::TileOutOfRange {
                block,
                face,
                tile,
                capacity,
            } => write!(
                f,
                "block {block} {face} face uses tile {tile}, atlas only has {capacity} tiles"
            ),
            Self::MissingFace { block, face } => {
                write!(f, "block {block} has no tile for its {face} face")
            }
        }
    }
}

impl std::error::Error for TextureConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(source) => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextureMapper {
    maps: FxHashMap<BlockCode, TextureMap>,
}

impl TextureMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: BlockCode, map: TextureMap) -> Option<TextureMap> {
        self.maps.insert(block, map)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, TextureConfigError> {
        let config: AtlasConfig = toml::from_str(source).map_err(TextureConfigError::Parse)?;
        Self::from_config(&config)
    }

    pub fn default_atlas() -> Result<Self, TextureConfigError> {
        Self::from_toml_str(DEFAULT_ATLAS_TOML)
    }

    pub fn from_config(config: &AtlasConfig) -> Result<Self, TextureConfigError> {
        let grid = config.atlas;
        if grid.tiles_per_row == 0 || grid.tiles_per_column == 0 {
            return Err(TextureConfigError::EmptyGrid);
        }
        if !(0.0..0.5).contains(&grid.inset) {
            return Err(TextureConfigError::InvalidInset(grid.inset));
        }

        let capacity = grid.capacity();
        let mut mapper = Self::new();
        for entry in &config.blocks {
            let block = BlockCode(entry.code);
            if block.is_air() {
                return Err(TextureConfigError::AirEntry);
            }
            if mapper.contains(block) {
                return Err(TextureConfigError::DuplicateBlock {
                    block: entry.label(),
                });
            }

            let mut quads = [UvQuad::default(); 6];
            for direction in Direction::ALL {
                let Some(tile) = entry.tile_for(direction) else {
                    return Err(TextureConfigError::MissingFace {
                        block: entry.label(),
                        face: direction,
                    });
                };
                if tile >= capacity {
                    return Err(TextureConfigError::TileOutOfRange {
                        block: entry.label(),
                        face: direction,
                        tile,
                        capacity,
                    });
                }
                quads[direction.index()] = grid.tile_quad(tile);
            }

            let [right, left, top, bottom, front, back] = quads;
            mapper.insert(
                block,
                TextureMap {
                    right,
                    left,
                    top,
                    bottom,
                    front,
                    back,
                },
            );
        }

        debug!(
            "texture map loaded: {} blocks on a {}x{} atlas",
            mapper.len(),
            grid.tiles_per_row,
            grid.tiles_per_column
        );
        Ok(mapper)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn contains(&self, block: BlockCode) -> bool {
        self.maps.contains_key(&block)
    }

    pub fn blocks(&self) -> Vec<BlockCode> {
        let mut blocks: Vec<BlockCode> = self.maps.keys().copied().collect();
        blocks.sort();
        blocks
    }
}

impl TextureLookup for TextureMapper {
    fn texture_map(&self, block: BlockCode) -> Option<&TextureMap> {
        self.maps.get(&block)
    }
}
