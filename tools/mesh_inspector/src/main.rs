use std::env;
use std::fs;
use std::path::PathBuf;

use quarry_mesher::{Chunk, MeshStats, RebuildScheduler, SharedMesh};
use quarry_shared::block::BlockCode;
use quarry_shared::chunk::ChunkVolume;
use quarry_shared::coords::ChunkPos;
use quarry_shared::texture::{Direction, TextureMapper};
use quarry_shared::volume::ChunkStore;
use quarry_shared::worldgen::TerrainGenerator;
use tracing::{debug, info};

const DEFAULT_SEED: u64 = 0xC0FFEE;
const USAGE: &str = "Usage: mesh_inspector [--chunk <file>] [--textures <file.toml>] \
[--seed <u64>] [--at <x>,<z>] [--radius <n>] [--threads <n>]";

#[derive(Debug)]
struct InspectorConfig {
    chunk_path: Option<PathBuf>,
    textures_path: Option<PathBuf>,
    seed: u64,
    center: ChunkPos,
    radius: i32,
    threads: Option<usize>,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            chunk_path: None,
            textures_path: None,
            seed: DEFAULT_SEED,
            center: ChunkPos::default(),
            radius: 1,
            threads: None,
        }
    }
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let config = match parse_args(env::args().skip(1)) {
        Ok(Some(config)) => config,
        Ok(None) => {
            println!("{USAGE}");
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&config) {
        eprintln!("mesh_inspector error: {err}");
        std::process::exit(1);
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<InspectorConfig>, String> {
    let mut config = InspectorConfig::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--chunk" => {
                config.chunk_path = Some(PathBuf::from(expect_value(&mut args, &arg)?));
            }
            "--textures" => {
                config.textures_path = Some(PathBuf::from(expect_value(&mut args, &arg)?));
            }
            "--seed" => {
                let value = expect_value(&mut args, &arg)?;
                config.seed = value
                    .parse::<u64>()
                    .map_err(|err| format!("invalid seed '{value}': {err}"))?;
            }
            "--at" => {
                let value = expect_value(&mut args, &arg)?;
                config.center = parse_chunk_pos(&value)?;
            }
            "--radius" => {
                let value = expect_value(&mut args, &arg)?;
                config.radius = value
                    .parse::<i32>()
                    .ok()
                    .filter(|radius| *radius >= 0)
                    .ok_or_else(|| format!("invalid radius '{value}'"))?;
            }
            "--threads" => {
                let value = expect_value(&mut args, &arg)?;
                let threads = value
                    .parse::<usize>()
                    .ok()
                    .filter(|threads| *threads > 0)
                    .ok_or_else(|| format!("invalid thread count '{value}'"))?;
                config.threads = Some(threads);
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Some(config))
}

fn expect_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} expects a value"))
}

fn parse_chunk_pos(value: &str) -> Result<ChunkPos, String> {
    let (x, z) = value
        .split_once(',')
        .ok_or_else(|| format!("expected <x>,<z>, got '{value}'"))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|err| format!("invalid chunk x '{x}': {err}"))?;
    let z = z
        .trim()
        .parse::<i32>()
        .map_err(|err| format!("invalid chunk z '{z}': {err}"))?;
    Ok(ChunkPos::new(x, z))
}

fn load_textures(config: &InspectorConfig) -> Result<TextureMapper, String> {
    match &config.textures_path {
        Some(path) => {
            let source = fs::read_to_string(path)
                .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
            TextureMapper::from_toml_str(&source)
                .map_err(|err| format!("failed to load {}: {err}", path.display()))
        }
        None => TextureMapper::default_atlas().map_err(|err| err.to_string()),
    }
}

fn load_store(config: &InspectorConfig) -> Result<ChunkStore, String> {
    let mut store = ChunkStore::new();

    if let Some(path) = &config.chunk_path {
        let bytes =
            fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
        let volume = ChunkVolume::decode(&bytes)
            .map_err(|err| format!("failed to load {}: {err}", path.display()))?;
        info!(
            "loaded {} ({} solid blocks) at chunk ({}, {})",
            path.display(),
            volume.solid_count(),
            config.center.x,
            config.center.z
        );
        store.insert(config.center, volume);
        return Ok(store);
    }

    let generator = TerrainGenerator::new(config.seed);
    for dz in -config.radius..=config.radius {
        for dx in -config.radius..=config.radius {
            let pos = config.center + ChunkPos::new(dx, dz);
            store.insert(pos, generator.generate_chunk(pos));
        }
    }
    info!(
        "generated {} chunks around ({}, {}) with seed {}",
        store.len(),
        config.center.x,
        config.center.z,
        config.seed
    );
    Ok(store)
}

fn run(config: &InspectorConfig) -> Result<(), String> {
    let textures = load_textures(config)?;
    let store = load_store(config)?;
    for block in unreferenced_textures(&store, &textures) {
        debug!("texture map entry for block {} is never referenced", block);
    }

    let scheduler = RebuildScheduler::new(config.threads)
        .map_err(|err| format!("failed to start mesh workers: {err}"))?;
    let mut chunks: Vec<Chunk<SharedMesh>> = store
        .positions()
        .into_iter()
        .map(|pos| Chunk::with_position(pos, SharedMesh::new()))
        .collect();

    let results = scheduler.rebuild_store(&mut chunks, &store, &textures);

    let mut total = MeshStats::default();
    for (chunk, (pos, result)) in chunks.iter().zip(results) {
        let stats = result.map_err(|err| err.to_string())?;
        chunk.mesh().validate().map_err(|err| {
            format!("chunk ({}, {}) produced invalid buffers: {err}", pos.x, pos.z)
        })?;

        println!(
            "chunk ({:>4}, {:>4}) origin {:?}: {:>6} vertices {:>6} indices | {}",
            pos.x,
            pos.z,
            chunk.sink().origin().to_array(),
            chunk.mesh().vertices.len(),
            chunk.mesh().triangles.len(),
            format_faces(&stats)
        );
        for direction in Direction::ALL {
            total.faces_per_direction[direction.index()] += stats.faces(direction);
        }
        total.solid_blocks += stats.solid_blocks;
    }

    println!(
        "total: {} chunks, {} solid blocks, {} faces | {}",
        chunks.len(),
        total.solid_blocks,
        total.face_count(),
        format_faces(&total)
    );
    Ok(())
}

fn unreferenced_textures(store: &ChunkStore, textures: &TextureMapper) -> Vec<BlockCode> {
    textures
        .blocks()
        .into_iter()
        .filter(|block| {
            !store
                .positions()
                .into_iter()
                .filter_map(|pos| store.get(pos))
                .any(|volume| volume.blocks.contains(block))
        })
        .collect()
}

fn format_faces(stats: &MeshStats) -> String {
    Direction::ALL
        .iter()
        .map(|direction| format!("{direction} {}", stats.faces(*direction)))
        .collect::<Vec<_>>()
        .join(", ")
}
