//! Resource cache: ingests resource pack / mod jar archives (in priority
//! order) into five merged maps the model resolver reads from.
//!
//! Later archives in the list win for textures, models, biome definitions,
//! and colormaps (matching vanilla's own pack-stacking order), but the
//! *first* archive to define a blockstate or biome id wins — this asymmetry
//! is a documented quirk of the merge, not a bug, and is reproduced here
//! deliberately rather than unified.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{info, warn};
use rayon::prelude::*;
use serde_json::Value as Json;

use crate::error::{Error, Result};

#[derive(Default)]
struct Merged {
    textures: HashMap<String, Vec<u8>>,
    blockstates: HashMap<String, Json>,
    models: HashMap<String, Json>,
    biomes: HashMap<String, Json>,
    colormaps: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
struct ArchiveContribution {
    textures: Vec<(String, Vec<u8>)>,
    blockstates: Vec<(String, Json)>,
    models: Vec<(String, Json)>,
    biomes: Vec<(String, Json)>,
    colormaps: Vec<(String, Vec<u8>)>,
}

pub struct ResourceCache {
    merged: Mutex<Merged>,
    archives: Vec<PathBuf>,
}

impl ResourceCache {
    /// Ingests every archive in `archives`, lowest priority first, using a
    /// rayon worker pool to decode each archive independently before merging
    /// under a single lock.
    pub fn initialize(archives: Vec<PathBuf>) -> Result<ResourceCache> {
        let cache = ResourceCache {
            merged: Mutex::new(Merged::default()),
            archives: archives.clone(),
        };

        let contributions: Vec<Result<ArchiveContribution>> =
            archives.par_iter().map(|path| read_archive(path)).collect();

        for (path, contribution) in archives.iter().zip(contributions) {
            match contribution {
                Ok(c) => cache.merge(c),
                Err(e) => warn!("skipping resource archive {path:?}: {e}"),
            }
        }

        info!(
            "resource cache ready: {} textures, {} blockstates, {} models",
            cache.merged.lock().unwrap().textures.len(),
            cache.merged.lock().unwrap().blockstates.len(),
            cache.merged.lock().unwrap().models.len(),
        );

        Ok(cache)
    }

    /// Re-ingests a single archive that changed on disk, applying the same
    /// merge rules as initial load. Intended for long-lived processes
    /// watching a resource pack directory.
    pub fn hot_reload(&mut self, path: &Path) -> Result<()> {
        let contribution = read_archive(path)?;
        self.merge(contribution);
        if !self.archives.iter().any(|p| p == path) {
            self.archives.push(path.to_path_buf());
        }
        Ok(())
    }

    fn merge(&self, c: ArchiveContribution) {
        let mut merged = self.merged.lock().unwrap();
        for (k, v) in c.blockstates {
            merged.blockstates.entry(k).or_insert(v);
        }
        for (k, v) in c.biomes {
            merged.biomes.entry(k).or_insert(v);
        }
        for (k, v) in c.textures {
            merged.textures.insert(k, v);
        }
        for (k, v) in c.models {
            merged.models.insert(k, v);
        }
        for (k, v) in c.colormaps {
            merged.colormaps.insert(k, v);
        }
    }

    pub fn texture(&self, key: &str) -> Option<Vec<u8>> {
        self.merged.lock().unwrap().textures.get(key).cloned()
    }

    pub fn blockstate(&self, key: &str) -> Option<Json> {
        self.merged.lock().unwrap().blockstates.get(key).cloned()
    }

    pub fn model(&self, key: &str) -> Option<Json> {
        self.merged.lock().unwrap().models.get(key).cloned()
    }

    pub fn colormap(&self, key: &str) -> Option<Vec<u8>> {
        self.merged.lock().unwrap().colormaps.get(key).cloned()
    }

    pub fn texture_count(&self) -> usize {
        self.merged.lock().unwrap().textures.len()
    }
}

fn read_archive(path: &Path) -> Result<ArchiveContribution> {
    let file = std::fs::File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut out = ArchiveContribution::default();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            continue;
        }

        if name.ends_with("colormap/grass.png") || name.ends_with("colormap/foliage.png") {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            let kind = if name.ends_with("grass.png") { "grass" } else { "foliage" };
            out.colormaps.push((kind.to_string(), bytes));
        } else if let Some(key) = strip(&name, "assets/", "/textures/", ".png") {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            out.textures.push((key, bytes));
        } else if let Some(key) = strip(&name, "assets/", "/blockstates/", ".json") {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            let json: Json = serde_json::from_str(&text).map_err(|source| Error::Json { key: name.clone(), source })?;
            out.blockstates.push((key, json));
        } else if let Some(key) = strip(&name, "assets/", "/models/", ".json") {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            let json: Json = serde_json::from_str(&text).map_err(|source| Error::Json { key: name.clone(), source })?;
            out.models.push((key, json));
        } else if let Some(key) = strip(&name, "data/", "/worldgen/biome/", ".json") {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            let json: Json = serde_json::from_str(&text).map_err(|source| Error::Json { key: name.clone(), source })?;
            out.biomes.push((key, json));
        }
    }

    Ok(out)
}

/// Turns `assets/minecraft/textures/block/stone.png` into
/// `minecraft:block/stone`, Minecraft's resource location convention.
fn strip(path: &str, prefix: &str, middle: &str, suffix: &str) -> Option<String> {
    let rest = path.strip_prefix(prefix)?;
    let (namespace, rest) = rest.split_once('/')?;
    let rest = rest.strip_prefix(middle.trim_matches('/'))?;
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let rest = rest.strip_suffix(suffix)?;
    Some(format!("{namespace}:{rest}"))
}

/// Detects the namespace a loose (non-archive) resource directory publishes
/// under, by probing the manifest files different mod loaders use.
pub fn detect_namespace(dir: &Path) -> Option<String> {
    let probes: &[(&str, fn(&str) -> Option<String>)] = &[
        ("version.json", |_| None),
        ("fabric.mod.json", parse_fabric_id),
        ("META-INF/mods.toml", parse_forge_id),
        ("META-INF/neoforge.mods.toml", parse_forge_id),
    ];
    for (file, parse) in probes {
        if let Ok(text) = std::fs::read_to_string(dir.join(file)) {
            if let Some(id) = parse(&text) {
                return Some(id);
            }
        }
    }
    None
}

fn parse_fabric_id(text: &str) -> Option<String> {
    let json: Json = serde_json::from_str(text).ok()?;
    json.get("id")?.as_str().map(str::to_string)
}

fn parse_forge_id(text: &str) -> Option<String> {
    text.lines()
        .find(|l| l.trim_start().starts_with("modId"))
        .and_then(|l| l.split('=').nth(1))
        .map(|v| v.trim().trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_texture_path_into_resource_location() {
        let key = strip("assets/minecraft/textures/block/stone.png", "assets/", "/textures/", ".png");
        assert_eq!(key, Some("minecraft:block/stone".to_string()));
    }

    #[test]
    fn strips_blockstate_path() {
        let key = strip("assets/minecraft/blockstates/oak_log.json", "assets/", "/blockstates/", ".json");
        assert_eq!(key, Some("minecraft:oak_log".to_string()));
    }

    #[test]
    fn rejects_unrelated_paths() {
        assert_eq!(strip("pack.mcmeta", "assets/", "/textures/", ".png"), None);
    }

    #[test]
    fn parses_fabric_mod_id() {
        let id = parse_fabric_id(r#"{"id": "examplemod", "version": "1.0"}"#);
        assert_eq!(id, Some("examplemod".to_string()));
    }
}
