//! Region file store: reads `.mca` region files, decompresses chunk NBT, and
//! decodes it into the section/heightmap/light caches the mesher walks.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::{GzDecoder, ZlibDecoder};
use log::{debug, warn};
use voxnbt::Value;

use crate::error::{Error, Result};
use crate::palette::BlockPaletteRegistry;
use crate::types::{BiomeId, ChunkCache, Heightmap, HeightMapCache, RegionCache, SectionCache, SectionCacheEntry};

const SECTOR_SIZE: usize = 4096;

/// Sentinel meaning "this cell's sky light has not been computed" (the
/// region's own section data only records it for sections below the
/// highest non-opaque column). [`RegionStore::promote_missing_sky_light`]
/// resolves the worst of these from a lit neighbor.
pub const SKY_LIGHT_UNKNOWN: i16 = -1;
/// A cell whose only lit neighbor was itself unresolved; documented
/// limitation, see `SPEC_FULL.md`'s Open Question on sky light.
pub const SKY_LIGHT_UNRESOLVED: i16 = -2;

pub struct RegionStore {
    world_dir: PathBuf,
    regions: RegionCache,
    chunks: ChunkCache,
    sections: SectionCache,
    heightmaps: HeightMapCache,
}

impl RegionStore {
    pub fn new(world_dir: impl Into<PathBuf>) -> RegionStore {
        RegionStore {
            world_dir: world_dir.into(),
            regions: HashMap::new(),
            chunks: HashMap::new(),
            sections: HashMap::new(),
            heightmaps: HashMap::new(),
        }
    }

    fn region_path(&self, rx: i32, rz: i32) -> PathBuf {
        self.world_dir.join(format!("r.{rx}.{rz}.mca"))
    }

    fn ensure_region(&mut self, rx: i32, rz: i32) -> Result<bool> {
        if self.regions.contains_key(&(rx, rz)) {
            return Ok(true);
        }
        let path = self.region_path(rx, rz);
        match std::fs::read(&path) {
            Ok(bytes) => {
                self.regions.insert((rx, rz), bytes);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("region {path:?} absent, treating as unloaded (air)");
                Ok(false)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Ensures chunk `(cx, cz)` (chunk coordinates, not block coordinates) is
    /// decoded into the section/heightmap caches. A missing region file or a
    /// not-yet-generated chunk slot is not an error: the chunk simply stays
    /// absent from the caches and reads resolve to air, per the failure
    /// model.
    pub fn load_chunk(&mut self, cx: i32, cz: i32, palette: &mut BlockPaletteRegistry) -> Result<()> {
        if self.chunks.contains_key(&(cx, cz)) {
            return Ok(());
        }

        let rx = cx.div_euclid(32);
        let rz = cz.div_euclid(32);
        if !self.ensure_region(rx, rz)? {
            return Ok(());
        }

        let region = &self.regions[&(rx, rz)];
        let local_x = cx.rem_euclid(32) as usize;
        let local_z = cz.rem_euclid(32) as usize;
        let header_idx = local_x + local_z * 32;
        let entry_off = header_idx * 4;
        if entry_off + 4 > region.len() {
            return Err(Error::MalformedRegion(format!("header truncated at entry {header_idx}")));
        }

        let entry = &region[entry_off..entry_off + 4];
        let sector_offset = ((entry[0] as usize) << 16) | ((entry[1] as usize) << 8) | entry[2] as usize;
        let sector_count = entry[3] as usize;
        if sector_offset == 0 && sector_count == 0 {
            // chunk not yet generated
            return Ok(());
        }

        let byte_offset = sector_offset * SECTOR_SIZE;
        if byte_offset + 5 > region.len() {
            warn!("chunk ({cx},{cz}) points past end of region file, skipping");
            return Ok(());
        }

        let mut header = &region[byte_offset..byte_offset + 5];
        let length = header.read_u32::<BigEndian>()? as usize;
        let compression = header.read_u8()?;
        let payload_start = byte_offset + 5;
        let payload_len = length.saturating_sub(1);
        if payload_start + payload_len > region.len() {
            warn!("chunk ({cx},{cz}) payload truncated, skipping");
            return Ok(());
        }
        let payload = &region[payload_start..payload_start + payload_len];

        let decompressed = match decompress(compression, payload) {
            Ok(d) => d,
            Err(e) => {
                warn!("chunk ({cx},{cz}) failed to decompress: {e}, skipping");
                return Ok(());
            }
        };

        let (_, root) = match voxnbt::from_bytes(&decompressed) {
            Ok(r) => r,
            Err(e) => {
                warn!("chunk ({cx},{cz}) has malformed NBT: {e}, skipping");
                return Ok(());
            }
        };

        self.decode_chunk(cx, cz, &root, palette)?;
        self.chunks.insert((cx, cz), root);
        Ok(())
    }

    fn decode_chunk(&mut self, cx: i32, cz: i32, root: &Value, palette: &mut BlockPaletteRegistry) -> Result<()> {
        let root_compound = root.as_compound()?;

        // 1.18+ flattened the "Level" wrapper away; fall back to it for
        // older saves that still nest everything under it.
        let level = root_compound.get("Level").and_then(|v| v.as_compound().ok());
        let get = |key: &str| -> Option<&Value> {
            level.and_then(|l| l.get(key)).or_else(|| root_compound.get(key))
        };

        if let Some(sections) = get("sections").and_then(|v| v.as_list().ok()) {
            for section in sections {
                if let Some(entry) = self.decode_section(section, palette)? {
                    self.sections.insert((cx, cz, entry.y), entry);
                }
            }
        }

        let mut maps = HashMap::new();
        if let Some(hm_compound) = get("Heightmaps").and_then(|v| v.as_compound().ok()) {
            for name in [
                "MOTION_BLOCKING",
                "MOTION_BLOCKING_NO_LEAVES",
                "OCEAN_FLOOR",
                "WORLD_SURFACE",
            ] {
                if let Some(longs) = hm_compound.get(name).and_then(|v| v.as_long_array().ok()) {
                    let values = crate::bits::unpack(longs, 9, 256);
                    maps.insert(
                        name.to_string(),
                        Heightmap {
                            values: values.into_iter().map(|v| v as i32).collect(),
                        },
                    );
                }
            }
        }
        self.heightmaps.insert((cx, cz), maps);

        Ok(())
    }

    fn decode_section(&self, section: &Value, palette: &mut BlockPaletteRegistry) -> Result<Option<SectionCacheEntry>> {
        let compound = match section.as_compound() {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };
        let y = compound
            .get("Y")
            .and_then(|v| v.as_byte().ok())
            .map(|b| b as i32)
            .ok_or_else(|| Error::MalformedRegion("section missing Y".into()))?;

        let mut entry = SectionCacheEntry::empty(y);

        if let Some(block_states) = compound.get("block_states").and_then(|v| v.as_compound().ok()) {
            let ids: Vec<u32> = match block_states.get("palette").and_then(|v| v.as_list().ok()) {
                Some(raw_palette) => raw_palette
                    .iter()
                    .map(|v| palette.register(&block_state_string(v)))
                    .collect(),
                None => vec![palette.register("minecraft:air")],
            };

            if ids.len() == 1 {
                entry.block_data = vec![ids[0]; 4096];
            } else if let Some(longs) = block_states.get("data").and_then(|v| v.as_long_array().ok()) {
                let bits = crate::bits::bits_for_block_palette(ids.len());
                let indices = crate::bits::unpack(longs, bits, 4096);
                entry.block_data = indices
                    .into_iter()
                    .map(|i| *ids.get(i as usize).unwrap_or(&0))
                    .collect();
            }
        }

        if let Some(biomes) = compound.get("biomes").and_then(|v| v.as_compound().ok()) {
            let ids: Vec<BiomeId> = match biomes.get("palette").and_then(|v| v.as_list().ok()) {
                Some(raw_palette) => raw_palette
                    .iter()
                    .filter_map(|v| v.as_str().ok())
                    .map(biome_hash)
                    .collect(),
                None => vec![0],
            };
            if ids.len() == 1 {
                entry.biome_data = vec![ids[0]; 64];
            } else if let Some(longs) = biomes.get("data").and_then(|v| v.as_long_array().ok()) {
                let bits = crate::bits::bits_for_biome_palette(ids.len());
                let indices = crate::bits::unpack(longs, bits, 64);
                entry.biome_data = indices
                    .into_iter()
                    .map(|i| *ids.get(i as usize).unwrap_or(&0))
                    .collect();
            }
        }

        if let Some(bytes) = compound.get("SkyLight").and_then(|v| v.as_byte_array().ok()) {
            entry.sky_light = expand_nibbles(bytes);
        }
        if let Some(bytes) = compound.get("BlockLight").and_then(|v| v.as_byte_array().ok()) {
            entry.block_light = expand_nibbles(bytes).into_iter().map(|v| v.max(0)).collect();
        }

        Ok(Some(entry))
    }

    pub fn get_block_id(&self, x: i32, y: i32, z: i32) -> Option<crate::types::BlockId> {
        let (cx, cz, sy, lx, ly, lz) = local_coords(x, y, z);
        let section = self.sections.get(&(cx, cz, sy))?;
        Some(section.block_data[SectionCacheEntry::block_index(lx, ly, lz)])
    }

    pub fn get_biome_id(&self, x: i32, y: i32, z: i32) -> Option<BiomeId> {
        let (cx, cz, sy, lx, ly, lz) = local_coords(x, y, z);
        let section = self.sections.get(&(cx, cz, sy))?;
        Some(section.biome_data[SectionCacheEntry::biome_index(lx, ly, lz)])
    }

    pub fn get_sky_light(&self, x: i32, y: i32, z: i32) -> i16 {
        let (cx, cz, sy, lx, ly, lz) = local_coords(x, y, z);
        self.sections
            .get(&(cx, cz, sy))
            .map(|s| s.sky_light[SectionCacheEntry::block_index(lx, ly, lz)])
            .unwrap_or(SKY_LIGHT_UNKNOWN)
    }

    pub fn get_block_light(&self, x: i32, y: i32, z: i32) -> i16 {
        let (cx, cz, sy, lx, ly, lz) = local_coords(x, y, z);
        self.sections
            .get(&(cx, cz, sy))
            .map(|s| s.block_light[SectionCacheEntry::block_index(lx, ly, lz)])
            .unwrap_or(0)
    }

    pub fn get_height(&self, kind: &str, x: i32, z: i32) -> Option<i32> {
        let cx = x.div_euclid(16);
        let cz = z.div_euclid(16);
        let lx = x.rem_euclid(16) as usize;
        let lz = z.rem_euclid(16) as usize;
        self.heightmaps
            .get(&(cx, cz))
            .and_then(|m| m.get(kind))
            .map(|h| h.values[lz * 16 + lx])
    }

    /// Promotes a section whose sky light was never recorded (the whole
    /// 4096-cell array reads as the singleton [`SKY_LIGHT_UNKNOWN`]) to
    /// [`SKY_LIGHT_UNRESOLVED`], but only when at least one of its six
    /// axis-adjacent sections (the chunks either side in x/z, and the
    /// sections above/below in the same column) actually has recorded light.
    /// A section with no lit neighbor at all is left alone. This never
    /// copies a real light value into an unresolved section, it only
    /// upgrades "absent" to "absent, but known to be near something lit".
    pub fn promote_missing_sky_light(&mut self) {
        let keys: Vec<(i32, i32, i32)> = self.sections.keys().copied().collect();

        let to_promote: Vec<(i32, i32, i32)> = keys
            .iter()
            .copied()
            .filter(|&(cx, cz, sy)| {
                let section = &self.sections[&(cx, cz, sy)];
                if !is_sky_light_unrecorded(section) {
                    return false;
                }
                let neighbors = [
                    (cx + 1, cz, sy),
                    (cx - 1, cz, sy),
                    (cx, cz + 1, sy),
                    (cx, cz - 1, sy),
                    (cx, cz, sy + 1),
                    (cx, cz, sy - 1),
                ];
                neighbors
                    .iter()
                    .any(|key| self.sections.get(key).is_some_and(|n| !is_sky_light_unrecorded(n)))
            })
            .collect();

        for key in to_promote {
            if let Some(section) = self.sections.get_mut(&key) {
                section.sky_light.iter_mut().for_each(|v| *v = SKY_LIGHT_UNRESOLVED);
            }
        }
    }
}

/// A section "has no recorded sky light" when every cell still holds the
/// as-decoded [`SKY_LIGHT_UNKNOWN`] singleton, i.e. nothing has ever
/// overwritten it with either a real value or [`SKY_LIGHT_UNRESOLVED`].
fn is_sky_light_unrecorded(section: &SectionCacheEntry) -> bool {
    section.sky_light.iter().all(|&v| v == SKY_LIGHT_UNKNOWN)
}

fn local_coords(x: i32, y: i32, z: i32) -> (i32, i32, i32, usize, usize, usize) {
    (
        x.div_euclid(16),
        z.div_euclid(16),
        y.div_euclid(16),
        x.rem_euclid(16) as usize,
        y.rem_euclid(16) as usize,
        z.rem_euclid(16) as usize,
    )
}

fn block_state_string(entry: &Value) -> String {
    let compound = match entry.as_compound() {
        Ok(c) => c,
        Err(_) => return "minecraft:air".to_string(),
    };
    let name = compound.get("Name").and_then(|v| v.as_str().ok()).unwrap_or("minecraft:air");
    let props = compound.get("Properties").and_then(|v| v.as_compound().ok());
    match props {
        Some(p) if !p.is_empty() => {
            let mut pairs: Vec<String> = p
                .iter()
                .filter_map(|(k, v)| v.as_str().ok().map(|v| format!("{k}={v}")))
                .collect();
            pairs.sort();
            format!("{name}[{}]", pairs.join(","))
        }
        _ => name.to_string(),
    }
}

/// Biomes are namespaced strings in NBT (`minecraft:plains`) rather than the
/// small integer ids pre-1.18 saves used; we hash the string into a stable
/// id local to this run instead of carrying a full vanilla biome enum, since
/// the mesher only uses biome ids to key the colormap sampler.
fn biome_hash(name: &str) -> BiomeId {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    name.hash(&mut hasher);
    hasher.finish() as u32
}

fn expand_nibbles(bytes: &[i8]) -> Vec<i16> {
    let mut out = Vec::with_capacity(bytes.len() * 2);
    for &b in bytes {
        let b = b as u8;
        out.push((b & 0x0F) as i16);
        out.push((b >> 4) as i16);
    }
    out
}

fn decompress(compression: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match compression {
        1 => {
            GzDecoder::new(payload).read_to_end(&mut out)?;
        }
        2 => {
            ZlibDecoder::new(payload).read_to_end(&mut out)?;
        }
        3 => out.extend_from_slice(payload),
        other => return Err(Error::MalformedRegion(format!("unknown compression tag {other}"))),
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_nibbles_low_then_high() {
        let bytes = [0x21i8]; // low nibble 1, high nibble 2
        assert_eq!(expand_nibbles(&bytes), vec![1, 2]);
    }

    #[test]
    fn local_coords_wraps_negative_chunk_coordinates() {
        let (cx, cz, sy, lx, ly, lz) = local_coords(-1, -1, -1);
        assert_eq!((cx, cz, sy), (-1, -1, -1));
        assert_eq!((lx, ly, lz), (15, 15, 15));
    }

    #[test]
    fn block_state_string_with_no_properties() {
        let root = voxnbt::from_bytes(&encode_named_state("minecraft:stone", &[])).unwrap().1;
        assert_eq!(block_state_string(&root), "minecraft:stone");
    }

    fn store_with_sections(sections: &[(i32, i32, i32)], recorded: bool) -> RegionStore {
        let mut store = RegionStore::new("/tmp/unused");
        for &(cx, cz, sy) in sections {
            let mut section = SectionCacheEntry::empty(sy);
            if recorded {
                section.sky_light = vec![15; 4096];
            }
            store.sections.insert((cx, cz, sy), section);
        }
        store
    }

    #[test]
    fn promotes_unrecorded_section_next_to_a_lit_one() {
        let mut store = store_with_sections(&[(0, 0, 0)], true);
        store.sections.insert((0, 0, 1), SectionCacheEntry::empty(1));
        store.promote_missing_sky_light();
        assert!(store.sections[&(0, 0, 1)].sky_light.iter().all(|&v| v == SKY_LIGHT_UNRESOLVED));
        assert!(store.sections[&(0, 0, 0)].sky_light.iter().all(|&v| v == 15));
    }

    #[test]
    fn leaves_an_isolated_unrecorded_section_untouched() {
        let mut store = store_with_sections(&[(5, 5, 0)], false);
        store.promote_missing_sky_light();
        assert!(store.sections[&(5, 5, 0)].sky_light.iter().all(|&v| v == SKY_LIGHT_UNKNOWN));
    }

    #[test]
    fn checks_all_six_axis_neighbors_not_just_above() {
        let mut store = store_with_sections(&[(0, 0, 0)], false);
        store.sections.insert((1, 0, 0), {
            let mut s = SectionCacheEntry::empty(0);
            s.sky_light = vec![15; 4096];
            s
        });
        store.promote_missing_sky_light();
        assert!(store.sections[&(0, 0, 0)].sky_light.iter().all(|&v| v == SKY_LIGHT_UNRESOLVED));
    }

    fn encode_named_state(name: &str, props: &[(&str, &str)]) -> Vec<u8> {
        // Minimal compound: {Name: String, Properties: Compound{...}}
        let mut buf = vec![10u8, 0, 0]; // TAG_Compound, empty root name
        buf.push(8); // TAG_String
        buf.extend((4u16).to_be_bytes());
        buf.extend(b"Name");
        buf.extend((name.len() as u16).to_be_bytes());
        buf.extend(name.as_bytes());
        if !props.is_empty() {
            buf.push(10);
            buf.extend((10u16).to_be_bytes());
            buf.extend(b"Properties");
            for (k, v) in props {
                buf.push(8);
                buf.extend((k.len() as u16).to_be_bytes());
                buf.extend(k.as_bytes());
                buf.extend((v.len() as u16).to_be_bytes());
                buf.extend(v.as_bytes());
            }
            buf.push(0);
        }
        buf.push(0);
        buf
    }
}
