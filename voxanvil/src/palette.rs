//! The global block palette registry: maps the canonical name of a block
//! state to a stable, append-only integer id shared across every region.

use std::collections::{HashMap, HashSet};

use crate::ident::ParsedState;
use crate::types::{Block, BlockId};

const FLUID_PREFIXES: &[&str] = &["minecraft:water", "minecraft:lava"];

/// Base ids treated as solid (full opaque cube, for face-culling purposes)
/// when the caller doesn't supply its own table. Deliberately small: most of
/// the interesting non-solid cases (stairs, slabs, fences, panes, leaves,
/// carpets, doors, signs, ...) are the caller's job to list, since vanilla's
/// own set runs into the hundreds and changes every version.
const DEFAULT_SOLID_IDS: &[&str] = &[
    "minecraft:stone",
    "minecraft:dirt",
    "minecraft:grass_block",
    "minecraft:cobblestone",
    "minecraft:bedrock",
    "minecraft:sand",
    "minecraft:gravel",
    "minecraft:sandstone",
    "minecraft:oak_planks",
    "minecraft:oak_log",
];

pub struct BlockPaletteRegistry {
    blocks: Vec<Block>,
    by_canonical: HashMap<String, BlockId>,
    solid_ids: HashSet<String>,
}

impl Default for BlockPaletteRegistry {
    fn default() -> Self {
        let mut reg = BlockPaletteRegistry {
            blocks: Vec::new(),
            by_canonical: HashMap::new(),
            solid_ids: DEFAULT_SOLID_IDS.iter().map(|s| s.to_string()).collect(),
        };
        let air = Block::air();
        reg.by_canonical.insert(air.canonical.clone(), 0);
        reg.blocks.push(air);
        reg
    }
}

impl BlockPaletteRegistry {
    pub fn new() -> BlockPaletteRegistry {
        BlockPaletteRegistry::default()
    }

    /// Replaces the solid-id lookup used to classify newly registered
    /// blocks. A base id (`namespace:path`, properties ignored) absent from
    /// this set is non-solid: its neighbors' faces are meshed regardless of
    /// whether this block itself turns out to produce any geometry.
    pub fn with_solid_set(mut self, solid_ids: HashSet<String>) -> BlockPaletteRegistry {
        self.solid_ids = solid_ids;
        self
    }

    /// Registers a raw `namespace:id[k=v,...]` state string (as read from a
    /// section's palette NBT list) and returns its global id, reusing an
    /// existing entry when the canonicalized name already exists.
    pub fn register(&mut self, raw_state: &str) -> BlockId {
        let parsed = ParsedState::parse(raw_state);
        let canonical = parsed.canonical_name();

        if let Some(&id) = self.by_canonical.get(&canonical) {
            return id;
        }

        let level = fluid_level(&parsed);
        let base_id = format!("{}:{}", parsed.namespace, parsed.id);
        let block = Block {
            canonical: canonical.clone(),
            air: canonical == "minecraft:air" || canonical == "minecraft:cave_air" || canonical == "minecraft:void_air",
            level,
            solid: self.solid_ids.contains(&base_id),
        };

        let id = self.blocks.len() as BlockId;
        self.blocks.push(block);
        self.by_canonical.insert(canonical, id);
        id
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id as usize)
    }

    pub fn lookup(&self, canonical: &str) -> Option<BlockId> {
        self.by_canonical.get(canonical).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn fluid_level(parsed: &ParsedState) -> Option<u8> {
    let qualified = format!("{}:{}", parsed.namespace, parsed.id);
    if !FLUID_PREFIXES.iter().any(|p| qualified.starts_with(p)) {
        return None;
    }
    match parsed.properties.get("level").and_then(|v| v.parse::<u8>().ok()) {
        Some(l) => Some(l),
        None => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_is_pre_registered_as_zero() {
        let reg = BlockPaletteRegistry::new();
        assert_eq!(reg.lookup("minecraft:air"), Some(0));
        assert!(reg.get(0).unwrap().air);
    }

    #[test]
    fn dedupes_equivalent_states_regardless_of_property_order() {
        let mut reg = BlockPaletteRegistry::new();
        let a = reg.register("minecraft:fence[east=true,north=false,west=true]");
        let b = reg.register("minecraft:fence[west=true,east=true,north=false]");
        assert_eq!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn waterlogged_is_stripped_from_the_canonical_name() {
        let mut reg = BlockPaletteRegistry::new();
        let dry = reg.register("minecraft:oak_fence[waterlogged=false]");
        let wet = reg.register("minecraft:oak_fence[waterlogged=true]");
        assert_eq!(dry, wet, "waterlogged must not fragment the palette");
    }

    #[test]
    fn parses_fluid_level() {
        let mut reg = BlockPaletteRegistry::new();
        let id = reg.register("minecraft:water[level=3]");
        assert_eq!(reg.get(id).unwrap().level, Some(3));
    }

    #[test]
    fn non_fluid_blocks_have_no_level() {
        let mut reg = BlockPaletteRegistry::new();
        let id = reg.register("minecraft:stone");
        assert_eq!(reg.get(id).unwrap().level, None);
    }

    #[test]
    fn blocks_outside_the_solid_set_are_not_solid() {
        let mut reg = BlockPaletteRegistry::new();
        let stairs = reg.register("minecraft:oak_stairs[facing=north,half=bottom,shape=straight]");
        assert!(!reg.get(stairs).unwrap().solid, "a non-full-cube block must not default to solid");

        let stone = reg.register("minecraft:stone");
        assert!(reg.get(stone).unwrap().solid);
    }

    #[test]
    fn custom_solid_set_overrides_the_default() {
        let mut reg = BlockPaletteRegistry::new().with_solid_set(HashSet::from(["minecraft:glass".to_string()]));
        let glass = reg.register("minecraft:glass");
        let stone = reg.register("minecraft:stone");
        assert!(reg.get(glass).unwrap().solid);
        assert!(!reg.get(stone).unwrap().solid, "the default table must not leak through once overridden");
    }
}
