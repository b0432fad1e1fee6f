//! Chunk mesher: walks a region's blocks and assembles the merged,
//! face-culled mesh for export.

use log::debug;

use crate::error::Result;
use crate::mesh::merge_translated;
use crate::palette::BlockPaletteRegistry;
use crate::region::RegionStore;
use crate::tex::geometry::{CullDirection, ModelData};
use crate::tex::ModelResolver;

/// Inclusive block-coordinate bounding box to export.
#[derive(Debug, Clone, Copy)]
pub struct ExportBounds {
    pub min: (i32, i32, i32),
    pub max: (i32, i32, i32),
}

pub struct ChunkMesher<'a> {
    regions: &'a mut RegionStore,
    palette: &'a mut BlockPaletteRegistry,
    resolver: &'a ModelResolver<'a>,
}

impl<'a> ChunkMesher<'a> {
    pub fn new(regions: &'a mut RegionStore, palette: &'a mut BlockPaletteRegistry, resolver: &'a ModelResolver<'a>) -> ChunkMesher<'a> {
        ChunkMesher { regions, palette, resolver }
    }

    /// Loads every chunk touching `bounds` and meshes all non-air,
    /// non-culled blocks within it into a single [`ModelData`].
    pub fn mesh_region(&mut self, bounds: ExportBounds) -> Result<ModelData> {
        let (min_x, min_y, min_z) = bounds.min;
        let (max_x, max_y, max_z) = bounds.max;

        let min_cx = min_x.div_euclid(16);
        let max_cx = max_x.div_euclid(16);
        let min_cz = min_z.div_euclid(16);
        let max_cz = max_z.div_euclid(16);

        for cz in min_cz..=max_cz {
            for cx in min_cx..=max_cx {
                self.regions.load_chunk(cx, cz, self.palette)?;
            }
        }
        self.regions.promote_missing_sky_light();

        let mut mesh = ModelData::default();
        let mut meshed = 0usize;

        for y in min_y..=max_y {
            for z in min_z..=max_z {
                for x in min_x..=max_x {
                    if self.should_skip(x, y, z, min_y) {
                        continue;
                    }
                    if let Some(piece) = self.mesh_block(x, y, z)? {
                        merge_translated(&mut mesh, piece, [x as f64, y as f64, z as f64]);
                        meshed += 1;
                    }
                }
            }
        }

        debug!("meshed {meshed} blocks into {} quads", mesh.quad_count());
        Ok(mesh)
    }

    fn should_skip(&self, x: i32, y: i32, z: i32, min_y: i32) -> bool {
        let id = match self.regions.get_block_id(x, y, z) {
            Some(id) => id,
            None => return true, // ungenerated chunk: treat as air
        };
        let block = match self.palette.get(id) {
            Some(b) => b,
            None => return true,
        };
        if block.air {
            return true;
        }

        // A column's heightmap gives an upper bound on anything solid; skip
        // cells strictly above it to avoid meshing floating light artifacts
        // from malformed saves.
        if let Some(height) = self.regions.get_height("WORLD_SURFACE", x, z) {
            if y > height && y > min_y {
                return true;
            }
        }
        false
    }

    fn mesh_block(&self, x: i32, y: i32, z: i32) -> Result<Option<ModelData>> {
        let id = self.regions.get_block_id(x, y, z).unwrap_or(0);
        let block = match self.palette.get(id) {
            Some(b) => b,
            None => return Ok(None),
        };

        let mut piece = self.resolver.resolve(&block.canonical)?;
        if piece.is_empty() {
            return Ok(None);
        }

        self.cull_occluded_faces(&mut piece, x, y, z);
        if piece.is_empty() {
            return Ok(None);
        }
        Ok(Some(piece))
    }

    /// Drops quads whose `cullface` direction points at a neighbor that is
    /// itself a full, non-air block, matching vanilla's face culling.
    fn cull_occluded_faces(&self, mesh: &mut ModelData, x: i32, y: i32, z: i32) {
        let quad_count = mesh.quad_count();
        let mut drop = vec![false; quad_count];
        for q in 0..quad_count {
            let dir = mesh.face_directions[q * 4];
            if dir == CullDirection::None {
                continue;
            }
            let (dx, dy, dz) = dir.offset();
            if self.neighbor_is_opaque(x + dx, y + dy, z + dz) {
                drop[q] = true;
            }
        }
        if drop.iter().any(|d| *d) {
            crate::mesh::drop_quads(mesh, &drop);
        }
    }

    /// A neighbor culls the face pointed at it only when it's in the
    /// caller-supplied solid set; an unlisted block (stairs, slabs, fences,
    /// glass panes, leaves, ...) is treated as non-solid for culling even
    /// though it may still produce its own geometry.
    fn neighbor_is_opaque(&self, x: i32, y: i32, z: i32) -> bool {
        let id = match self.regions.get_block_id(x, y, z) {
            Some(id) => id,
            None => return false,
        };
        match self.palette.get(id) {
            Some(b) => b.solid,
            None => false,
        }
    }
}
