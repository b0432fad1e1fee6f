//! Mesh merging and deduplication: combines per-block [`ModelData`] pieces
//! into one section (or whole-export) mesh, collapsing coincident vertices
//! and internal faces that would otherwise double up at block boundaries.

use std::collections::HashMap;

use crate::tex::geometry::ModelData;

/// Vertices within this distance of each other (in block units) are
/// considered the same point. 10^-4 is well under a texel's worth of
/// imprecision from element rotation but still separates distinct block
/// corners.
const GRID: f64 = 1.0e-4;

fn quantize(v: f64) -> i64 {
    (v / GRID).round() as i64
}

fn vertex_key(v: [f64; 3]) -> (i64, i64, i64) {
    (quantize(v[0]), quantize(v[1]), quantize(v[2]))
}

/// Appends `translation` to every vertex in `piece` and merges it into
/// `dst` in place, remapping material indices and deduplicating vertices
/// against what `dst` already has.
pub fn merge_translated(dst: &mut ModelData, mut piece: ModelData, translation: [f64; 3]) {
    for v in piece.vertices.iter_mut() {
        v[0] += translation[0];
        v[1] += translation[1];
        v[2] += translation[2];
    }
    merge_in_place(dst, piece);
}

/// Appends `src`'s geometry into `dst`, remapping vertex and material
/// indices so they refer to `dst`'s arrays, without touching coordinates.
pub fn merge_in_place(dst: &mut ModelData, src: ModelData) {
    let mut vertex_remap = vec![0u32; src.vertices.len()];
    let mut existing: HashMap<(i64, i64, i64), u32> = HashMap::new();
    for (i, v) in dst.vertices.iter().enumerate() {
        existing.entry(vertex_key(*v)).or_insert(i as u32);
    }

    for (i, v) in src.vertices.iter().enumerate() {
        let key = vertex_key(*v);
        let id = *existing.entry(key).or_insert_with(|| {
            dst.vertices.push(*v);
            (dst.vertices.len() - 1) as u32
        });
        vertex_remap[i] = id;
    }

    let uv_base = dst.uv_coordinates.len() as u32;
    dst.uv_coordinates.extend(src.uv_coordinates);

    let material_remap: Vec<u32> = src
        .material_names
        .iter()
        .zip(src.texture_paths.iter())
        .map(|(name, path)| dst.material_index(name, path))
        .collect();

    let quad_count = src.material_indices.len();
    for q in 0..quad_count {
        for k in 0..4 {
            let idx = q * 4 + k;
            dst.faces.push(vertex_remap[src.faces[idx] as usize]);
            dst.uv_faces.push(uv_base + src.uv_faces[idx]);
            dst.face_directions.push(src.face_directions[idx]);
        }
        dst.material_indices.push(material_remap[src.material_indices[q] as usize]);
        dst.face_names.push(src.face_names[q]);
    }
}

/// Removes internal faces: two quads are a coincident pair if they reference
/// the same four vertex positions (any order) and, in strict mode, the same
/// material. Both are dropped, since a visible exterior face never has a
/// match.
pub fn dedup_internal_faces(mesh: &mut ModelData, strict_material_match: bool) {
    let quad_count = mesh.quad_count();
    let mut keys: Vec<(Vec<u32>, Option<u32>)> = Vec::with_capacity(quad_count);
    for q in 0..quad_count {
        let mut verts: Vec<u32> = mesh.faces[q * 4..q * 4 + 4].to_vec();
        verts.sort_unstable();
        let mat = if strict_material_match {
            Some(mesh.material_indices[q])
        } else {
            None
        };
        keys.push((verts, mat));
    }

    let mut seen: HashMap<(Vec<u32>, Option<u32>), usize> = HashMap::new();
    let mut drop = vec![false; quad_count];
    for (q, key) in keys.iter().enumerate() {
        if let Some(&other) = seen.get(key) {
            drop[q] = true;
            drop[other] = true;
        } else {
            seen.insert(key.clone(), q);
        }
    }

    rebuild_without(mesh, &drop);
}

/// Removes the quads flagged in `drop` (one entry per quad), used by the
/// mesher to cut faces occluded by a solid neighbor.
pub fn drop_quads(mesh: &mut ModelData, drop: &[bool]) {
    rebuild_without(mesh, drop);
}

fn rebuild_without(mesh: &mut ModelData, drop: &[bool]) {
    let mut out = ModelData {
        vertices: mesh.vertices.clone(),
        uv_coordinates: mesh.uv_coordinates.clone(),
        material_names: mesh.material_names.clone(),
        texture_paths: mesh.texture_paths.clone(),
        ..ModelData::default()
    };

    for q in 0..mesh.quad_count() {
        if drop[q] {
            continue;
        }
        for k in 0..4 {
            out.faces.push(mesh.faces[q * 4 + k]);
            out.uv_faces.push(mesh.uv_faces[q * 4 + k]);
            out.face_directions.push(mesh.face_directions[q * 4 + k]);
        }
        out.material_indices.push(mesh.material_indices[q]);
        out.face_names.push(mesh.face_names[q]);
    }

    *mesh = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::geometry::{face_corners, uv_corners, CullDirection};

    fn cube(material: &str) -> ModelData {
        let mut mesh = ModelData::default();
        let mat = mesh.material_index(material, material);
        for dir in CullDirection::ALL {
            mesh.push_quad(
                face_corners(dir, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
                uv_corners([0.0, 0.0, 16.0, 16.0], 0),
                mat,
                CullDirection::None,
                dir,
            );
        }
        mesh
    }

    #[test]
    fn merge_translated_offsets_every_vertex() {
        let mut dst = ModelData::default();
        merge_translated(&mut dst, cube("stone"), [5.0, 0.0, 0.0]);
        assert!(dst.vertices.iter().all(|v| v[0] >= 5.0));
    }

    #[test]
    fn coincident_vertices_are_shared_after_merge() {
        let mut dst = cube("stone");
        merge_translated(&mut dst, cube("stone"), [1.0, 0.0, 0.0]);
        // the shared face at x=1 should not have doubled the vertex count
        assert!(dst.vertices.len() < 16, "expected shared vertices, got {}", dst.vertices.len());
    }

    #[test]
    fn dedup_removes_matching_internal_pair() {
        let mut mesh = ModelData::default();
        let mat = mesh.material_index("stone", "stone");
        let corners = face_corners(CullDirection::Up, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let uvs = uv_corners([0.0, 0.0, 16.0, 16.0], 0);
        mesh.push_quad(corners, uvs, mat, CullDirection::None, CullDirection::Up);
        let mut reversed = corners;
        reversed.reverse();
        mesh.push_quad(reversed, uvs, mat, CullDirection::None, CullDirection::Down);

        dedup_internal_faces(&mut mesh, true);
        assert_eq!(mesh.quad_count(), 0);
    }

    #[test]
    fn dedup_keeps_unmatched_faces() {
        let mut mesh = cube("stone");
        let before = mesh.quad_count();
        dedup_internal_faces(&mut mesh, true);
        assert_eq!(mesh.quad_count(), before);
    }
}
