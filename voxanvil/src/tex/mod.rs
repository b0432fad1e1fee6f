//! Model resolver: turns a block's blockstate into a renderable mesh by
//! walking the blockstate -> model -> parent chain vanilla's client does,
//! minus anything that needs a live OpenGL context (ambient occlusion
//! baking, animated textures).

pub mod geometry;
pub mod model;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use log::warn;
use rand::Rng;

use crate::error::Result;
use crate::ident::{qualify, ParsedState};
use crate::resources::ResourceCache;
use geometry::{default_uv, face_corners, uv_corners, CullDirection, ModelData};
use model::{BlockModelJson, BlockstateJson, ElementJson, ModelRef};

const MAX_TEXTURE_VAR_DEPTH: usize = 16;

/// A model-JSON parent chain, fully merged: the texture-variable table and
/// the element list it ultimately resolves to (or `None` if the chain never
/// names any elements, e.g. a pure texture-only builtin parent).
type ResolvedChain = (HashMap<String, String>, Option<Vec<ElementJson>>);

pub struct ModelResolver<'a> {
    resources: &'a ResourceCache,
    /// Caches Stage B (parent-chain merge) only, keyed by qualified model
    /// path. Stage A's weighted-random variant pick and Stage C/D's element
    /// instantiation are *not* cached here: two blocks sharing a state may
    /// legitimately land on different variants, so each call to [`resolve`]
    /// re-rolls and re-instantiates independently.
    chain_memo: Mutex<HashMap<String, ResolvedChain>>,
}

impl<'a> ModelResolver<'a> {
    pub fn new(resources: &'a ResourceCache) -> ModelResolver<'a> {
        ModelResolver {
            resources,
            chain_memo: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the visual mesh for a block's canonical state string, e.g.
    /// `minecraft:oak_stairs[facing=north,half=bottom,shape=straight]`.
    /// Re-runs variant selection and element instantiation on every call;
    /// only the merged model JSON each variant ultimately points at is
    /// shared across calls.
    pub fn resolve(&self, canonical: &str) -> Result<ModelData> {
        let parsed = ParsedState::parse(canonical);

        if let Some(mesh) = self.special_case(&parsed) {
            return Ok(mesh);
        }

        let state_key = format!("{}:{}", parsed.namespace, parsed.id);
        let blockstate_json = match self.resources.blockstate(&state_key) {
            Some(j) => j,
            None => {
                warn!("no blockstate for {state_key}, emitting empty mesh");
                return Ok(ModelData::default());
            }
        };

        let blockstate: BlockstateJson = match serde_json::from_value(blockstate_json) {
            Ok(b) => b,
            Err(e) => {
                warn!("malformed blockstate {state_key}: {e}");
                return Ok(ModelData::default());
            }
        };

        let props = parsed.visual_properties();
        let refs = match &blockstate {
            BlockstateJson::Variants { variants } => {
                let props_key = parsed.sorted_props_key();
                let entry = variants
                    .get(&props_key)
                    .or_else(|| variants.get(""))
                    .or_else(|| variants.values().next());
                match entry {
                    Some(e) => vec![pick_weighted(e.options())],
                    None => vec![],
                }
            }
            BlockstateJson::Multipart { multipart } => multipart
                .iter()
                .filter(|case| case.when.as_ref().map_or(true, |w| w.matches(&props)))
                .map(|case| pick_weighted(case.apply.options()))
                .collect(),
        };

        let mut mesh = ModelData::default();
        for model_ref in refs {
            let mut visited = HashSet::new();
            let piece = self.build_model(model_ref, &mut visited)?;
            merge_into(&mut mesh, piece);
        }
        Ok(mesh)
    }

    /// Stage F fallbacks that bypass the ordinary blockstate resolution.
    fn special_case(&self, parsed: &ParsedState) -> Option<ModelData> {
        let full = format!("{}:{}", parsed.namespace, parsed.id);
        match full.as_str() {
            "minecraft:water" | "minecraft:flowing_water" => Some(ModelData::default()),
            "minecraft:light" => {
                let level = parsed.properties.get("level").and_then(|v| v.parse::<u8>().ok()).unwrap_or(0);
                Some(light_block_mesh(level))
            }
            _ => None,
        }
    }

    fn build_model(&self, model_ref: ModelRef, visited: &mut HashSet<String>) -> Result<ModelData> {
        let key = qualify(&model_ref.model);
        let (textures, elements) = self.resolve_chain(&key, visited)?;
        let elements = match elements {
            Some(e) => e,
            None => return Ok(ModelData::default()),
        };

        let mut quads: Vec<Quad> = Vec::new();
        for element in &elements {
            let mut element_quads = instantiate_element(element, &textures, model_ref.x, model_ref.y, model_ref.uvlock);
            drop_coincident_opposite_faces(&mut element_quads);
            quads.extend(element_quads);
        }
        apply_overlap_offsets(&mut quads);

        let mut mesh = ModelData::default();
        for q in quads {
            let material = mesh.material_index(&q.texture_key, &q.texture_key);
            mesh.push_quad(q.corners, q.uvs, material, q.cull.unwrap_or(CullDirection::None), q.name);
        }
        Ok(mesh)
    }

    fn resolve_chain(&self, key: &str, visited: &mut HashSet<String>) -> Result<ResolvedChain> {
        if let Some(cached) = self.chain_memo.lock().unwrap().get(key) {
            return Ok(cached.clone());
        }

        if !visited.insert(key.to_string()) {
            warn!("model parent cycle detected at {key}, truncating chain");
            return Ok((HashMap::new(), None));
        }

        let json = match self.resources.model(key) {
            Some(j) => j,
            None => return Ok((HashMap::new(), None)),
        };
        let model: BlockModelJson = match serde_json::from_value(json) {
            Ok(m) => m,
            Err(e) => {
                warn!("malformed model {key}: {e}");
                return Ok((HashMap::new(), None));
            }
        };

        let (mut textures, mut elements) = match &model.parent {
            Some(parent) => self.resolve_chain(&qualify(parent), visited)?,
            None => (HashMap::new(), None),
        };

        textures.extend(model.textures.clone());
        if let Some(e) = model.elements {
            elements = Some(e);
        }

        let resolved = (textures, elements);
        self.chain_memo.lock().unwrap().insert(key.to_string(), resolved.clone());
        Ok(resolved)
    }
}

/// `minecraft:light` has no vanilla model (it is rendered specially by the
/// client); we emit a tiny self-illuminating cube, matching the small glow
/// marker the real client draws rather than a full block, named after the
/// block's light `level` property so distinct intensities don't collide in
/// the material table.
fn light_block_mesh(level: u8) -> ModelData {
    let mut mesh = ModelData::default();
    let name = format!("minecraft:block/light_block_{level:02}");
    let material = mesh.material_index(&name, "None");
    for dir in CullDirection::ALL {
        let corners = face_corners(dir, [0.45, 0.45, 0.45], [0.55, 0.55, 0.55]);
        let uvs = uv_corners([0.0, 0.0, 16.0, 16.0], 0);
        mesh.push_quad(corners, uvs, material, CullDirection::None, dir);
    }
    mesh
}

fn pick_weighted(options: &[ModelRef]) -> ModelRef {
    if options.len() == 1 {
        return options[0].clone();
    }
    let total: u32 = options.iter().map(|o| o.weight.max(1)).sum();
    let mut roll = rand::thread_rng().gen_range(0..total.max(1));
    for opt in options {
        let w = opt.weight.max(1);
        if roll < w {
            return opt.clone();
        }
        roll -= w;
    }
    options[0].clone()
}

fn resolve_texture_var(textures: &HashMap<String, String>, var: &str) -> Option<String> {
    let mut current = var.trim_start_matches('#').to_string();
    for _ in 0..MAX_TEXTURE_VAR_DEPTH {
        match textures.get(&current) {
            Some(v) if v.starts_with('#') => current = v.trim_start_matches('#').to_string(),
            Some(v) => return Some(qualify(v)),
            None => return None,
        }
    }
    None
}

/// One instantiated face, still in its own element's local space. Carries
/// `raw_dir` (the pre-rotation JSON face key, used to tie-break coincident
/// opposite faces) separately from `name` (the post-rotation world-space
/// direction, used both as the mesh's semantic face identity and as the
/// overlap-offset grouping key).
struct Quad {
    corners: [[f64; 3]; 4],
    uvs: [[f64; 2]; 4],
    texture_key: String,
    cull: Option<CullDirection>,
    raw_dir: CullDirection,
    name: CullDirection,
}

fn instantiate_element(
    element: &ElementJson,
    textures: &HashMap<String, String>,
    rot_x: i32,
    rot_y: i32,
    uvlock: bool,
) -> Vec<Quad> {
    let from_raw = element.from;
    let to_raw = element.to;
    let from = from_raw.map(|v| v / 16.0);
    let to = to_raw.map(|v| v / 16.0);

    let mut quads = Vec::new();
    for dir in CullDirection::ALL {
        let face = match element.faces.get(dir.json_key()) {
            Some(f) => f,
            None => continue,
        };

        let texture_key = match resolve_texture_var(textures, &face.texture) {
            Some(t) => t,
            None => {
                warn!("unresolved texture variable {} on face {:?}", face.texture, dir);
                continue;
            }
        };

        let uv = face.uv.unwrap_or_else(|| default_uv(dir, from_raw, to_raw));
        let uv_rotation = if uvlock { face.rotation + variant_uv_lock_offset(dir, rot_x, rot_y) } else { face.rotation };

        let mut corners = face_corners(dir, from, to);
        let mut out_dir = dir;
        apply_variant_rotation(&mut corners, rot_x, rot_y);
        if let Some(r) = &element.rotation {
            apply_element_rotation(&mut corners, r);
        }
        if rot_x != 0 || rot_y != 0 {
            out_dir = rotate_direction(dir, rot_x, rot_y);
        }

        let uvs = uv_corners(uv, uv_rotation);
        let cull = face.cullface.as_deref().map(CullDirection::parse).map(|d| rotate_direction(d, rot_x, rot_y));

        quads.push(Quad {
            corners,
            uvs,
            texture_key,
            cull,
            raw_dir: dir,
            name: out_dir,
        });
    }
    quads
}

/// Drops one face of each pair of opposite faces (by pre-rotation JSON key)
/// that share the exact same vertex set, e.g. a zero-thickness element whose
/// `from`/`to` coincide on one axis would otherwise emit both a `down` and an
/// `up` quad covering the identical plane. Ties are broken by always keeping
/// the lower-priority face: `south`, `west`, and `down` are dropped in favor
/// of `north`, `east`, and `up`.
fn drop_coincident_opposite_faces(quads: &mut Vec<Quad>) {
    let mut drop = vec![false; quads.len()];
    for i in 0..quads.len() {
        if drop[i] {
            continue;
        }
        let opposite = quads[i].raw_dir.opposite();
        for j in (i + 1)..quads.len() {
            if drop[j] || quads[j].raw_dir != opposite {
                continue;
            }
            if corner_sets_match(&quads[i].corners, &quads[j].corners) {
                if is_tiebreak_loser(quads[i].raw_dir) {
                    drop[i] = true;
                } else {
                    drop[j] = true;
                }
                break;
            }
        }
    }
    let mut idx = 0;
    quads.retain(|_| {
        let keep = !drop[idx];
        idx += 1;
        keep
    });
}

fn is_tiebreak_loser(dir: CullDirection) -> bool {
    matches!(dir, CullDirection::South | CullDirection::West | CullDirection::Down)
}

fn corner_sets_match(a: &[[f64; 3]; 4], b: &[[f64; 3]; 4]) -> bool {
    let mut a: Vec<[i64; 3]> = a.iter().copied().map(quantize).collect();
    let mut b: Vec<[i64; 3]> = b.iter().copied().map(quantize).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

fn quantize(c: [f64; 3]) -> [i64; 3] {
    c.map(|v| (v * 100.0).round() as i64)
}

/// Nudges the n-th of several parallel, same-position faces apart along
/// their shared normal by `(n-1) * 0.001`, so coplanar faces contributed by
/// different elements (e.g. a block stacked against a glass pane) don't
/// z-fight in the exported mesh.
fn apply_overlap_offsets(quads: &mut [Quad]) {
    let mut seen: HashMap<(CullDirection, [i64; 3]), u32> = HashMap::new();
    for q in quads.iter_mut() {
        let key = (q.name, quantize_center(quad_center(&q.corners)));
        let count = seen.entry(key).or_insert(0);
        *count += 1;
        if *count > 1 {
            let step = (*count - 1) as f64 * 0.001;
            let (dx, dy, dz) = q.name.offset();
            for c in q.corners.iter_mut() {
                c[0] += dx as f64 * step;
                c[1] += dy as f64 * step;
                c[2] += dz as f64 * step;
            }
        }
    }
}

fn quad_center(corners: &[[f64; 3]; 4]) -> [f64; 3] {
    let mut sum = [0.0; 3];
    for c in corners {
        for k in 0..3 {
            sum[k] += c[k];
        }
    }
    sum.map(|v| v / 4.0)
}

fn quantize_center(c: [f64; 3]) -> [i64; 3] {
    c.map(|v| (v * 10_000.0).round() as i64)
}

/// UV-lock keeps a texture visually "locked" to the world axes as the model
/// rotates; approximated here as counter-rotating the face's own UV
/// rotation by the variant's x/y angle on the two faces that angle affects.
fn variant_uv_lock_offset(dir: CullDirection, rot_x: i32, rot_y: i32) -> i32 {
    match dir {
        CullDirection::Up | CullDirection::Down => -rot_y,
        CullDirection::North | CullDirection::South | CullDirection::East | CullDirection::West => -rot_x,
        CullDirection::None => 0,
    }
}

fn rotate_direction(dir: CullDirection, rot_x: i32, rot_y: i32) -> CullDirection {
    let mut d = dir;
    for _ in 0..((rot_y / 90).rem_euclid(4)) {
        d = match d {
            CullDirection::North => CullDirection::East,
            CullDirection::East => CullDirection::South,
            CullDirection::South => CullDirection::West,
            CullDirection::West => CullDirection::North,
            other => other,
        };
    }
    for _ in 0..((rot_x / 90).rem_euclid(4)) {
        d = match d {
            CullDirection::Up => CullDirection::South,
            CullDirection::South => CullDirection::Down,
            CullDirection::Down => CullDirection::North,
            CullDirection::North => CullDirection::Up,
            other => other,
        };
    }
    d
}

/// Applies the variant `x`/`y` blockstate transform. This is *not* the
/// general-purpose rotation `apply_element_rotation` uses: the blockstate
/// schema's own `y: 90` etc. is defined (and implemented by the original
/// client) as `(x,y,z) -> (1-|-z|, y, x)` rather than a textbook rotation
/// matrix about the cube center. The `abs` is a documented anomaly that
/// only changes behavior for elements extending outside 0..1, and is kept
/// here verbatim rather than "fixed" to a clean rotation.
fn apply_variant_rotation(corners: &mut [[f64; 3]; 4], rot_x: i32, rot_y: i32) {
    for c in corners.iter_mut() {
        for _ in 0..((rot_y / 90).rem_euclid(4)) {
            *c = [1.0 - c[2].abs(), c[1], c[0]];
        }
        for _ in 0..((rot_x / 90).rem_euclid(4)) {
            *c = [c[0], 1.0 - c[2].abs(), c[1]];
        }
    }
}

fn apply_element_rotation(corners: &mut [[f64; 3]; 4], rotation: &model::RotationJson) {
    let origin = rotation.origin.map(|v| v / 16.0);
    let axis = match rotation.axis.as_str() {
        "x" => Axis::X,
        "y" => Axis::Y,
        _ => Axis::Z,
    };
    let scale = if rotation.rescale {
        1.0 / rotation.angle.to_radians().cos()
    } else {
        1.0
    };
    for c in corners.iter_mut() {
        rotate_point(c, origin, axis, rotation.angle);
        if rotation.rescale {
            scale_off_axis(c, origin, axis, scale);
        }
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

fn rotate_point(p: &mut [f64; 3], origin: [f64; 3], axis: Axis, degrees: f64) {
    let rad = degrees.to_radians();
    let (s, c) = rad.sin_cos();
    let [x, y, z] = [p[0] - origin[0], p[1] - origin[1], p[2] - origin[2]];
    let (nx, ny, nz) = match axis {
        Axis::X => (x, y * c - z * s, y * s + z * c),
        Axis::Y => (x * c + z * s, y, -x * s + z * c),
        Axis::Z => (x * c - y * s, x * s + y * c, z),
    };
    *p = [nx + origin[0], ny + origin[1], nz + origin[2]];
}

fn scale_off_axis(p: &mut [f64; 3], origin: [f64; 3], axis: Axis, scale: f64) {
    match axis {
        Axis::X => {
            p[1] = origin[1] + (p[1] - origin[1]) * scale;
            p[2] = origin[2] + (p[2] - origin[2]) * scale;
        }
        Axis::Y => {
            p[0] = origin[0] + (p[0] - origin[0]) * scale;
            p[2] = origin[2] + (p[2] - origin[2]) * scale;
        }
        Axis::Z => {
            p[0] = origin[0] + (p[0] - origin[0]) * scale;
            p[1] = origin[1] + (p[1] - origin[1]) * scale;
        }
    }
}

fn merge_into(dst: &mut ModelData, src: ModelData) {
    let vertex_base = dst.vertices.len() as u32;
    let uv_base = dst.uv_coordinates.len() as u32;
    dst.vertices.extend(src.vertices);
    dst.uv_coordinates.extend(src.uv_coordinates);
    dst.faces.extend(src.faces.into_iter().map(|i| i + vertex_base));
    dst.uv_faces.extend(src.uv_faces.into_iter().map(|i| i + uv_base));
    dst.face_directions.extend(src.face_directions);
    dst.face_names.extend(src.face_names);

    let remap: Vec<u32> = src
        .material_names
        .iter()
        .zip(src.texture_paths.iter())
        .map(|(name, path)| dst.material_index(name, path))
        .collect();
    dst.material_indices
        .extend(src.material_indices.iter().map(|&i| remap[i as usize]));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_texture_var_follows_chain() {
        let mut textures = HashMap::new();
        textures.insert("all".to_string(), "#side".to_string());
        textures.insert("side".to_string(), "block/stone".to_string());
        assert_eq!(resolve_texture_var(&textures, "#all"), Some("minecraft:block/stone".to_string()));
    }

    #[test]
    fn resolve_texture_var_detects_dead_end() {
        let textures = HashMap::new();
        assert_eq!(resolve_texture_var(&textures, "#missing"), None);
    }

    #[test]
    fn rotate_direction_identity_at_zero() {
        assert_eq!(rotate_direction(CullDirection::North, 0, 0), CullDirection::North);
    }

    #[test]
    fn rotate_direction_y90_cycles_cardinals() {
        assert_eq!(rotate_direction(CullDirection::North, 0, 90), CullDirection::East);
        assert_eq!(rotate_direction(CullDirection::East, 0, 90), CullDirection::South);
    }

    #[test]
    fn variant_y90_matches_the_documented_transform() {
        let mut corners = [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        apply_variant_rotation(&mut corners, 0, 90);
        // (x,y,z) -> (1-z, y, x)
        assert_eq!(corners[0], [0.0, 0.0, 0.0]);
        assert_eq!(corners[1], [0.0, 0.0, 1.0]);
        assert_eq!(corners[2], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn variant_rotation_is_identity_at_zero() {
        let original = [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let mut corners = original;
        apply_variant_rotation(&mut corners, 0, 0);
        assert_eq!(corners, original);
    }

    #[test]
    fn variant_y90_applied_four_times_is_identity() {
        let original = [[0.2, 0.3, 0.7], [0.9, 0.1, 0.4], [0.5, 0.5, 0.5], [0.0, 1.0, 1.0]];
        let mut corners = original;
        for _ in 0..4 {
            apply_variant_rotation(&mut corners, 0, 90);
        }
        for i in 0..4 {
            for k in 0..3 {
                assert!((corners[i][k] - original[i][k]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn light_block_mesh_uses_level_dependent_material_and_tiny_cube() {
        let mesh = light_block_mesh(7);
        assert_eq!(mesh.quad_count(), 6);
        assert_eq!(mesh.material_names, vec!["minecraft:block/light_block_07".to_string()]);
        assert_eq!(mesh.texture_paths, vec!["None".to_string()]);
        for v in &mesh.vertices {
            for &c in v {
                assert!((0.45..=0.55).contains(&c));
            }
        }
    }

    #[test]
    fn drops_coincident_opposite_faces_within_an_element() {
        let element = ElementJson {
            from: [0.0, 0.0, 0.0],
            to: [16.0, 0.0, 16.0],
            faces: {
                let mut m = HashMap::new();
                m.insert(
                    "up".to_string(),
                    model::FaceJson { texture: "#t".to_string(), uv: None, rotation: 0, cullface: None, tintindex: None },
                );
                m.insert(
                    "down".to_string(),
                    model::FaceJson { texture: "#t".to_string(), uv: None, rotation: 0, cullface: None, tintindex: None },
                );
                m
            },
            rotation: None,
            shade: true,
        };
        let mut textures = HashMap::new();
        textures.insert("t".to_string(), "block/stone".to_string());

        let mut quads = instantiate_element(&element, &textures, 0, 0, false);
        assert_eq!(quads.len(), 2);
        drop_coincident_opposite_faces(&mut quads);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].raw_dir, CullDirection::Up);
    }

    #[test]
    fn offsets_the_second_of_two_overlapping_parallel_faces() {
        let corners = face_corners(CullDirection::Up, [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]);
        let make = || Quad {
            corners,
            uvs: uv_corners([0.0, 0.0, 16.0, 16.0], 0),
            texture_key: "block/stone".to_string(),
            cull: None,
            raw_dir: CullDirection::Up,
            name: CullDirection::Up,
        };
        let mut quads = vec![make(), make()];
        apply_overlap_offsets(&mut quads);
        assert_eq!(quads[0].corners, corners);
        assert_eq!(quads[1].corners[0][1], corners[0][1] + 0.001);
    }
}
