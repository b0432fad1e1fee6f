//! The merged mesh representation ([`ModelData`]) and the raw cube-face
//! geometry tables the model resolver instantiates block elements against.

/// One of the six axis-aligned cube directions, used both for face culling
/// (`cullface`) and for naming which JSON face produced a quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullDirection {
    Down,
    Up,
    North,
    South,
    West,
    East,
    None,
}

impl CullDirection {
    pub fn parse(s: &str) -> CullDirection {
        match s {
            "down" => CullDirection::Down,
            "up" => CullDirection::Up,
            "north" => CullDirection::North,
            "south" => CullDirection::South,
            "west" => CullDirection::West,
            "east" => CullDirection::East,
            _ => CullDirection::None,
        }
    }

    pub fn opposite(self) -> CullDirection {
        match self {
            CullDirection::Down => CullDirection::Up,
            CullDirection::Up => CullDirection::Down,
            CullDirection::North => CullDirection::South,
            CullDirection::South => CullDirection::North,
            CullDirection::West => CullDirection::East,
            CullDirection::East => CullDirection::West,
            CullDirection::None => CullDirection::None,
        }
    }

    /// The block-coordinate offset a neighbor occupies in this direction.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            CullDirection::Down => (0, -1, 0),
            CullDirection::Up => (0, 1, 0),
            CullDirection::North => (0, 0, -1),
            CullDirection::South => (0, 0, 1),
            CullDirection::West => (-1, 0, 0),
            CullDirection::East => (1, 0, 0),
            CullDirection::None => (0, 0, 0),
        }
    }

    pub const ALL: [CullDirection; 6] = [
        CullDirection::Down,
        CullDirection::Up,
        CullDirection::North,
        CullDirection::South,
        CullDirection::West,
        CullDirection::East,
    ];

    pub fn json_key(self) -> &'static str {
        match self {
            CullDirection::Down => "down",
            CullDirection::Up => "up",
            CullDirection::North => "north",
            CullDirection::South => "south",
            CullDirection::West => "west",
            CullDirection::East => "east",
            CullDirection::None => "none",
        }
    }
}

pub type FaceName = CullDirection;

/// A merged, renderable mesh. `faces`/`uv_faces`/`face_directions` are flat
/// vertex-index arrays grouped in runs of four (one quad); `material_indices`
/// and `face_names` hold one entry per quad.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub vertices: Vec<[f64; 3]>,
    pub uv_coordinates: Vec<[f64; 2]>,
    pub faces: Vec<u32>,
    pub uv_faces: Vec<u32>,
    pub material_indices: Vec<u32>,
    pub material_names: Vec<String>,
    pub texture_paths: Vec<String>,
    pub face_directions: Vec<CullDirection>,
    pub face_names: Vec<FaceName>,
}

impl ModelData {
    pub fn quad_count(&self) -> usize {
        self.faces.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Registers `name`/`path` as a material, reusing an existing slot with
    /// the same name rather than duplicating it.
    pub fn material_index(&mut self, name: &str, path: &str) -> u32 {
        if let Some(i) = self.material_names.iter().position(|n| n == name) {
            return i as u32;
        }
        self.material_names.push(name.to_string());
        self.texture_paths.push(path.to_string());
        (self.material_names.len() - 1) as u32
    }

    pub fn push_quad(
        &mut self,
        corners: [[f64; 3]; 4],
        uvs: [[f64; 2]; 4],
        material: u32,
        cull: CullDirection,
        name: FaceName,
    ) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(corners);
        let uv_base = self.uv_coordinates.len() as u32;
        self.uv_coordinates.extend(uvs);
        for i in 0..4u32 {
            self.faces.push(base + i);
            self.uv_faces.push(uv_base + i);
            self.face_directions.push(cull);
        }
        self.material_indices.push(material);
        self.face_names.push(name);
    }
}

/// Canonical corner ordering for each face of an axis-aligned box
/// `[x0,y0,z0]..[x1,y1,z1]`, counter-clockwise as seen from outside the box.
pub fn face_corners(dir: CullDirection, from: [f64; 3], to: [f64; 3]) -> [[f64; 3]; 4] {
    let [x0, y0, z0] = from;
    let [x1, y1, z1] = to;
    match dir {
        CullDirection::Down => [[x0, y0, z1], [x1, y0, z1], [x1, y0, z0], [x0, y0, z0]],
        CullDirection::Up => [[x0, y1, z0], [x0, y1, z1], [x1, y1, z1], [x1, y1, z0]],
        CullDirection::North => [[x1, y0, z0], [x0, y0, z0], [x0, y1, z0], [x1, y1, z0]],
        CullDirection::South => [[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]],
        CullDirection::West => [[x0, y0, z0], [x0, y0, z1], [x0, y1, z1], [x0, y1, z0]],
        CullDirection::East => [[x1, y0, z1], [x1, y0, z0], [x1, y1, z0], [x1, y1, z1]],
        CullDirection::None => [from, from, from, from],
    }
}

/// Default UV region in 0..16 texture space, projecting the element's
/// extent onto the two axes perpendicular to `dir`.
pub fn default_uv(dir: CullDirection, from: [f64; 3], to: [f64; 3]) -> [f64; 4] {
    let [x0, y0, z0] = from;
    let [x1, y1, z1] = to;
    match dir {
        CullDirection::Down | CullDirection::Up => [x0, z0, x1, z1],
        CullDirection::North | CullDirection::South => [x0, 16.0 - y1, x1, 16.0 - y0],
        CullDirection::West | CullDirection::East => [z0, 16.0 - y1, z1, 16.0 - y0],
        CullDirection::None => [0.0, 0.0, 16.0, 16.0],
    }
}

/// Converts a `[u0,v0,u1,v1]` texture-space UV rectangle (0..16) into the
/// four corner UVs matching [`face_corners`]'s winding, applying a
/// 0/90/180/270 degree rotation.
pub fn uv_corners(uv: [f64; 4], rotation: i32) -> [[f64; 2]; 4] {
    let [u0, v0, u1, v1] = uv.map(|v| v / 16.0);
    // v is flipped because texture row 0 is the top of the image but UV's
    // origin is conventionally the bottom-left.
    let mut corners = [
        [u0, 1.0 - v1],
        [u1, 1.0 - v1],
        [u1, 1.0 - v0],
        [u0, 1.0 - v0],
    ];
    let steps = ((rotation / 90).rem_euclid(4)) as usize;
    corners.rotate_left(steps);
    corners
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_quad_keeps_parallel_arrays_in_sync() {
        let mut m = ModelData::default();
        let mat = m.material_index("stone", "minecraft:block/stone");
        m.push_quad(
            face_corners(CullDirection::Up, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            uv_corners([0.0, 0.0, 16.0, 16.0], 0),
            mat,
            CullDirection::Up,
            CullDirection::Up,
        );
        assert_eq!(m.quad_count(), 1);
        assert_eq!(m.faces.len(), 4);
        assert_eq!(m.uv_faces.len(), 4);
        assert_eq!(m.material_indices.len(), 1);
        assert_eq!(m.face_names.len(), 1);
        assert_eq!(m.face_directions.len(), 4);
    }

    #[test]
    fn material_index_deduplicates_by_name() {
        let mut m = ModelData::default();
        let a = m.material_index("stone", "minecraft:block/stone");
        let b = m.material_index("stone", "minecraft:block/stone");
        assert_eq!(a, b);
        assert_eq!(m.material_names.len(), 1);
    }

    #[test]
    fn uv_rotation_cycles_corners() {
        let base = uv_corners([0.0, 0.0, 16.0, 16.0], 0);
        let rotated = uv_corners([0.0, 0.0, 16.0, 16.0], 90);
        assert_eq!(rotated[0], base[1]);
    }

    #[test]
    fn opposite_direction_pairs_are_involutive() {
        for d in CullDirection::ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
    }
}
