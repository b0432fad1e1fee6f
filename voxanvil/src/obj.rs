//! Writes a merged [`ModelData`] out as a Wavefront OBJ + MTL pair, with
//! referenced textures externalized as PNG files next to them.

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::resources::ResourceCache;
use crate::tex::geometry::ModelData;

pub fn write(mesh: &ModelData, resources: &ResourceCache, out_dir: &Path, base_name: &str) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;

    let obj_path = out_dir.join(format!("{base_name}.obj"));
    let mtl_path = out_dir.join(format!("{base_name}.mtl"));
    let mtl_name = format!("{base_name}.mtl");

    write_obj(mesh, &obj_path, &mtl_name)?;
    write_mtl(mesh, resources, &mtl_path, out_dir)?;
    Ok(())
}

fn write_obj(mesh: &ModelData, path: &Path, mtl_name: &str) -> Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(out, "mtllib {mtl_name}")?;

    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v[0], v[1], v[2])?;
    }
    for uv in &mesh.uv_coordinates {
        writeln!(out, "vt {} {}", uv[0], uv[1])?;
    }

    let mut current_material = u32::MAX;
    for q in 0..mesh.quad_count() {
        let material = mesh.material_indices[q];
        if material != current_material {
            writeln!(out, "usemtl {}", mesh.material_names[material as usize])?;
            current_material = material;
        }
        write!(out, "f")?;
        for k in 0..4 {
            let v = mesh.faces[q * 4 + k] + 1;
            let vt = mesh.uv_faces[q * 4 + k] + 1;
            write!(out, " {v}/{vt}")?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// The self-illuminating material profile used for `minecraft:light`
/// (no texture, full ambient, zero diffuse so its face color comes purely
/// from `Ka`) versus the ordinary textured block profile. Light-block
/// materials are recognized by their `"None"` texture path sentinel rather
/// than by name, since the name is level-dependent
/// (`minecraft:block/light_block_<NN>`).
fn write_mtl(mesh: &ModelData, resources: &ResourceCache, path: &Path, out_dir: &Path) -> Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);

    for (i, name) in mesh.material_names.iter().enumerate() {
        writeln!(out, "newmtl {name}")?;
        if mesh.texture_paths[i] == "None" {
            writeln!(out, "Ka 1.000 1.000 1.000")?;
            writeln!(out, "Kd 0.000 0.000 0.000")?;
            writeln!(out, "Ks 0.000 0.000 0.000")?;
            writeln!(out, "illum 1")?;
        } else {
            writeln!(out, "Ka 1.000 1.000 1.000")?;
            writeln!(out, "Kd 1.000 1.000 1.000")?;
            writeln!(out, "Ks 0.000 0.000 0.000")?;
            writeln!(out, "illum 2")?;

            let texture_path = &mesh.texture_paths[i];
            if let Some(bytes) = resources.texture(texture_path) {
                let file_name = texture_file_name(texture_path);
                std::fs::write(out_dir.join(&file_name), bytes)?;
                writeln!(out, "map_Kd {file_name}")?;
            }
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn texture_file_name(resource_location: &str) -> String {
    let (_, path) = resource_location.split_once(':').unwrap_or(("minecraft", resource_location));
    format!("{}.png", path.replace('/', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_file_name_flattens_path_segments() {
        assert_eq!(texture_file_name("minecraft:block/stone"), "block_stone.png");
    }

    #[test]
    fn texture_file_name_defaults_namespace() {
        assert_eq!(texture_file_name("block/dirt"), "block_dirt.png");
    }
}
