//! Command line entry point: loads a world's region files and a stack of
//! resource pack archives, and writes the requested bounding box out as a
//! textured OBJ/MTL mesh.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use voxanvil::{BlockPaletteRegistry, ChunkMesher, ExportBounds, ModelResolver, RegionStore, ResourceCache};

#[derive(Parser)]
#[command(name = "voxmesh", about = "Export a Minecraft Java Edition world region to OBJ/MTL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a block-coordinate bounding box to `<output>.obj`/`.mtl`.
    Export {
        /// Directory containing the world's region files (`r.*.*.mca`).
        #[arg(long)]
        world: PathBuf,

        /// Resource pack / mod jar archives to resolve textures and models
        /// from, lowest priority first.
        #[arg(long = "resources", required = true, num_args = 1..)]
        resources: Vec<PathBuf>,

        #[arg(long)]
        x0: i32,
        #[arg(long)]
        x1: i32,
        #[arg(long)]
        y0: i32,
        #[arg(long)]
        y1: i32,
        #[arg(long)]
        z0: i32,
        #[arg(long)]
        z1: i32,

        /// Output directory for the mesh and its textures.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Base file name for the generated `.obj`/`.mtl` pair.
        #[arg(long, default_value = "export")]
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Export {
            world,
            resources,
            x0,
            x1,
            y0,
            y1,
            z0,
            z1,
            out_dir,
            name,
        } => {
            info!("loading {} resource archives", resources.len());
            let resource_cache = ResourceCache::initialize(resources)?;
            info!("{} textures indexed", resource_cache.texture_count());

            let mut region_store = RegionStore::new(world);
            let mut palette = BlockPaletteRegistry::new();
            let resolver = ModelResolver::new(&resource_cache);

            let bounds = ExportBounds {
                min: (x0.min(x1), y0.min(y1), z0.min(z1)),
                max: (x0.max(x1), y0.max(y1), z0.max(z1)),
            };

            let mut mesher = ChunkMesher::new(&mut region_store, &mut palette, &resolver);
            let mesh = mesher.mesh_region(bounds)?;

            info!("exporting {} quads to {out_dir:?}/{name}.obj", mesh.quad_count());
            voxanvil::obj::write(&mesh, &resource_cache, &out_dir, &name)?;
        }
    }

    Ok(())
}
