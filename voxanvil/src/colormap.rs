//! Biome tint sampling from vanilla's grass/foliage colormap PNGs.
//!
//! The colormap is a 256x256 image indexed by `(temperature, humidity)`,
//! both clamped to `[0, 1]` and humidity further scaled by temperature
//! before indexing, exactly as the client samples it for grass and leaf
//! tinting.

use image::GenericImageView;

use crate::error::Result;
use crate::resources::ResourceCache;

pub struct Colormap {
    width: u32,
    height: u32,
    pixels: image::DynamicImage,
}

impl Colormap {
    pub fn load(resources: &ResourceCache, kind: &str) -> Result<Option<Colormap>> {
        let bytes = match resources.colormap(kind) {
            Some(b) => b,
            None => return Ok(None),
        };
        let img = image::load_from_memory(&bytes)?;
        let (width, height) = img.dimensions();
        Ok(Some(Colormap { width, height, pixels: img }))
    }

    /// Averages the 2x2 neighborhood around the `(temperature, humidity)`
    /// sample point, matching `anvil-palette`'s bilinear-ish tint averaging
    /// rather than a single nearest-texel lookup.
    pub fn sample(&self, temperature: f64, humidity: f64) -> [u8; 4] {
        let t = temperature.clamp(0.0, 1.0);
        let h = humidity.clamp(0.0, 1.0) * t;

        let x = ((1.0 - t) * (self.width - 1) as f64).round() as u32;
        let y = ((1.0 - h) * (self.height - 1) as f64).round() as u32;

        avg_colour(&self.pixels, x, y)
    }
}

/// Averages a pixel with its immediate right/down neighbors (clamped to the
/// image bounds), smoothing over the colormap's hard texel edges.
fn avg_colour(img: &image::DynamicImage, x: u32, y: u32) -> [u8; 4] {
    let (w, h) = img.dimensions();
    let mut samples = vec![img.get_pixel(x, y).0];
    if x + 1 < w {
        samples.push(img.get_pixel(x + 1, y).0);
    }
    if y + 1 < h {
        samples.push(img.get_pixel(x, y + 1).0);
    }

    let n = samples.len() as u32;
    let mut sum = [0u32; 4];
    for s in &samples {
        for c in 0..4 {
            sum[c] += s[c] as u32;
        }
    }
    [
        (sum[0] / n) as u8,
        (sum[1] / n) as u8,
        (sum[2] / n) as u8,
        (sum[3] / n) as u8,
    ]
}
