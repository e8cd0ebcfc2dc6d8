use crate::classify::color_for;
use crate::config::AppConfig;
use crate::legend::legend_rows;
use crate::region_layer::RegionLayer;
use crate::style::FILL_OPACITY;
use anyhow::{Context, Result};
use geo::algorithm::contains::Contains;
use geo::Point;
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fs;
use tracing::{info, warn};

// Constants for Web Mercator
const TILE_SIZE: u32 = 256;

/// Write choropleth tiles for the configured zoom range, then the styled
/// GeoJSON and legend next to them.
pub fn generate_tiles(config: &AppConfig, layer: &RegionLayer) -> Result<()> {
    info!(
        "Generating tiles from min_zoom {} to max_zoom {}...",
        config.output.min_zoom, config.output.max_zoom
    );

    config.output.validate()?;
    fs::create_dir_all(&config.output.tile_dir).context("Failed to create tile directory")?;

    let mut written = 0;
    for zoom in config.output.min_zoom..=config.output.max_zoom {
        written += render_zoom_level(config, layer, zoom)?;
    }
    info!("Wrote {} tiles", written);

    write_overlays(config, layer)
}

fn write_overlays(config: &AppConfig, layer: &RegionLayer) -> Result<()> {
    let regions_path = config.output.tile_dir.join("regions.geojson");
    fs::write(&regions_path, serde_json::to_string(&layer.to_geojson()?)?)
        .with_context(|| format!("Failed to write {:?}", regions_path))?;

    let legend_path = config.output.tile_dir.join("legend.json");
    fs::write(&legend_path, serde_json::to_string_pretty(&legend_rows())?)
        .with_context(|| format!("Failed to write {:?}", legend_path))?;

    Ok(())
}

fn render_zoom_level(config: &AppConfig, layer: &RegionLayer, zoom: u8) -> Result<usize> {
    let n = 1u32 << zoom;
    let z_dir = config.output.tile_dir.join(zoom.to_string());

    // Each tile is written as soon as it is rendered, so only the tiles in
    // flight on the rayon workers are held in memory.
    let written: usize = (0..n)
        .into_par_iter()
        .flat_map_iter(|x| (0..n).map(move |y| (x, y)))
        .map(|(x, y)| {
            let img = match render_tile(layer, zoom, x, y) {
                Some(img) => img,
                None => return 0,
            };
            let x_dir = z_dir.join(x.to_string());
            let path = x_dir.join(format!("{}.png", y));
            match fs::create_dir_all(&x_dir)
                .map_err(anyhow::Error::from)
                .and_then(|_| img.save(&path).map_err(anyhow::Error::from))
            {
                Ok(()) => 1,
                Err(e) => {
                    warn!("Failed to save tile {:?}: {:?}", path, e);
                    0
                }
            }
        })
        .sum();

    Ok(written)
}

/// Rasterise one tile. Returns `None` when no region touches it.
pub fn render_tile(layer: &RegionLayer, zoom: u8, tx: u32, ty: u32) -> Option<RgbaImage> {
    let (west, north) = tile_pixel_to_lon_lat(zoom, tx, ty, 0.0, 0.0);
    let (east, south) = tile_pixel_to_lon_lat(zoom, tx + 1, ty + 1, 0.0, 0.0);

    let candidates = layer.candidates([west, south], [east, north]);
    if candidates.is_empty() {
        return None;
    }

    let fills: Vec<Rgba<u8>> = candidates
        .iter()
        .map(|region| hex_to_rgba(color_for(layer.count(&region.name)), FILL_OPACITY))
        .collect();

    let mut img: RgbaImage = ImageBuffer::new(TILE_SIZE, TILE_SIZE);
    let mut painted = false;

    for py in 0..TILE_SIZE {
        for px in 0..TILE_SIZE {
            let (lon, lat) = tile_pixel_to_lon_lat(zoom, tx, ty, px as f64 + 0.5, py as f64 + 0.5);
            let point = Point::new(lon, lat);
            if let Some(i) = candidates.iter().position(|r| r.geometry.contains(&point)) {
                img.put_pixel(px, py, fills[i]);
                painted = true;
            }
        }
    }

    painted.then_some(img)
}

fn hex_to_rgba(hex: &str, opacity: f64) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    Rgba([r, g, b, (opacity.clamp(0.0, 1.0) * 255.0).round() as u8])
}

// Coordinate conversions
fn tile_pixel_to_lon_lat(zoom: u8, tx: u32, ty: u32, px: f64, py: f64) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let x = tx as f64 + px / TILE_SIZE as f64;
    let y = ty as f64 + py / TILE_SIZE as f64;
    let lon = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    (lon, lat)
}
