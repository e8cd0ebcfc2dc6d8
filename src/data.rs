use crate::config::InputConfig;
use crate::types::{AirportRecord, Region};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::GeoJson;
use shapefile::Reader;
use std::fs;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Load both datasets side by side and wait for both before returning.
/// Either failure aborts the whole load.
pub async fn load_datasets(input: &InputConfig) -> Result<(Vec<Region>, Vec<AirportRecord>)> {
    let countries_path = input.countries.clone();
    let name_property = input.name_property.clone();
    let regions = tokio::task::spawn_blocking(move || load_regions(&countries_path, &name_property));

    let airports_path = input.airports.clone();
    let country_field = input.country_field.clone();
    let airports = tokio::task::spawn_blocking(move || load_airports(&airports_path, &country_field));

    let (regions, airports) = tokio::try_join!(joined(regions), joined(airports))?;
    info!(
        "Loaded {} regions and {} airport records",
        regions.len(),
        airports.len()
    );
    Ok((regions, airports))
}

async fn joined<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle.await.context("Dataset loader task panicked")?
}

fn extension_of(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input file has no extension: {:?}", path))
}

/// Drop a `var name = ...;` wrapper around a JSON payload so script-style
/// dataset files parse as plain JSON.
pub fn strip_script_wrapper(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return trimmed;
    }
    let body = match trimmed.find('=') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    body.trim().trim_end_matches(';').trim_end()
}

pub fn load_airports(path: &Path, country_field: &str) -> Result<Vec<AirportRecord>> {
    info!("Loading airports from {:?}...", path);
    match extension_of(path)?.as_str() {
        "json" | "js" => load_airports_json(path, country_field),
        "csv" => load_airports_csv(path, country_field),
        other => Err(anyhow!("Unsupported airport format: {}", other)),
    }
}

fn load_airports_json(path: &Path, country_field: &str) -> Result<Vec<AirportRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read airport file: {:?}", path))?;
    let rows: Vec<serde_json::Value> = serde_json::from_str(strip_script_wrapper(&content))
        .with_context(|| format!("Airport file must be a JSON array: {:?}", path))?;

    Ok(rows
        .iter()
        .map(|row| AirportRecord {
            country: row
                .get(country_field)
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
        .collect())
}

fn load_airports_csv(path: &Path, country_field: &str) -> Result<Vec<AirportRecord>> {
    let mut rdr = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let headers = rdr.headers()?.clone();

    let country_idx = headers
        .iter()
        .position(|h| h == country_field)
        .ok_or_else(|| anyhow!("Country column '{}' not found in CSV", country_field))?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        records.push(AirportRecord {
            country: record.get(country_idx).map(str::to_string),
        });
    }
    Ok(records)
}

pub fn load_regions(path: &Path, name_property: &str) -> Result<Vec<Region>> {
    let regions = match extension_of(path)?.as_str() {
        "shp" => load_shapefile(path, name_property)?,
        "json" | "geojson" | "js" => load_geojson(path, name_property)?,
        other => return Err(anyhow!("Unsupported geometry format: {}", other)),
    };
    info!("Loaded geometry for {} regions", regions.len());
    Ok(regions)
}

fn load_shapefile(path: &Path, name_property: &str) -> Result<Vec<Region>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name = match record.get(name_property) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) => s.trim().to_string(),
            Some(shapefile::dbase::FieldValue::Character(None)) => continue,
            Some(_) => return Err(anyhow!("Shapefile name column must be a string")),
            None => {
                return Err(anyhow!(
                    "Name column '{}' not found in Shapefile",
                    name_property
                ))
            }
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue,
        };

        regions.push(Region { name, geometry });
    }

    Ok(regions)
}

fn load_geojson(path: &Path, name_property: &str) -> Result<Vec<Region>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read GeoJSON file: {:?}", path))?;
    parse_regions(strip_script_wrapper(&content), name_property)
}

/// Regions from a GeoJSON FeatureCollection. Features without a name or
/// without polygonal geometry are skipped.
pub fn parse_regions(geojson: &str, name_property: &str) -> Result<Vec<Region>> {
    let geojson: GeoJson = geojson.parse().context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();
    let mut unnamed = 0;

    for feature in collection.features {
        let name = match feature
            .properties
            .as_ref()
            .and_then(|props| props.get(name_property))
        {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                unnamed += 1;
                continue;
            }
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry of {}: {:?}", name, e))?;
                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        regions.push(Region { name, geometry });
    }

    if unnamed > 0 {
        warn!("Skipped {} features without a '{}' property", unnamed, name_property);
    }

    Ok(regions)
}
