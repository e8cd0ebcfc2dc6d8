use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Country boundaries, GeoJSON or Shapefile.
    pub countries: PathBuf,
    /// Airport list, JSON array or CSV.
    pub airports: PathBuf,
    #[serde(default = "default_name_property")]
    pub name_property: String,
    #[serde(default = "default_country_field")]
    pub country_field: String,
}

/// Base-map settings passed through to the browser client.
#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub max_zoom: u8,
    pub tile_url: String,
    pub attribution: String,
    pub access_token: Option<String>,
    /// Pixel size of the base-map tiles; 512 for Mapbox style tiles.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Set to -1 alongside a 512 px `tile_size`.
    #[serde(default)]
    pub zoom_offset: i8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [45.0, 0.0],
            zoom: 2,
            max_zoom: 18,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "Map data &copy; OpenStreetMap contributors".to_string(),
            access_token: None,
            tile_size: default_tile_size(),
            zoom_offset: 0,
        }
    }
}

impl MapConfig {
    /// Tile URL with `{accessToken}` filled from the config or the
    /// `MAPBOX_ACCESS_TOKEN` environment variable.
    pub fn resolved_tile_url(&self) -> String {
        let token = self
            .access_token
            .clone()
            .or_else(|| env::var("MAPBOX_ACCESS_TOKEN").ok())
            .unwrap_or_default();
        self.tile_url.replace("{accessToken}", &token)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub tile_dir: PathBuf,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// Deepest zoom level tiles are rendered for.
pub const MAX_TILE_ZOOM: u8 = 24;

impl OutputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_zoom > MAX_TILE_ZOOM {
            return Err(anyhow!(
                "output.max_zoom {} exceeds the supported maximum of {}",
                self.max_zoom,
                MAX_TILE_ZOOM
            ));
        }
        if self.min_zoom > self.max_zoom {
            return Err(anyhow!(
                "output.min_zoom {} is greater than output.max_zoom {}",
                self.min_zoom,
                self.max_zoom
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_name_property() -> String {
    "name".to_string()
}

fn default_country_field() -> String {
    "Country".to_string()
}

fn default_tile_size() -> u32 {
    256
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.output.validate()?;
        Ok(config)
    }
}
