//! Application settings loaded from config.toml
//!
//! The file controls where the local mirror lives, whether the stores run without a
//! remote backend, and which locations are seeded into an empty local-only catalog.

use crate::errors::{Error, Result};
use crate::models::{LocationInput, LocationType};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Locations created on first run of a local-only catalog
    #[serde(default = "default_locations")]
    pub locations: Vec<SeedLocation>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            locations: default_locations(),
        }
    }
}

/// Persistence settings
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the JSON mirrors
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Skip the remote backend and keep data in the local mirror only
    #[serde(default)]
    pub local_only: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            local_only: false,
        }
    }
}

/// A location to seed
#[derive(Debug, Deserialize, Clone)]
pub struct SeedLocation {
    /// Display name
    pub name: String,
    /// Kind of storage
    #[serde(rename = "type")]
    pub location_type: LocationType,
    /// Optional free text
    #[serde(default)]
    pub description: Option<String>,
    /// Opaque style token
    #[serde(default)]
    pub color: Option<String>,
    /// Opaque icon-set key
    #[serde(default)]
    pub icon: Option<String>,
}

impl SeedLocation {
    /// Converts the seed into a root location input.
    #[must_use]
    pub fn to_input(&self) -> LocationInput {
        LocationInput {
            name: self.name.clone(),
            location_type: self.location_type,
            description: self.description.clone(),
            color: self.color.clone(),
            icon: self.icon.clone(),
            parent_id: None,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_locations() -> Vec<SeedLocation> {
    vec![
        SeedLocation {
            name: "Bedroom Drawer".to_string(),
            location_type: LocationType::Drawer,
            description: Some("Main bedroom dresser".to_string()),
            color: Some("bg-blue-100 dark:bg-blue-950".to_string()),
            icon: None,
        },
        SeedLocation {
            name: "Kitchen Cabinet".to_string(),
            location_type: LocationType::Cabinet,
            description: Some("Upper kitchen cabinets".to_string()),
            color: Some("bg-green-100 dark:bg-green-950".to_string()),
            icon: None,
        },
    ]
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A location type is not one of the known kinds
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from ./config.toml, falling back to defaults when the file is absent.
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    if !path.exists() {
        info!("No config.toml found, using default settings");
        return Ok(Config::default());
    }
    load_config(path)
}
