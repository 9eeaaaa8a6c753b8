use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::{HttpConfig, OverpassConfig, PanoramaxConfig};

/// Settings read from `panoramax2osm.toml`
///
/// ```toml
/// verbose = true
///
/// [http]
/// timeout_secs = 120
/// max_retries = 2
///
/// [overpass]
/// url = "https://overpass.private.coffee/api/interpreter"
///
/// [overpass.cache]
/// max_entries = 256
/// ttl_secs = 3600
///
/// [panoramax]
/// base_url = "https://panoramax.openstreetmap.fr"
///
/// [panoramax.cache]
/// enabled = true
/// ttl_secs = 300
/// ```
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub overpass: OverpassConfig,
    #[serde(default)]
    pub panoramax: PanoramaxConfig,
}

impl FileConfig {
    /// Use `explicit` if given (it must exist), else the first parseable file
    /// on the search path, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {:?}", path);
                }
                Self::load_from(path)
            }
            None => Ok(Self::load().unwrap_or_default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// First config on [`SEARCH_PATHS`] that parses; broken files are skipped
    /// with a warning, so tracing must be initialized before this runs.
    pub fn load() -> Option<Self> {
        Self::load_first(&get_config_paths())
    }

    fn load_first(paths: &[PathBuf]) -> Option<Self> {
        paths
            .iter()
            .filter(|path| path.is_file())
            .find_map(|path| match Self::load_from(path) {
                Ok(config) => {
                    tracing::debug!(?path, "Loaded config file");
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!("Skipping config file: {e:#}");
                    None
                }
            })
    }
}

#[derive(Debug, Clone, Copy)]
enum SearchRoot {
    WorkingDir,
    /// `dirs::config_dir()`, e.g. `~/.config` or `%APPDATA%`
    ConfigDir,
    Home,
}

/// Config locations in lookup order; the first file that parses wins
const SEARCH_PATHS: &[(SearchRoot, &str)] = &[
    (SearchRoot::WorkingDir, "panoramax2osm.toml"),
    (SearchRoot::WorkingDir, ".panoramax2osm.toml"),
    (SearchRoot::ConfigDir, "panoramax2osm/config.toml"),
    (SearchRoot::ConfigDir, "panoramax2osm.toml"),
    (SearchRoot::Home, ".panoramax2osm.toml"),
    (SearchRoot::Home, ".config/panoramax2osm/config.toml"),
];

/// [`SEARCH_PATHS`] resolved for this machine; roots that cannot be
/// determined are left out
fn get_config_paths() -> Vec<PathBuf> {
    SEARCH_PATHS
        .iter()
        .filter_map(|&(root, relative)| {
            let root = match root {
                SearchRoot::WorkingDir => Some(PathBuf::new()),
                SearchRoot::ConfigDir => dirs::config_dir(),
                SearchRoot::Home => dirs::home_dir(),
            };
            root.map(|dir| dir.join(relative))
        })
        .collect()
}
