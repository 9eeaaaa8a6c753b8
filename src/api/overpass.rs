use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::http::{Transport, get_as};
use super::FetchError;
use crate::cache::{CachePolicy, CacheStats, QueryCache};
use crate::domain::{BoundingBox, CategoryFilter};

pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Raw Overpass API response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<Element>,
}

/// Centroid Overpass attaches to ways and relations with `out center`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// A single element from Overpass (node, way or relation)
///
/// Fields not listed here are kept in `extra` so the element serializes back
/// exactly as upstream sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Center>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    /// (lat, lon) of a node, or the centroid of a way/relation
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon, self.center) {
            (Some(lat), Some(lon), _) => Some((lat, lon)),
            (_, _, Some(c)) => Some((c.lat, c.lon)),
            _ => None,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }
}

fn default_overpass_url() -> String {
    OVERPASS_URL.to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OverpassConfig {
    #[serde(default = "default_overpass_url")]
    pub url: String,
    #[serde(default)]
    pub cache: CachePolicy,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: default_overpass_url(),
            cache: CachePolicy::unbounded(),
        }
    }
}

/// Build the Overpass QL query for one category inside `bbox`
///
/// Every amenity becomes an `nwr` clause; `out center` makes Overpass attach
/// a centroid to ways and relations so they can be drawn as points.
pub fn build_query(bbox: &BoundingBox, filter: CategoryFilter) -> String {
    let clauses: String = filter
        .amenities()
        .iter()
        .map(|amenity| format!("  nwr[\"amenity\"=\"{amenity}\"]({bbox});\n"))
        .collect();

    format!("[out:json];\n(\n{clauses});\nout center qt;")
}

fn cache_key(bbox: &BoundingBox, filter: CategoryFilter) -> String {
    format!("{bbox}-{filter}")
}

/// Points of interest from Overpass, memoized per (bounding box, category)
pub struct PoiService<T: Transport> {
    transport: T,
    url: String,
    cache: Mutex<QueryCache<Vec<Element>>>,
}

impl<T: Transport> PoiService<T> {
    pub fn new(transport: T, config: &OverpassConfig) -> Self {
        Self::with_cache(transport, config, QueryCache::new(config.cache))
    }

    /// Use a caller-supplied cache instead of one built from `config.cache`
    pub fn with_cache(
        transport: T,
        config: &OverpassConfig,
        cache: QueryCache<Vec<Element>>,
    ) -> Self {
        Self {
            transport,
            url: config.url.clone(),
            cache: Mutex::new(cache),
        }
    }

    /// Fetch POIs, logging any failure and returning an empty list instead
    pub fn fetch_pois(&self, bbox: &BoundingBox, filter: CategoryFilter) -> Arc<Vec<Element>> {
        self.try_fetch_pois(bbox, filter).unwrap_or_else(|e| {
            tracing::error!(source = "overpass", %bbox, %filter, "Failed to fetch POIs: {e}");
            Arc::new(Vec::new())
        })
    }

    /// Like [`fetch_pois`](Self::fetch_pois) for a category given as a raw tag
    ///
    /// Unknown tags are logged and yield an empty list without touching the
    /// network.
    pub fn fetch_pois_by_tag(&self, bbox: &BoundingBox, tag: &str) -> Arc<Vec<Element>> {
        match tag.parse() {
            Ok(filter) => self.fetch_pois(bbox, filter),
            Err(e) => {
                tracing::error!(source = "overpass", %bbox, "Failed to fetch POIs: {e}");
                Arc::new(Vec::new())
            }
        }
    }

    pub fn try_fetch_pois(
        &self,
        bbox: &BoundingBox,
        filter: CategoryFilter,
    ) -> Result<Arc<Vec<Element>>, FetchError> {
        let key = cache_key(bbox, filter);
        if let Some(hit) = self.lock_cache().get(&key) {
            tracing::debug!(%key, count = hit.len(), "POI cache hit");
            return Ok(hit);
        }

        let query = build_query(bbox, filter);
        tracing::debug!(%key, "POI cache miss, querying Overpass");
        let response: OverpassResponse = get_as(&self.transport, &self.url, &[("data", query)])?;

        Ok(self.lock_cache().insert(key, response.elements))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, QueryCache<Vec<Element>>> {
        // Entries are replaced whole, so a poisoned lock still guards a consistent map
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}
