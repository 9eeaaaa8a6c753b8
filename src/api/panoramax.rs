use reqwest::Url;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};

use super::FetchError;
use super::http::{Transport, get_as};
use crate::cache::{CachePolicy, CacheStats, QueryCache};
use crate::domain::{ImageRecord, UNKNOWN};

pub const PANORAMAX_URL: &str = "https://api.panoramax.xyz";

/// Search results, a GeoJSON-like feature collection
#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

/// One picture as described by the Panoramax STAC API
#[derive(Debug, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub assets: Option<Assets>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub providers: Vec<Provider>,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    /// `[lon, lat]`
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Assets {
    #[serde(default)]
    pub thumb: Option<Asset>,
}

#[derive(Debug, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub instance_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub name: Option<String>,
}

impl Feature {
    pub fn has_thumbnail(&self) -> bool {
        self.assets
            .as_ref()
            .and_then(|a| a.thumb.as_ref())
            .and_then(|t| t.href.as_deref())
            .is_some_and(|href| !href.is_empty())
    }

    /// Name of the federated instance, taken from the `via` link
    pub fn instance_name(&self) -> &str {
        self.links
            .iter()
            .find(|link| link.rel.as_deref() == Some("via"))
            .and_then(|link| link.instance_name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN)
    }

    pub fn provider_name(&self) -> &str {
        self.providers
            .first()
            .and_then(|p| p.name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN)
    }

    /// `(lat, lon)` from the point geometry
    pub fn position(&self) -> Option<(f64, f64)> {
        match self.geometry.as_ref()?.coordinates.as_slice() {
            [lon, lat, ..] => Some((*lat, *lon)),
            _ => None,
        }
    }
}

fn default_base_url() -> String {
    PANORAMAX_URL.to_string()
}

fn default_search_distance() -> String {
    "0-30".to_string()
}

fn default_fov_tolerance() -> u32 {
    90
}

fn default_limit() -> u32 {
    30
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PanoramaxConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Distance range in meters around the searched point, `min-max`
    #[serde(default = "default_search_distance")]
    pub search_distance: String,
    /// Degrees the camera may point away from the searched point
    #[serde(default = "default_fov_tolerance")]
    pub fov_tolerance: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "CachePolicy::disabled")]
    pub cache: CachePolicy,
}

impl Default for PanoramaxConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_distance: default_search_distance(),
            fov_tolerance: default_fov_tolerance(),
            limit: default_limit(),
            cache: CachePolicy::disabled(),
        }
    }
}

/// Street-level pictures from a Panoramax instance
///
/// Unlike POIs, imagery is not cached unless `[panoramax.cache]` enables it.
pub struct ImageryService<T: Transport> {
    transport: T,
    config: PanoramaxConfig,
    cache: Mutex<QueryCache<Vec<ImageRecord>>>,
}

impl<T: Transport> ImageryService<T> {
    pub fn new(transport: T, config: &PanoramaxConfig) -> Self {
        Self::with_cache(transport, config, QueryCache::new(config.cache))
    }

    pub fn with_cache(
        transport: T,
        config: &PanoramaxConfig,
        cache: QueryCache<Vec<ImageRecord>>,
    ) -> Self {
        Self {
            transport,
            config: config.clone(),
            cache: Mutex::new(cache),
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// `{base}/api/pictures/{id}[/{tail}]`, with the id percent-encoded as a
    /// single path segment
    fn picture_url(&self, picture_id: &str, tail: Option<&str>) -> Result<Url, FetchError> {
        let invalid = |message: String| FetchError::InvalidUrl {
            url: self.config.base_url.clone(),
            message,
        };

        // `..` and `.` would be dropped or resolved instead of sent
        if matches!(picture_id, "" | "." | "..") {
            return Err(invalid(format!("invalid picture id {picture_id:?}")));
        }

        let mut url = Url::parse(self.base_url()).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["api", "pictures", picture_id])
            .extend(tail);
        Ok(url)
    }

    pub fn thumb_url(&self, id: &str) -> Result<String, FetchError> {
        self.picture_url(id, Some("thumb.jpg")).map(String::from)
    }

    pub fn viewer_url(&self, id: &str) -> String {
        format!("{}/#pic={id}&nav=none", self.base_url())
    }

    /// Turn a feature with a thumbnail into an [`ImageRecord`]
    pub fn normalize(&self, feature: &Feature, url: &str) -> Result<ImageRecord, FetchError> {
        let (lat, lng) = feature.position().ok_or_else(|| {
            FetchError::decode(url, format!("picture {} has no point geometry", feature.id))
        })?;

        Ok(ImageRecord {
            id: feature.id.clone(),
            lat,
            lng,
            thumb_url: self.thumb_url(&feature.id)?,
            viewer_url: self.viewer_url(&feature.id),
            instance_name: feature.instance_name().to_string(),
            provider_name: feature.provider_name().to_string(),
        })
    }

    /// Pictures around a point; failures are logged and yield an empty list
    pub fn fetch_images_near(&self, latitude: f64, longitude: f64) -> Vec<ImageRecord> {
        self.try_fetch_images_near(latitude, longitude)
            .map(Arc::unwrap_or_clone)
            .unwrap_or_else(|e| {
                tracing::error!(
                    source = "panoramax",
                    latitude,
                    longitude,
                    "Failed to fetch Panoramax images: {e}"
                );
                Vec::new()
            })
    }

    /// A single picture as a zero- or one-element list
    pub fn fetch_image_by_id(&self, picture_id: &str) -> Vec<ImageRecord> {
        self.try_fetch_image_by_id(picture_id)
            .map(Arc::unwrap_or_clone)
            .unwrap_or_else(|e| {
                tracing::error!(
                    source = "panoramax",
                    picture_id,
                    "Failed to fetch Panoramax image: {e}"
                );
                Vec::new()
            })
    }

    pub fn try_fetch_images_near(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Arc<Vec<ImageRecord>>, FetchError> {
        let key = format!("near:{latitude},{longitude}");
        if let Some(hit) = self.lock_cache().get(&key) {
            tracing::debug!(%key, "imagery cache hit");
            return Ok(hit);
        }

        let url = format!("{}/api/search", self.base_url());
        let query = [
            ("place_distance", self.config.search_distance.clone()),
            ("place_fov_tolerance", self.config.fov_tolerance.to_string()),
            ("limit", self.config.limit.to_string()),
            ("place_position", format!("{longitude},{latitude}")),
        ];
        let collection: FeatureCollection = get_as(&self.transport, &url, &query)?;
        let total = collection.features.len();

        let images = collection
            .features
            .iter()
            .filter(|f| f.has_thumbnail())
            .map(|f| self.normalize(f, &url))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(total, kept = images.len(), "Panoramax search");

        Ok(self.lock_cache().insert(key, images))
    }

    pub fn try_fetch_image_by_id(
        &self,
        picture_id: &str,
    ) -> Result<Arc<Vec<ImageRecord>>, FetchError> {
        let key = format!("id:{picture_id}");
        if let Some(hit) = self.lock_cache().get(&key) {
            tracing::debug!(%key, "imagery cache hit");
            return Ok(hit);
        }

        let url = String::from(self.picture_url(picture_id, None)?);
        let feature: Feature = get_as(&self.transport, &url, &[])?;

        let images = if feature.has_thumbnail() {
            vec![self.normalize(&feature, &url)?]
        } else {
            tracing::debug!(picture_id, "picture has no thumbnail");
            Vec::new()
        };

        Ok(self.lock_cache().insert(key, images))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    fn lock_cache(&self) -> MutexGuard<'_, QueryCache<Vec<ImageRecord>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}
