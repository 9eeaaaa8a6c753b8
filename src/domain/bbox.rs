use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BoundingBoxError {
    #[error("expected 4 comma-separated coordinates (south,west,north,east), got {0}")]
    FieldCount(usize),
    #[error("invalid coordinate {value:?}: {source}")]
    Coordinate {
        value: String,
        source: std::num::ParseFloatError,
    },
}

/// Query region in WGS84 degrees, ordered the way Overpass expects it.
///
/// Ordering and range are not checked: the box is rendered as-is into the
/// query and the cache key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Box of `radius_m` meters around a (lat, lon) center
    pub fn around(center: (f64, f64), radius_m: u32) -> Self {
        let (lat, lon) = center;
        let radius_km = radius_m as f64 / 1000.0;

        // 1 degree latitude ≈ 111 km, longitude shrinks with cos(lat)
        let lat_delta = radius_km / 111.0;
        let lon_delta = radius_km / (111.0 * lat.to_radians().cos());

        Self::new(lat - lat_delta, lon - lon_delta, lat + lat_delta, lon + lon_delta)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BoundingBoxError::FieldCount(parts.len()));
        }

        let mut coords = [0.0; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|source| BoundingBoxError::Coordinate {
                    value: part.to_string(),
                    source,
                })?;
        }

        Ok(Self::new(coords[0], coords[1], coords[2], coords[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let bbox: BoundingBox = "48.8,2.3,48.9,2.4".parse().unwrap();
        assert_eq!(bbox, BoundingBox::new(48.8, 2.3, 48.9, 2.4));
        assert_eq!(bbox.to_string(), "48.8,2.3,48.9,2.4");
    }

    #[test]
    fn test_parse_does_not_check_ordering() {
        let bbox: BoundingBox = "49, 2.4, 48, 2.3".parse().unwrap();
        assert!(bbox.south > bbox.north);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "48.8,2.3,48.9".parse::<BoundingBox>(),
            Err(BoundingBoxError::FieldCount(3))
        );
        assert!(matches!(
            "48.8,2.3,north,2.4".parse::<BoundingBox>(),
            Err(BoundingBoxError::Coordinate { .. })
        ));
    }

    #[test]
    fn test_around() {
        let bbox = BoundingBox::around((37.7749, -122.4194), 10000);

        // 10km radius should give approximately ±0.09 degrees latitude
        assert!((bbox.north - bbox.south - 0.18).abs() < 0.01);
        // Longitude spread should be slightly larger due to cos(lat)
        assert!(bbox.east - bbox.west > bbox.north - bbox.south);
    }
}
