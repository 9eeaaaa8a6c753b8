use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown category filter {0:?} (expected bike, commerce or publicSpace)")]
pub struct UnknownCategory(pub String);

/// Named POI category, each mapping to a fixed set of OSM amenity values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum CategoryFilter {
    Bike,
    Commerce,
    #[value(name = "publicSpace", alias = "public-space")]
    PublicSpace,
}

impl CategoryFilter {
    pub const ALL: [CategoryFilter; 3] = [
        CategoryFilter::Bike,
        CategoryFilter::Commerce,
        CategoryFilter::PublicSpace,
    ];

    /// Tag used in cache keys and on the command line
    pub fn tag(self) -> &'static str {
        match self {
            CategoryFilter::Bike => "bike",
            CategoryFilter::Commerce => "commerce",
            CategoryFilter::PublicSpace => "publicSpace",
        }
    }

    /// `amenity=*` values selected by this category
    pub fn amenities(self) -> &'static [&'static str] {
        match self {
            CategoryFilter::Bike => &["bicycle_repair_station", "bicycle_parking"],
            CategoryFilter::Commerce => &["supermarket", "bakery", "cafe", "restaurant"],
            CategoryFilter::PublicSpace => &["bench", "drinking_water", "toilets"],
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.tag() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_tag() {
        assert_eq!("bike".parse::<CategoryFilter>(), Ok(CategoryFilter::Bike));
        assert_eq!("commerce".parse::<CategoryFilter>(), Ok(CategoryFilter::Commerce));
        assert_eq!("publicSpace".parse::<CategoryFilter>(), Ok(CategoryFilter::PublicSpace));
        assert_eq!(
            "parks".parse::<CategoryFilter>(),
            Err(UnknownCategory("parks".to_string()))
        );
        // Tags are case sensitive
        assert!("Bike".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_tag_roundtrips_through_display() {
        for category in CategoryFilter::ALL {
            assert_eq!(category.to_string().parse::<CategoryFilter>(), Ok(category));
        }
    }

    #[test]
    fn test_amenities() {
        assert_eq!(
            CategoryFilter::Bike.amenities(),
            &["bicycle_repair_station", "bicycle_parking"]
        );
        assert_eq!(CategoryFilter::Commerce.amenities().len(), 4);
        assert!(CategoryFilter::PublicSpace.amenities().contains(&"toilets"));
    }
}
