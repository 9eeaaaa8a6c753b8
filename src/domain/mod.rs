pub mod bbox;
pub mod category;
pub mod image;

pub use bbox::{BoundingBox, BoundingBoxError};
pub use category::{CategoryFilter, UnknownCategory};
pub use image::{ImageRecord, UNKNOWN};
