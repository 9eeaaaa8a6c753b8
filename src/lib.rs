//! panoramax2osm - OpenStreetMap points of interest and Panoramax street-level
//! imagery behind one small blocking API

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;

#[cfg(test)]
mod test_support;
