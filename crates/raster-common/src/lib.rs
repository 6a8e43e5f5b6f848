//! Common types and utilities shared across the raster sampling crates.

pub mod bbox;
pub mod crs;
pub mod point;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::Crs;
pub use point::{CoordinateError, GeoPoint};
pub use time::{expand_date_range, parse_date, TimeParseError, DATE_FORMAT};
