//! Coordinate Reference System identifiers.
//!
//! Rasters carry their CRS as an EPSG code read from the GeoTIFF key
//! directory. Projection definitions are looked up from the bundled
//! `crs-definitions` database.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An EPSG-coded coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    epsg: u16,
}

impl Crs {
    /// WGS84 geographic (lon/lat in degrees).
    pub const WGS84: Crs = Crs { epsg: 4326 };

    /// Create a CRS from its EPSG code.
    pub const fn from_epsg(epsg: u16) -> Self {
        Self { epsg }
    }

    /// The EPSG code.
    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    /// PROJ.4 definition string for this CRS, if it is known.
    pub fn proj4_definition(&self) -> Option<&'static str> {
        crs_definitions::from_code(self.epsg).map(|def| def.proj4)
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        match self.proj4_definition() {
            Some(proj) => proj.contains("+proj=longlat"),
            // Unknown codes in the geographic block are treated as lon/lat
            None => (4000..5000).contains(&self.epsg),
        }
    }

    /// Check if this is WGS84 itself.
    pub fn is_wgs84(&self) -> bool {
        self.epsg == Self::WGS84.epsg
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}
