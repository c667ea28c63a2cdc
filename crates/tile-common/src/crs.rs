//! Coordinate Reference System identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG code of spherical (web) Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// EPSG code of WGS84 geographic coordinates.
pub const EPSG_WGS84: u32 = 4326;

/// An opaque CRS identifier as supplied by the caller.
///
/// Accepts formats like:
/// - "EPSG:4326" / "epsg:32633"
/// - "CRS:84" (equivalent to EPSG:4326)
/// - "EPSG:900913" (legacy alias of EPSG:3857)
/// - "+init=epsg:3857"
/// - a full PROJ.4 definition such as "+proj=utm +zone=33 +datum=WGS84"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrsIdentifier(String);

impl CrsIdentifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_string())
    }

    /// Identifier for an EPSG code, e.g. `CrsIdentifier::epsg(3857)`.
    pub fn epsg(code: u32) -> Self {
        Self(format!("EPSG:{}", code))
    }

    pub fn web_mercator() -> Self {
        Self::epsg(EPSG_WEB_MERCATOR)
    }

    pub fn wgs84() -> Self {
        Self::epsg(EPSG_WGS84)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The EPSG code this identifier refers to, if it names one.
    ///
    /// Aliases are resolved: `CRS:84` is 4326 and `EPSG:900913` is 3857.
    /// A PROJ.4 string only yields a code when it carries `+init=epsg:NNNN`.
    pub fn epsg_code(&self) -> Option<u32> {
        let lower = self.0.to_ascii_lowercase();

        if lower == "crs:84" {
            return Some(EPSG_WGS84);
        }

        let digits = if let Some(rest) = lower.strip_prefix("epsg:") {
            rest
        } else if let Some(pos) = lower.find("+init=epsg:") {
            let rest = &lower[pos + "+init=epsg:".len()..];
            rest.split(|c: char| !c.is_ascii_digit()).next().unwrap_or("")
        } else {
            return None;
        };

        match digits.parse::<u32>().ok()? {
            900913 => Some(EPSG_WEB_MERCATOR),
            code => Some(code),
        }
    }

    /// True for EPSG:3857 and its aliases.
    pub fn is_spherical_mercator(&self) -> bool {
        self.epsg_code() == Some(EPSG_WEB_MERCATOR)
    }

    /// True for EPSG:4326 and CRS:84.
    pub fn is_wgs84_geographic(&self) -> bool {
        self.epsg_code() == Some(EPSG_WGS84)
    }

    /// True if this is a raw PROJ.4 definition without an EPSG reference.
    pub fn is_proj_definition(&self) -> bool {
        self.0.starts_with('+') && self.epsg_code().is_none()
    }
}

impl fmt::Display for CrsIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CrsIdentifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CrsIdentifier {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
