//! Projection relationship classification.
//!
//! Picks the cheapest way to map EPSG:3857 tile coordinates into a source CRS.
//! The decision depends only on the source CRS, never on the tile.

use crate::datum::DatumEquivalenceTable;
use std::fmt;
use tile_common::{AffineTransform, CrsIdentifier, TileResult};
use tracing::debug;

/// How tile coordinates reach the source CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FastPath {
    /// Source is EPSG:3857; only the source affine is needed.
    SameProjection,
    /// Source is WGS84 lon/lat; one closed-form Mercator inverse.
    SameDatumGeographic,
    /// Source shares the WGS84 datum; inverse Mercator then forward projection.
    SameDatumOther,
    /// Anything else; full datum-aware transform.
    GeneralTransform,
}

impl FastPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            FastPath::SameProjection => "same_projection",
            FastPath::SameDatumGeographic => "same_datum_geographic",
            FastPath::SameDatumOther => "same_datum_other",
            FastPath::GeneralTransform => "general_transform",
        }
    }
}

impl fmt::Display for FastPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies source CRSs against a datum equivalence table.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionClassifier<'a> {
    table: &'a DatumEquivalenceTable,
}

impl<'a> ProjectionClassifier<'a> {
    pub fn new(table: &'a DatumEquivalenceTable) -> Self {
        Self { table }
    }

    /// First match wins.
    pub fn classify(&self, crs: &CrsIdentifier) -> FastPath {
        if crs.is_spherical_mercator() {
            FastPath::SameProjection
        } else if crs.is_wgs84_geographic() {
            FastPath::SameDatumGeographic
        } else if crs.epsg_code().map_or(false, |code| self.table.contains(code)) {
            FastPath::SameDatumOther
        } else {
            FastPath::GeneralTransform
        }
    }
}

impl ProjectionClassifier<'static> {
    /// Classifier over the process-wide table.
    pub fn global() -> Self {
        Self::new(DatumEquivalenceTable::global())
    }
}

/// Georeferencing of a source grid, validated and classified once.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGeoreference {
    affine: AffineTransform,
    inverse: AffineTransform,
    crs: CrsIdentifier,
    fast_path: FastPath,
}

impl SourceGeoreference {
    /// Fails with `DegenerateTransform` if `affine` is not invertible.
    pub fn new(affine: AffineTransform, crs: CrsIdentifier) -> TileResult<Self> {
        Self::with_classifier(affine, crs, &ProjectionClassifier::global())
    }

    pub fn with_classifier(
        affine: AffineTransform,
        crs: CrsIdentifier,
        classifier: &ProjectionClassifier<'_>,
    ) -> TileResult<Self> {
        let inverse = affine.invert()?;
        let fast_path = classifier.classify(&crs);
        debug!(crs = %crs, fast_path = %fast_path, "Classified source projection");
        Ok(Self {
            affine,
            inverse,
            crs,
            fast_path,
        })
    }

    pub fn affine(&self) -> &AffineTransform {
        &self.affine
    }

    /// Maps source CRS coordinates to fractional (col, row).
    pub fn inverse_affine(&self) -> &AffineTransform {
        &self.inverse
    }

    pub fn crs(&self) -> &CrsIdentifier {
        &self.crs
    }

    pub fn fast_path(&self) -> FastPath {
        self.fast_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_common::TileError;

    fn synthetic_table() -> DatumEquivalenceTable {
        DatumEquivalenceTable::from_codes([4326, 32633, 9999])
    }

    #[test]
    fn test_same_projection_branch() {
        let table = synthetic_table();
        let classifier = ProjectionClassifier::new(&table);
        for crs in ["EPSG:3857", "epsg:3857", "EPSG:900913", "+init=epsg:3857"] {
            assert_eq!(
                classifier.classify(&CrsIdentifier::new(crs)),
                FastPath::SameProjection,
                "{}",
                crs
            );
        }
    }

    #[test]
    fn test_same_datum_geographic_branch() {
        let table = synthetic_table();
        let classifier = ProjectionClassifier::new(&table);
        for crs in ["EPSG:4326", "CRS:84", "+init=epsg:4326"] {
            assert_eq!(
                classifier.classify(&CrsIdentifier::new(crs)),
                FastPath::SameDatumGeographic,
                "{}",
                crs
            );
        }
    }

    #[test]
    fn test_same_datum_other_branch() {
        let table = synthetic_table();
        let classifier = ProjectionClassifier::new(&table);
        assert_eq!(
            classifier.classify(&CrsIdentifier::new("EPSG:32633")),
            FastPath::SameDatumOther
        );
        assert_eq!(
            classifier.classify(&CrsIdentifier::new("EPSG:9999")),
            FastPath::SameDatumOther
        );
    }

    #[test]
    fn test_general_transform_branch() {
        let table = synthetic_table();
        let classifier = ProjectionClassifier::new(&table);
        for crs in ["EPSG:27700", "+proj=utm +zone=33 +datum=WGS84", "EPSG:32634"] {
            assert_eq!(
                classifier.classify(&CrsIdentifier::new(crs)),
                FastPath::GeneralTransform,
                "{}",
                crs
            );
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let table = synthetic_table();
        let classifier = ProjectionClassifier::new(&table);
        let crs = CrsIdentifier::new("EPSG:32633");
        let first = classifier.classify(&crs);
        for _ in 0..10 {
            assert_eq!(classifier.classify(&crs), first);
        }
    }

    #[test]
    fn test_georeference_rejects_degenerate_affine() {
        let table = synthetic_table();
        let classifier = ProjectionClassifier::new(&table);
        let result = SourceGeoreference::with_classifier(
            AffineTransform::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            CrsIdentifier::wgs84(),
            &classifier,
        );
        assert!(matches!(result, Err(TileError::DegenerateTransform(_))));
    }
}
