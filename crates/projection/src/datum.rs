//! EPSG codes that share the WGS84 datum with spherical Mercator.

use crate::service::{Proj4Service, ProjectionService};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::info;

static GLOBAL_TABLE: Lazy<DatumEquivalenceTable> = Lazy::new(|| {
    let table = DatumEquivalenceTable::from_service(&Proj4Service::new());
    info!(codes = table.len(), "Built WGS84 datum equivalence table");
    table
});

/// Set of EPSG codes whose definition declares `+datum=WGS84`.
///
/// Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct DatumEquivalenceTable {
    codes: HashSet<u32>,
}

impl DatumEquivalenceTable {
    /// Table built from the bundled crs-definitions database, shared by the
    /// whole process and built on first use.
    pub fn global() -> &'static DatumEquivalenceTable {
        &GLOBAL_TABLE
    }

    pub fn from_service(service: &dyn ProjectionService) -> Self {
        Self::from_codes(service.wgs84_datum_codes())
    }

    pub fn from_codes(codes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn contains(&self, code: u32) -> bool {
        self.codes.contains(&code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
