//! Projection service backed by proj4rs and the crs-definitions database.

use crate::mercator;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::borrow::Cow;
use tile_common::{CrsIdentifier, TileError, TileResult};
use tracing::debug;

/// PROJ.4 definition of WGS84 geographic coordinates.
pub const WGS84_LONGLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Coordinate operations the resampler needs.
///
/// All operations work in place on parallel `xs`/`ys` slices. Geographic
/// coordinates are in degrees. A point that cannot be transformed becomes
/// NaN; only an unusable CRS fails the whole call.
pub trait ProjectionService: Send + Sync {
    /// Project WGS84 lon/lat into `crs`.
    fn forward(&self, crs: &CrsIdentifier, xs: &mut [f64], ys: &mut [f64]) -> TileResult<()>;

    /// Unproject coordinates of `crs` into WGS84 lon/lat.
    fn inverse(&self, crs: &CrsIdentifier, xs: &mut [f64], ys: &mut [f64]) -> TileResult<()>;

    /// Full transform between two CRSs, including any datum shift.
    fn transform(
        &self,
        src: &CrsIdentifier,
        dst: &CrsIdentifier,
        xs: &mut [f64],
        ys: &mut [f64],
    ) -> TileResult<()>;

    /// EPSG codes whose definition declares the WGS84 datum.
    fn wgs84_datum_codes(&self) -> Vec<u32>;
}

/// Look up the PROJ.4 definition for a CRS identifier.
///
/// EPSG references resolve through crs-definitions; raw `+proj=` strings
/// pass through unchanged.
pub fn proj_definition(crs: &CrsIdentifier) -> TileResult<Cow<'static, str>> {
    if let Some(code) = crs.epsg_code() {
        return u16::try_from(code)
            .ok()
            .and_then(crs_definitions::from_code)
            .map(|def| Cow::Borrowed(def.proj4))
            .ok_or_else(|| {
                TileError::Projection(format!("EPSG:{} is not in the crs-definitions database", code))
            });
    }

    if crs.is_proj_definition() {
        return Ok(Cow::Owned(crs.as_str().to_string()));
    }

    Err(TileError::Projection(format!("Unsupported CRS identifier: {}", crs)))
}

fn is_geographic_definition(def: &str) -> bool {
    def.contains("+proj=longlat") || def.contains("+proj=latlong")
}

/// A parsed projection plus whether it takes degrees.
struct Resolved {
    proj: Proj,
    geographic: bool,
}

impl Resolved {
    fn from_definition(def: &str) -> TileResult<Self> {
        let proj = Proj::from_proj_string(def)
            .map_err(|e| TileError::Projection(format!("Invalid projection '{}': {:?}", def, e)))?;
        Ok(Self {
            proj,
            geographic: is_geographic_definition(def),
        })
    }

    fn for_crs(crs: &CrsIdentifier) -> TileResult<Self> {
        Self::from_definition(&proj_definition(crs)?)
    }

    fn wgs84() -> TileResult<Self> {
        Self::from_definition(WGS84_LONGLAT)
    }
}

/// Transform every point, marking failures as NaN. Returns the failure count.
fn transform_points(src: &Resolved, dst: &Resolved, xs: &mut [f64], ys: &mut [f64]) -> usize {
    let mut failed = 0;
    for (x, y) in xs.iter_mut().zip(ys.iter_mut()) {
        if !x.is_finite() || !y.is_finite() {
            *x = f64::NAN;
            *y = f64::NAN;
            failed += 1;
            continue;
        }

        // proj4rs uses radians for geographic coordinates
        let mut point = if src.geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (*x, *y, 0.0)
        };

        match transform(&src.proj, &dst.proj, &mut point) {
            Ok(()) if dst.geographic => {
                *x = point.0.to_degrees();
                *y = point.1.to_degrees();
            }
            Ok(()) => {
                *x = point.0;
                *y = point.1;
            }
            Err(_) => {
                *x = f64::NAN;
                *y = f64::NAN;
                failed += 1;
            }
        }
    }
    failed
}

/// Pure-Rust projection service.
///
/// Spherical Mercator and WGS84 are handled in closed form; everything
/// else goes through proj4rs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Proj4Service;

impl Proj4Service {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectionService for Proj4Service {
    fn forward(&self, crs: &CrsIdentifier, xs: &mut [f64], ys: &mut [f64]) -> TileResult<()> {
        if crs.is_wgs84_geographic() {
            return Ok(());
        }
        if crs.is_spherical_mercator() {
            mercator::forward_in_place(xs, ys);
            return Ok(());
        }

        let dst = Resolved::for_crs(crs)?;
        let failed = transform_points(&Resolved::wgs84()?, &dst, xs, ys);
        if failed > 0 {
            debug!(crs = %crs, failed, "Points outside projection domain");
        }
        Ok(())
    }

    fn inverse(&self, crs: &CrsIdentifier, xs: &mut [f64], ys: &mut [f64]) -> TileResult<()> {
        if crs.is_wgs84_geographic() {
            return Ok(());
        }
        if crs.is_spherical_mercator() {
            mercator::inverse_in_place(xs, ys);
            return Ok(());
        }

        let src = Resolved::for_crs(crs)?;
        let failed = transform_points(&src, &Resolved::wgs84()?, xs, ys);
        if failed > 0 {
            debug!(crs = %crs, failed, "Points outside projection domain");
        }
        Ok(())
    }

    fn transform(
        &self,
        src: &CrsIdentifier,
        dst: &CrsIdentifier,
        xs: &mut [f64],
        ys: &mut [f64],
    ) -> TileResult<()> {
        let src_proj = Resolved::for_crs(src)?;
        let dst_proj = Resolved::for_crs(dst)?;
        let failed = transform_points(&src_proj, &dst_proj, xs, ys);
        if failed > 0 {
            debug!(src = %src, dst = %dst, failed, "Points failed to transform");
        }
        Ok(())
    }

    fn wgs84_datum_codes(&self) -> Vec<u32> {
        (0..=u16::MAX)
            .filter(|&code| {
                crs_definitions::from_code(code)
                    .map_or(false, |def| def.proj4.contains("+datum=WGS84"))
            })
            .map(u32::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proj_definition_lookup() {
        assert!(proj_definition(&CrsIdentifier::web_mercator())
            .unwrap()
            .contains("+proj=merc"));
        assert!(proj_definition(&CrsIdentifier::new("+proj=utm +zone=33 +datum=WGS84"))
            .unwrap()
            .contains("+zone=33"));
        assert!(matches!(
            proj_definition(&CrsIdentifier::new("not a crs")),
            Err(TileError::Projection(_))
        ));
        assert!(matches!(
            proj_definition(&CrsIdentifier::new("EPSG:99999999")),
            Err(TileError::Projection(_))
        ));
    }

    #[test]
    fn test_inverse_mercator_closed_form() {
        let service = Proj4Service::new();
        let mut xs = vec![0.0, tile_common::WEB_MERCATOR_EXTENT];
        let mut ys = vec![0.0, 0.0];
        service
            .inverse(&CrsIdentifier::web_mercator(), &mut xs, &mut ys)
            .unwrap();
        assert!((xs[1] - 180.0).abs() < 1e-9);
        assert!(ys[0].abs() < 1e-9);
    }

    #[test]
    fn test_transform_matches_closed_form() {
        let service = Proj4Service::new();
        let mut xs = vec![1_000_000.0, -5_000_000.0];
        let mut ys = vec![2_000_000.0, 7_000_000.0];
        let (mut cx, mut cy) = (xs.clone(), ys.clone());

        service
            .transform(
                &CrsIdentifier::web_mercator(),
                &CrsIdentifier::wgs84(),
                &mut xs,
                &mut ys,
            )
            .unwrap();
        mercator::inverse_in_place(&mut cx, &mut cy);

        for i in 0..2 {
            assert!((xs[i] - cx[i]).abs() < 1e-6, "{} vs {}", xs[i], cx[i]);
            assert!((ys[i] - cy[i]).abs() < 1e-6, "{} vs {}", ys[i], cy[i]);
        }
    }

    #[test]
    fn test_forward_utm() {
        let service = Proj4Service::new();
        // 15°E is the central meridian of UTM zone 33
        let mut xs = vec![15.0];
        let mut ys = vec![0.0];
        service
            .forward(&CrsIdentifier::epsg(32633), &mut xs, &mut ys)
            .unwrap();
        assert!((xs[0] - 500_000.0).abs() < 1e-3);
        assert!(ys[0].abs() < 1e-3);
    }

    #[test]
    fn test_non_finite_points_become_nan() {
        let service = Proj4Service::new();
        let mut xs = vec![f64::NAN, 0.0];
        let mut ys = vec![0.0, 0.0];
        service
            .transform(
                &CrsIdentifier::web_mercator(),
                &CrsIdentifier::epsg(32633),
                &mut xs,
                &mut ys,
            )
            .unwrap();
        assert!(xs[0].is_nan() && ys[0].is_nan());
        assert!(xs[1].is_finite());
    }
}
