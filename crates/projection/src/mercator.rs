//! Closed-form spherical Mercator (EPSG:3857) conversions.

use std::f64::consts::PI;

/// Sphere radius used by EPSG:3857, in metres.
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude at which the Mercator world square ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Convert longitude to Web Mercator X coordinate
#[inline]
pub fn lon_to_mercator_x(lon: f64) -> f64 {
    lon.to_radians() * EARTH_RADIUS
}

/// Convert latitude to Web Mercator Y coordinate
#[inline]
pub fn lat_to_mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.to_radians();
    ((PI / 4.0) + (lat_rad / 2.0)).tan().ln() * EARTH_RADIUS
}

/// Convert Web Mercator X coordinate to longitude
#[inline]
pub fn mercator_x_to_lon(x: f64) -> f64 {
    (x / EARTH_RADIUS).to_degrees()
}

/// Convert Web Mercator Y coordinate to latitude
#[inline]
pub fn mercator_y_to_lat(y: f64) -> f64 {
    let y_normalized = y / EARTH_RADIUS;
    (2.0 * y_normalized.exp().atan() - PI / 2.0).to_degrees()
}

/// Project lon/lat degrees to EPSG:3857 in place.
///
/// Latitudes at or beyond the poles become NaN.
pub fn forward_in_place(xs: &mut [f64], ys: &mut [f64]) {
    for (x, y) in xs.iter_mut().zip(ys.iter_mut()) {
        if !y.is_finite() || y.abs() >= 90.0 {
            *x = f64::NAN;
            *y = f64::NAN;
            continue;
        }
        *x = lon_to_mercator_x(*x);
        *y = lat_to_mercator_y(*y);
    }
}

/// Unproject EPSG:3857 metres to lon/lat degrees in place.
pub fn inverse_in_place(xs: &mut [f64], ys: &mut [f64]) {
    for (x, y) in xs.iter_mut().zip(ys.iter_mut()) {
        *x = mercator_x_to_lon(*x);
        *y = mercator_y_to_lat(*y);
    }
}
