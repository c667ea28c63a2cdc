//! Colour mapping of scalar tiles.

use crate::tile_image::TileImage;
use crate::resample::SampledGrid;
use crate::style::{hex_to_rgba, ColorStop};
use image::{Rgba, RgbaImage};
use std::fmt;
use std::str::FromStr;
use tile_common::{TileError, TileResult};

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }
}

/// Linear color interpolation
fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color::new(
        lerp(color1.r, color2.r),
        lerp(color1.g, color2.g),
        lerp(color1.b, color2.b),
        lerp(color1.a, color2.a),
    )
}

/// Piecewise-linear map from `[0, 1]` to colours.
#[derive(Debug, Clone, PartialEq)]
pub struct ColourRamp {
    /// Sorted by position, first at 0 and last at 1 after normalisation.
    stops: Vec<(f32, Color)>,
}

impl ColourRamp {
    /// Build from `(position, colour)` stops.
    ///
    /// Positions are rescaled so the first stop sits at 0 and the last at 1.
    pub fn from_stops(mut stops: Vec<(f32, Color)>) -> TileResult<Self> {
        if stops.is_empty() {
            return Err(TileError::InvalidSource("colour ramp needs at least one stop".into()));
        }
        if stops.iter().any(|(p, _)| !p.is_finite()) {
            return Err(TileError::InvalidSource("colour ramp stop position is not finite".into()));
        }
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (lo, hi) = (stops[0].0, stops[stops.len() - 1].0);
        let span = hi - lo;
        for (p, _) in stops.iter_mut() {
            *p = if span > 0.0 { (*p - lo) / span } else { 0.0 };
        }
        Ok(Self { stops })
    }

    /// Build from configured hex stops.
    pub fn from_color_stops(stops: &[ColorStop]) -> TileResult<Self> {
        let parsed = stops
            .iter()
            .map(|s| {
                hex_to_rgba(&s.color)
                    .map(|(r, g, b, a)| (s.value, Color::new(r, g, b, a)))
                    .ok_or_else(|| TileError::InvalidSource(format!("invalid colour '{}'", s.color)))
            })
            .collect::<TileResult<Vec<_>>>()?;
        Self::from_stops(parsed)
    }

    pub fn two_colour(start: Color, end: Color) -> Self {
        Self {
            stops: vec![(0.0, start), (1.0, end)],
        }
    }

    /// White to black.
    pub fn binary() -> Self {
        Self::two_colour(Color::WHITE, Color::BLACK)
    }

    /// Black to white.
    pub fn greys() -> Self {
        Self::two_colour(Color::BLACK, Color::WHITE)
    }

    pub fn viridis() -> Self {
        Self {
            stops: vec![
                (0.0, Color::new(68, 1, 84, 255)),
                (0.125, Color::new(71, 44, 122, 255)),
                (0.25, Color::new(59, 81, 139, 255)),
                (0.375, Color::new(44, 113, 142, 255)),
                (0.5, Color::new(33, 144, 141, 255)),
                (0.625, Color::new(39, 173, 129, 255)),
                (0.75, Color::new(92, 200, 99, 255)),
                (0.875, Color::new(170, 220, 50, 255)),
                (1.0, Color::new(253, 231, 37, 255)),
            ],
        }
    }

    /// Colour at `t`, clamped to `[0, 1]`.
    pub fn sample(&self, t: f32) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let first = self.stops[0];
        if t <= first.0 {
            return first.1;
        }
        for pair in self.stops.windows(2) {
            let ((p0, c0), (p1, c1)) = (pair[0], pair[1]);
            if t <= p1 {
                let span = p1 - p0;
                let local = if span > 0.0 { (t - p0) / span } else { 1.0 };
                return interpolate_color(c0, c1, local);
            }
        }
        self.stops[self.stops.len() - 1].1
    }

    pub fn stops(&self) -> &[(f32, Color)] {
        &self.stops
    }
}

impl Default for ColourRamp {
    fn default() -> Self {
        Self::binary()
    }
}

impl FromStr for ColourRamp {
    type Err = TileError;

    fn from_str(s: &str) -> TileResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::binary()),
            "greys" | "grays" | "gray" => Ok(Self::greys()),
            "viridis" => Ok(Self::viridis()),
            other => Err(TileError::InvalidSource(format!("unknown colour ramp '{}'", other))),
        }
    }
}

/// Opacity applied on top of the ramp colour.
#[derive(Debug, Clone, PartialEq)]
pub enum Alpha {
    /// Ramp alpha, unchanged.
    Ramp,
    /// One opacity in `[0, 1]` for every pixel.
    Constant(f32),
    /// One opacity per pixel, row-major.
    PerPixel(Vec<f32>),
}

impl Default for Alpha {
    fn default() -> Self {
        Alpha::Ramp
    }
}

impl Alpha {
    #[inline]
    fn apply(&self, idx: usize, base: u8) -> u8 {
        let factor = match self {
            Alpha::Ramp => return base,
            Alpha::Constant(a) => *a,
            Alpha::PerPixel(v) => v[idx],
        };
        if factor.is_nan() {
            return 0;
        }
        (factor.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Value range, ramp and opacity for a scalar layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ColourStyle {
    pub scale_min: f32,
    pub scale_max: f32,
    pub ramp: ColourRamp,
    pub alpha: Alpha,
}

impl Default for ColourStyle {
    fn default() -> Self {
        Self {
            scale_min: 0.0,
            scale_max: 1.0,
            ramp: ColourRamp::default(),
            alpha: Alpha::default(),
        }
    }
}

impl fmt::Display for ColourStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] over {} stops",
            self.scale_min,
            self.scale_max,
            self.ramp.stops.len()
        )
    }
}

impl ColourStyle {
    /// Normalised position of `value` in the scale range.
    ///
    /// A zero-width range maps everything to 0.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.scale_max - self.scale_min;
        if range == 0.0 {
            0.0
        } else {
            (value - self.scale_min) / range
        }
    }

    /// Colour band 0 of `grid`.
    pub fn colourize(&self, grid: &SampledGrid<f32>) -> TileResult<TileImage> {
        let (width, height) = (grid.width(), grid.height());
        colourize(
            grid.data.index_axis(ndarray::Axis(0), 0).iter().copied(),
            &grid.mask,
            width,
            height,
            self,
        )
    }
}

/// Colour a row-major sequence of values.
///
/// Masked and NaN cells become fully transparent.
pub fn colourize<I>(values: I, mask: &[bool], width: usize, height: usize, style: &ColourStyle) -> TileResult<TileImage>
where
    I: IntoIterator<Item = f32>,
{
    let n = width * height;
    if mask.len() != n {
        return Err(TileError::InvalidSource(format!(
            "mask has {} entries for {} pixels",
            mask.len(),
            n
        )));
    }
    if let Alpha::PerPixel(v) = &style.alpha {
        if v.len() != n {
            return Err(TileError::InvalidSource(format!(
                "per-pixel alpha has {} entries for {} pixels",
                v.len(),
                n
            )));
        }
    }

    let mut img = RgbaImage::new(width as u32, height as u32);
    for (idx, (value, (pixel, valid))) in values
        .into_iter()
        .zip(img.pixels_mut().zip(mask))
        .enumerate()
    {
        if !*valid || value.is_nan() {
            *pixel = Rgba([0, 0, 0, 0]);
            continue;
        }
        let c = style.ramp.sample(style.normalize(value));
        *pixel = Rgba([c.r, c.g, c.b, style.alpha.apply(idx, c.a)]);
    }
    Ok(TileImage::Rgba(img))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_endpoints_exact() {
        let ramp = ColourRamp::viridis();
        assert_eq!(ramp.sample(0.0), Color::new(68, 1, 84, 255));
        assert_eq!(ramp.sample(1.0), Color::new(253, 231, 37, 255));
        assert_eq!(ramp.sample(-3.0), ramp.sample(0.0));
        assert_eq!(ramp.sample(7.0), ramp.sample(1.0));
    }

    #[test]
    fn test_greys_monotonic() {
        let ramp = ColourRamp::greys();
        let mut last = 0u8;
        for i in 0..=100 {
            let c = ramp.sample(i as f32 / 100.0);
            assert!(c.r >= last);
            assert_eq!(c.r, c.g);
            last = c.r;
        }
        assert_eq!(last, 255);
    }

    #[test]
    fn test_from_stops_normalises_positions() {
        let ramp = ColourRamp::from_stops(vec![
            (10.0, Color::WHITE),
            (-10.0, Color::BLACK),
            (0.0, Color::new(255, 0, 0, 255)),
        ])
        .unwrap();
        assert_eq!(ramp.stops()[0].0, 0.0);
        assert_eq!(ramp.stops()[1].0, 0.5);
        assert_eq!(ramp.sample(0.5), Color::new(255, 0, 0, 255));
        assert!(ColourRamp::from_stops(vec![]).is_err());
    }

    #[test]
    fn test_from_color_stops() {
        let stops = vec![
            ColorStop { value: 0.0, color: "#000000".into(), label: None },
            ColorStop { value: 1.0, color: "#ff000080".into(), label: None },
        ];
        let ramp = ColourRamp::from_color_stops(&stops).unwrap();
        assert_eq!(ramp.sample(1.0), Color::new(255, 0, 0, 128));

        let bad = vec![ColorStop { value: 0.0, color: "red".into(), label: None }];
        assert!(ColourRamp::from_color_stops(&bad).is_err());
    }

    #[test]
    fn test_named_ramps() {
        assert_eq!("Viridis".parse::<ColourRamp>().unwrap(), ColourRamp::viridis());
        assert_eq!("binary".parse::<ColourRamp>().unwrap().sample(0.0), Color::WHITE);
        assert!("jet".parse::<ColourRamp>().is_err());
    }

    #[test]
    fn test_masked_and_nan_are_transparent() {
        let style = ColourStyle::default();
        let img = colourize([0.0, f32::NAN, 1.0, 0.5], &[true, true, false, true], 2, 2, &style).unwrap();
        let TileImage::Rgba(img) = img else { panic!("expected RGBA") };
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(1, 1).0[3], 255);
    }

    #[test]
    fn test_zero_width_scale() {
        let style = ColourStyle {
            scale_min: 3.0,
            scale_max: 3.0,
            ramp: ColourRamp::greys(),
            alpha: Alpha::Ramp,
        };
        let img = colourize([100.0], &[true], 1, 1, &style).unwrap();
        let TileImage::Rgba(img) = img else { panic!("expected RGBA") };
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_alpha_modes() {
        let mut style = ColourStyle {
            alpha: Alpha::Constant(0.5),
            ..ColourStyle::default()
        };
        let img = colourize([0.0, 1.0], &[true, true], 2, 1, &style).unwrap();
        let TileImage::Rgba(img) = img else { panic!("expected RGBA") };
        assert_eq!(img.get_pixel(0, 0).0[3], 128);

        style.alpha = Alpha::PerPixel(vec![0.0, 1.0]);
        let img = colourize([0.0, 1.0], &[true, true], 2, 1, &style).unwrap();
        let TileImage::Rgba(img) = img else { panic!("expected RGBA") };
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(1, 0).0[3], 255);

        style.alpha = Alpha::PerPixel(vec![1.0]);
        assert!(colourize([0.0, 1.0], &[true, true], 2, 1, &style).is_err());
    }
}
