//! Style configuration for scalar layers.

use crate::colormap::{Alpha, ColourRamp, ColourStyle};
use serde::{Deserialize, Serialize};
use tile_common::{TileError, TileResult};

/// Style block of a layer definition.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StyleConfig {
    pub scale_min: Option<f32>,
    pub scale_max: Option<f32>,
    /// Built-in ramp name.
    pub ramp: Option<String>,
    /// Explicit stops; take precedence over `ramp`.
    pub ramp_stops: Option<Vec<ColorStop>>,
    /// Constant opacity in `[0, 1]`.
    pub alpha: Option<f32>,
}

/// Color stop for gradient
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColorStop {
    pub value: f32,
    pub color: String,
    pub label: Option<String>,
}

impl StyleConfig {
    /// Resolve into a colour style, filling gaps from the defaults.
    pub fn to_style(&self) -> TileResult<ColourStyle> {
        let defaults = ColourStyle::default();

        let ramp = match (&self.ramp_stops, &self.ramp) {
            (Some(stops), _) => ColourRamp::from_color_stops(stops)?,
            (None, Some(name)) => name.parse()?,
            (None, None) => defaults.ramp,
        };

        let alpha = match self.alpha {
            Some(a) if !(0.0..=1.0).contains(&a) => {
                return Err(TileError::InvalidSource(format!("alpha {} outside [0, 1]", a)))
            }
            Some(a) => Alpha::Constant(a),
            None => Alpha::Ramp,
        };

        Ok(ColourStyle {
            scale_min: self.scale_min.unwrap_or(defaults.scale_min),
            scale_max: self.scale_max.unwrap_or(defaults.scale_max),
            ramp,
            alpha,
        })
    }
}

/// Parse `#rrggbb` or `#rrggbbaa` to RGBA.
pub fn hex_to_rgba(hex: &str) -> Option<(u8, u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    let a = if hex.len() == 8 {
        u8::from_str_radix(&hex[6..8], 16).ok()?
    } else {
        255
    };

    Some((r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::Color;

    #[test]
    fn test_hex_to_rgba() {
        assert_eq!(hex_to_rgba("#ff8000"), Some((255, 128, 0, 255)));
        assert_eq!(hex_to_rgba("00ff0040"), Some((0, 255, 0, 64)));
        assert_eq!(hex_to_rgba("#fff"), None);
        assert_eq!(hex_to_rgba("#gg0000"), None);
    }

    #[test]
    fn test_defaults() {
        let style = StyleConfig::default().to_style().unwrap();
        assert_eq!(style, ColourStyle::default());
    }

    #[test]
    fn test_stops_override_named_ramp() {
        let config = StyleConfig {
            scale_max: Some(3000.0),
            ramp: Some("viridis".into()),
            ramp_stops: Some(vec![
                ColorStop { value: 0.0, color: "#000000".into(), label: None },
                ColorStop { value: 1.0, color: "#0000ff".into(), label: Some("high".into()) },
            ]),
            alpha: Some(0.8),
            ..Default::default()
        };
        let style = config.to_style().unwrap();
        assert_eq!(style.scale_min, 0.0);
        assert_eq!(style.scale_max, 3000.0);
        assert_eq!(style.ramp.sample(1.0), Color::new(0, 0, 255, 255));
        assert_eq!(style.alpha, Alpha::Constant(0.8));
    }

    #[test]
    fn test_rejects_bad_alpha() {
        let config = StyleConfig {
            alpha: Some(1.5),
            ..Default::default()
        };
        assert!(config.to_style().is_err());
    }
}
