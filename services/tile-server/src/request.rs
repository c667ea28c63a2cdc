//! Tile request path parsing.
//!
//! Accepted shape:
//!
//! ```text
//! /livemaptiles/{layer}[/cache{N}][/compress{C}]/{z}/{x}/{y}.{bmp|png}
//! ```
//!
//! `layer` is one or more word characters, `N` one or more digits and `C` a
//! single digit. Anything else does not match.

use renderer::TileFormat;
use tile_common::{TileError, TileKey, TileResult};

/// Path prefix served by the dispatcher.
pub const ROUTE_PREFIX: &str = "/livemaptiles/";

/// Value of `Cache-Control` when the request carries no cache segment.
pub const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// A parsed tile request.
///
/// Tile indices are kept wide so that digit strings too large for a tile
/// coordinate still match the route and are rejected later as bad requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub layer: String,
    /// Digits of the cache segment, echoed verbatim into `max-age`.
    pub cache: Option<String>,
    /// PNG compression level, 0 when absent.
    pub compress: u8,
    pub z: u64,
    pub x: u64,
    pub y: u64,
    pub format: TileFormat,
}

impl TileRequest {
    /// Match a request path. Returns `None` when the route does not apply.
    pub fn parse(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(ROUTE_PREFIX)?;
        let segments: Vec<&str> = rest.split('/').collect();
        // layer + optional cache + optional compress + z/x/y.ext
        if segments.len() < 4 || segments.len() > 6 {
            return None;
        }

        let (head, tail) = segments.split_at(segments.len() - 3);
        let layer = head[0];
        if !is_word(layer) {
            return None;
        }

        let mut cache = None;
        let mut compress = 0;
        let mut options = head[1..].iter().peekable();
        if let Some(digits) = options.peek().and_then(|s| s.strip_prefix("cache")) {
            if !is_digits(digits) {
                return None;
            }
            cache = Some(digits.to_string());
            options.next();
        }
        if let Some(digit) = options.peek().and_then(|s| s.strip_prefix("compress")) {
            if digit.len() != 1 || !is_digits(digit) {
                return None;
            }
            compress = digit.as_bytes()[0] - b'0';
            options.next();
        }
        if options.next().is_some() {
            return None;
        }

        let (y, ext) = tail[2].rsplit_once('.')?;
        let format = match ext {
            "png" => TileFormat::Png,
            "bmp" => TileFormat::Bmp,
            _ => return None,
        };
        let [z, x] = [tail[0], tail[1]];
        if ![z, x, y].iter().all(|s| is_digits(s)) {
            return None;
        }

        Some(Self {
            layer: layer.to_string(),
            cache,
            compress,
            z: parse_saturating(z),
            x: parse_saturating(x),
            y: parse_saturating(y),
            format,
        })
    }

    /// Tile key for the request, rejecting indices that cannot be a tile.
    pub fn key(&self) -> TileResult<TileKey> {
        let narrow = |v: u64, name: &str| {
            u32::try_from(v)
                .map_err(|_| TileError::InvalidRequest(format!("{} = {} out of range", name, v)))
        };
        let key = TileKey::new(
            self.layer.clone(),
            narrow(self.z, "z")?,
            narrow(self.x, "x")?,
            narrow(self.y, "y")?,
        );
        key.validate()?;
        Ok(key)
    }

    /// `Cache-Control` header value.
    pub fn cache_control(&self) -> String {
        match &self.cache {
            Some(digits) => format!("max-age={}", digits),
            None => NO_STORE.to_string(),
        }
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_saturating(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_route() {
        let req = TileRequest::parse("/livemaptiles/debug/3/2/1.png").unwrap();
        assert_eq!(req.layer, "debug");
        assert_eq!((req.z, req.x, req.y), (3, 2, 1));
        assert_eq!(req.format, TileFormat::Png);
        assert_eq!(req.cache, None);
        assert_eq!(req.compress, 0);
        assert_eq!(req.cache_control(), NO_STORE);
    }

    #[test]
    fn test_cache_and_compress() {
        let req = TileRequest::parse("/livemaptiles/ortho_2/cache3600/compress9/0/0/0.bmp").unwrap();
        assert_eq!(req.cache.as_deref(), Some("3600"));
        assert_eq!(req.compress, 9);
        assert_eq!(req.format, TileFormat::Bmp);
        assert_eq!(req.cache_control(), "max-age=3600");

        let only_compress = TileRequest::parse("/livemaptiles/a/compress1/0/0/0.png").unwrap();
        assert_eq!(only_compress.cache, None);
        assert_eq!(only_compress.compress, 1);
    }

    #[test]
    fn test_cache_digits_echoed_verbatim() {
        let padded = TileRequest::parse("/livemaptiles/a/cache007/0/0/0.png").unwrap();
        assert_eq!(padded.cache_control(), "max-age=007");

        let long = "184467440737095516160000";
        let huge = TileRequest::parse(&format!("/livemaptiles/a/cache{}/0/0/0.png", long)).unwrap();
        assert_eq!(huge.cache_control(), format!("max-age={}", long));
    }

    #[test]
    fn test_rejects_other_shapes() {
        for path in [
            "/livemaptiles/debug/0/0.png",
            "/livemaptiles/debug/0/0/0.jpg",
            "/livemaptiles/debug/0/0/0",
            "/livemaptiles/de-bug/0/0/0.png",
            "/livemaptiles//0/0/0.png",
            "/livemaptiles/debug/compress10/0/0/0.png",
            "/livemaptiles/debug/compress/0/0/0.png",
            "/livemaptiles/debug/cache/0/0/0.png",
            "/livemaptiles/debug/compress1/cache10/0/0/0.png",
            "/livemaptiles/debug/extra/0/0/0.png",
            "/livemaptiles/debug/0/-1/0.png",
            "/livemaptiles/debug/0/0/0.png/",
            "/tiles/debug/0/0/0.png",
            "/",
        ] {
            assert_eq!(TileRequest::parse(path), None, "{}", path);
        }
    }

    #[test]
    fn test_key_validation() {
        let ok = TileRequest::parse("/livemaptiles/x/2/3/3.png").unwrap();
        assert_eq!(ok.key().unwrap(), TileKey::new("x", 2, 3, 3));

        let outside = TileRequest::parse("/livemaptiles/x/2/4/0.png").unwrap();
        assert!(matches!(outside.key(), Err(TileError::InvalidRequest(_))));

        let huge = TileRequest::parse("/livemaptiles/x/99999999999999999999999/0/0.png").unwrap();
        assert!(matches!(huge.key(), Err(TileError::InvalidRequest(_))));
    }
}
