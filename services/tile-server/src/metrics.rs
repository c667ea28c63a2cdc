//! Tile request metrics.
//!
//! Recorded through the `metrics` facade; a Prometheus recorder installed by
//! the binary turns them into the admin `/metrics` output. Without a
//! recorder every call is a no-op.

use metrics::{counter, histogram};
use std::time::Instant;

/// How a tile request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rendered,
    UnknownLayer,
    BadRequest,
    NotFound,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Rendered => "rendered",
            Outcome::UnknownLayer => "unknown_layer",
            Outcome::BadRequest => "bad_request",
            Outcome::NotFound => "not_found",
            Outcome::Failed => "failed",
        }
    }
}

pub fn record_request(outcome: Outcome) {
    counter!("tile_requests_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_encode_bytes(bytes: usize) {
    histogram!("tile_encode_bytes").record(bytes as f64);
}

/// Timer for measuring render duration.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Record the elapsed time as one tile render.
    pub fn record_render(self) {
        histogram!("tile_render_duration_seconds").record(self.elapsed_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Rendered.as_str(), "rendered");
        assert_eq!(Outcome::UnknownLayer.as_str(), "unknown_layer");
    }

    #[test]
    fn test_recording_without_recorder() {
        record_request(Outcome::NotFound);
        record_encode_bytes(10);
        let timer = Timer::start();
        assert!(timer.elapsed_secs() >= 0.0);
        timer.record_render();
    }
}
