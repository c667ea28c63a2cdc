//! Tile dispatcher.
//!
//! Every path on the tile listener ends up here. Paths that are not a tile
//! route get a bare 404; a tile route for a layer that is not registered gets
//! a placeholder tile with status 200.

use axum::{
    body::Body,
    extract::Extension,
    http::{header, Method, StatusCode, Uri},
    response::Response,
};
use renderer::{encode, missing_layer_tile, TileFormat, TileProducer};
use std::sync::Arc;
use tile_common::{TileError, TileKey, TileResult};
use tracing::{debug, error, instrument, warn};

use crate::metrics::{record_encode_bytes, record_request, Outcome, Timer};
use crate::request::TileRequest;
use crate::state::AppState;

/// Fallback handler serving `/livemaptiles/...` tile requests.
#[instrument(skip(state), fields(path = %uri.path()))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    let Some(request) = TileRequest::parse(uri.path()) else {
        record_request(Outcome::NotFound);
        return empty(StatusCode::NOT_FOUND);
    };
    if method != Method::GET && method != Method::HEAD {
        return empty(StatusCode::METHOD_NOT_ALLOWED);
    }

    let (job, outcome) = match state.registry.lookup(&request.layer) {
        Some(producer) => match request.key() {
            Ok(key) => {
                debug!(layer = %key.layer, z = key.z, x = key.x, y = key.y, "Tile request");
                (RenderJob::Layer(producer, key), Outcome::Rendered)
            }
            Err(e) => {
                debug!(error = %e, "Rejected tile request");
                record_request(Outcome::BadRequest);
                return empty(StatusCode::BAD_REQUEST);
            }
        },
        None => {
            warn!(layer = %request.layer, "Layer does not exist");
            (RenderJob::Missing, Outcome::UnknownLayer)
        }
    };

    let format = request.format;
    let level = request.compress;
    let rendered = tokio::task::spawn_blocking(move || job.run(format, level))
        .await
        .unwrap_or_else(|e| Err(TileError::Internal(format!("render task failed: {}", e))));

    match rendered {
        Ok(bytes) => {
            record_request(outcome);
            record_encode_bytes(bytes.len());
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, format.content_type())
                .header(header::CACHE_CONTROL, request.cache_control())
                .body(Body::from(bytes))
                .unwrap_or_else(|_| empty(StatusCode::INTERNAL_SERVER_ERROR))
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                error!(layer = %request.layer, error = %e, "Tile render failed");
                record_request(Outcome::Failed);
            } else {
                record_request(Outcome::BadRequest);
            }
            empty(status)
        }
    }
}

/// Work done off the async runtime for one request.
enum RenderJob {
    Layer(Arc<TileProducer>, TileKey),
    Missing,
}

impl RenderJob {
    fn run(self, format: TileFormat, level: u8) -> TileResult<Vec<u8>> {
        let image = match self {
            RenderJob::Layer(producer, key) => {
                let timer = Timer::start();
                let image = producer.produce(&key)?;
                timer.record_render();
                image
            }
            RenderJob::Missing => missing_layer_tile(),
        };
        encode(&image, format, u32::from(level))
    }
}

fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
