//! Image proxy endpoint.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use super::metrics;
use super::state::GuardedImageProxy;
use crate::image_proxy::{ImageRequest, ProxyError};

#[derive(Deserialize, Debug, Default)]
pub struct ImageParams {
    pub url: Option<String>,
    /// Target width in pixels.
    pub w: Option<String>,
    /// JPEG quality.
    pub q: Option<String>,
}

fn parse_dimension(name: &str, raw: Option<&str>) -> Result<Option<u32>, ProxyError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ProxyError::InvalidInput(format!("invalid {}: {}", name, s))),
    }
}

impl TryFrom<ImageParams> for ImageRequest {
    type Error = ProxyError;

    fn try_from(params: ImageParams) -> Result<Self, Self::Error> {
        Ok(ImageRequest {
            width: parse_dimension("width", params.w.as_deref())?,
            quality: parse_dimension("quality", params.q.as_deref())?,
            url: params.url.unwrap_or_default(),
        })
    }
}

fn reject(url: &str, err: ProxyError) -> Response {
    info!("Image proxy rejected {}: {}", url, err);
    metrics::record_proxy_rejection(err.code());
    err.into_response()
}

pub async fn get_image(
    State(proxy): State<GuardedImageProxy>,
    Query(params): Query<ImageParams>,
) -> Response {
    let request = match ImageRequest::try_from(params) {
        Ok(request) => request,
        Err(err) => return reject("", err),
    };

    match proxy.serve(&request).await {
        Ok(image) => ([(header::CONTENT_TYPE, image.content_type)], image.body).into_response(),
        Err(err) => reject(&request.url, err),
    }
}
