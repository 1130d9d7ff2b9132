//! Stream relay: `GET /stream?url=`.
//!
//! Pipes the downloader's stdout into the response body. The body is pulled
//! by hyper as the socket drains, so a slow client throttles the subprocess
//! through the pipe. Headers are committed once the first chunk exists;
//! failures after that point abort the connection.

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde::Deserialize;

use mediarelay_core::{Error, SourceUrl, NO_URL_MESSAGE};

use crate::context::AppContext;
use crate::error::AppError;

/// Query string of `GET /stream`.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(default)]
    pub url: Option<String>,
}

/// GET /stream?url=<source>
pub async fn stream(
    State(ctx): State<AppContext>,
    params: Result<Query<StreamParams>, QueryRejection>,
) -> Response {
    let raw = params.ok().and_then(|Query(p)| p.url);
    let Ok(url) = SourceUrl::parse(raw.as_deref()) else {
        return (StatusCode::BAD_REQUEST, NO_URL_MESSAGE).into_response();
    };

    match relay(&ctx, &url).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn relay(ctx: &AppContext, url: &SourceUrl) -> Result<Response, AppError> {
    let mut bytes = ctx.source.open_stream(url).await?;

    // Hold the headers until the producer proves it is alive; an error
    // before the first byte can still get a structured answer.
    let body = match bytes.next().await {
        Some(Ok(first)) => {
            Body::from_stream(futures::stream::once(async move { Ok(first) }).chain(bytes))
        }
        Some(Err(e)) => return Err(Error::from_stream_error(e).into()),
        None => {
            tracing::warn!("Relay for {url} produced no bytes");
            Body::empty()
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ctx.config.relay.content_type.as_str())
        .header(header::CACHE_CONTROL, "no-store")
        .body(body)
        .map_err(|e| Error::Internal(format!("failed to build stream response: {e}")).into())
}
