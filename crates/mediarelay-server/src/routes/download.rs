//! Metadata resolver: `POST /download`.
//!
//! Runs the downloader once in JSON mode and answers with a normalized
//! [`Metadata`] projection. Nothing is cached; every call spawns a fresh
//! subprocess.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use mediarelay_core::config::RelayMode;
use mediarelay_core::{Error, Metadata, SourceUrl};

use crate::context::AppContext;
use crate::error::AppError;

/// Body of `POST /download`.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// POST /download
pub async fn download(
    State(ctx): State<AppContext>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<Metadata>, AppError> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!("Unreadable /download body: {rejection}");
        Error::InvalidRequest("Invalid request body".into())
    })?;

    let url = SourceUrl::parse(req.url.as_deref())?;

    tracing::info!("Resolving metadata for {url} via {}", ctx.source.name());
    let info = ctx.source.resolve_metadata(&url).await?;

    let metadata = match ctx.config.relay.mode {
        RelayMode::Proxy => Metadata::proxied(info, &url)?,
        RelayMode::Direct => Metadata::direct(info)?,
    };

    tracing::debug!(
        title = metadata.title.as_deref().unwrap_or(""),
        "Resolved metadata for {url}"
    );

    Ok(Json(metadata))
}

#[cfg(test)]
mod tests {
    use crate::router::build_router;
    use crate::test_support::{sample_info, MockSource};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use mediarelay_core::config::{Config, RelayMode};
    use mediarelay_core::{Error, MediaInfo};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::context::AppContext;

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/download")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(ctx: AppContext, req: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(ctx).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_url_is_400_without_spawning() {
        let source = Arc::new(MockSource::metadata(|| Ok(sample_info())));
        for body in [r#"{}"#, r#"{"url": ""}"#, r#"{"url": "   "}"#, r#"{"url": null}"#] {
            let ctx = AppContext::new(Config::default(), source.clone());
            let (status, json) = send(ctx, post(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json, json!({"error": "No URL provided"}));
        }
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let source = Arc::new(MockSource::metadata(|| Ok(sample_info())));
        let ctx = AppContext::new(Config::default(), source.clone());
        let (status, json) = send(ctx, post("not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Invalid request body"}));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn proxy_mode_returns_stream_url() {
        let source = Arc::new(MockSource::metadata(|| Ok(sample_info())));
        let ctx = AppContext::new(Config::default(), source.clone());
        let (status, json) = send(ctx, post(r#"{"url": "https://example.com/v/1"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "title": "T",
                "thumbnail": "http://x/thumb.jpg",
                "streamUrl": "/stream?url=https%3A%2F%2Fexample.com%2Fv%2F1",
            })
        );
        assert_eq!(source.calls(), 1);
        assert_eq!(source.last_url().as_deref(), Some("https://example.com/v/1"));
    }

    #[tokio::test]
    async fn direct_mode_returns_video_url() {
        let mut config = Config::default();
        config.relay.mode = RelayMode::Direct;
        let source = Arc::new(MockSource::metadata(|| Ok(sample_info())));
        let ctx = AppContext::new(config, source);
        let (status, json) = send(ctx, post(r#"{"url": "https://example.com/v/1"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["videoUrl"], "http://x/media.mp4");
        assert!(json.get("streamUrl").is_none());
    }

    #[tokio::test]
    async fn tool_failure_is_500_without_echoing_output() {
        let source = Arc::new(MockSource::metadata(|| {
            Err(Error::tool_failed("yt-dlp", None, "ERROR: cookie=abc123"))
        }));
        let ctx = AppContext::new(Config::default(), source);
        let (status, json) = send(ctx, post(r#"{"url": "https://example.com/v/1"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Error fetching video"}));
    }

    #[tokio::test]
    async fn parse_failure_is_500() {
        let source = Arc::new(MockSource::metadata(|| Err(Error::parse("yt-dlp", "eof"))));
        let ctx = AppContext::new(Config::default(), source);
        let (status, json) = send(ctx, post(r#"{"url": "https://example.com/v/1"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Error parsing video info"}));
    }

    #[tokio::test]
    async fn missing_locator_is_500() {
        let source = Arc::new(MockSource::metadata(|| {
            Ok(MediaInfo {
                title: Some("T".into()),
                ..Default::default()
            })
        }));
        let ctx = AppContext::new(Config::default(), source);
        let (status, json) = send(ctx, post(r#"{"url": "https://example.com/v/1"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Video not found"}));
    }

    #[tokio::test]
    async fn repeated_requests_resolve_again() {
        let source = Arc::new(MockSource::metadata(|| Ok(sample_info())));
        let mut answers = Vec::new();
        for _ in 0..2 {
            let ctx = AppContext::new(Config::default(), source.clone());
            answers.push(send(ctx, post(r#"{"url": "https://example.com/v/1"}"#)).await);
        }
        assert_eq!(answers[0], answers[1]);
        assert_eq!(source.calls(), 2);
    }
}
