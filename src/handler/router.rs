//! Request entry module
//!
//! Entry point for HTTP request processing: size checks, dispatch to the
//! route table, response compression and access logging.

use crate::config::AppState;
use crate::http::{self, compress};
use crate::invoke;
use crate::logger;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let url = invoke::request_url(req.uri());
    let accepts_gzip = compress::accepts_gzip(req.headers());
    let max_body_size = state.config.http.max_body_size;

    let mut response = match check_body_size(&req, max_body_size) {
        Some(resp) => resp,
        None => state.registry.dispatch(req, max_body_size).await,
    };

    if let Some(threshold) = state.config.http.minimum_compression_size {
        if accepts_gzip {
            response = compress::compress_response(response, threshold).await;
        }
    }

    if state.config.logging.access_log {
        logger::log_access(
            method.as_str(),
            &url,
            response.status().as_u16(),
            started.elapsed(),
        );
    }

    Ok(response)
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::invoke::ProcessInvoker;
    use crate::routing::{RouteRegistry, StaticRouteConfig, RoutePattern};
    use http_body_util::BodyExt;
    use std::collections::HashMap;

    fn state(toml: &str, registry: Arc<RouteRegistry>) -> Arc<AppState> {
        Arc::new(AppState::new(Config::from_toml_str(toml).unwrap(), registry))
    }

    fn registry_with_file(path: &std::path::Path) -> Arc<RouteRegistry> {
        let registry = Arc::new(RouteRegistry::new(Arc::new(ProcessInvoker::new(false))));
        registry.register_static_route(
            Arc::new(StaticRouteConfig {
                pattern: RoutePattern::parse("/big.txt").unwrap(),
                local_path: path.to_path_buf(),
                cors: None,
                response_headers: HashMap::new(),
            }),
            false,
        );
        registry
    }

    #[tokio::test]
    async fn test_content_length_above_limit_is_413() {
        let registry = Arc::new(RouteRegistry::new(Arc::new(ProcessInvoker::new(false))));
        let state = state("[http]\nmax_body_size = 10\n", registry);

        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header("Content-Length", "100")
            .body(Full::new(Bytes::from(vec![0u8; 100])))
            .unwrap();
        let resp = handle_request(req, state).await.unwrap();
        assert_eq!(resp.status(), 413);
    }

    #[tokio::test]
    async fn test_compression_applies_when_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "z".repeat(4096)).unwrap();

        let state = state(
            "[http]\nminimum_compression_size = 1024\n",
            registry_with_file(&file),
        );

        let gzip_req = Request::builder()
            .uri("/big.txt")
            .header("Accept-Encoding", "gzip")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = handle_request(gzip_req, Arc::clone(&state)).await.unwrap();
        assert_eq!(resp.headers()["content-encoding"], "gzip");

        let plain_req = Request::builder()
            .uri("/big.txt")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = handle_request(plain_req, state).await.unwrap();
        assert!(resp.headers().get("content-encoding").is_none());
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), 4096);
    }
}
