//! Static file serving module
//!
//! Serves the single local file behind a static route, with `ETag` validation
//! and optional CORS headers.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::{Method, Response};
use tokio::fs;

use crate::http::{self, etag};
use crate::logger;
use crate::routing::StaticRouteConfig;

/// Serve a request for a static route
pub async fn serve_static_file(
    parts: &Parts,
    route: &StaticRouteConfig,
    cors_enabled: bool,
) -> Response<Full<Bytes>> {
    if parts.method == Method::OPTIONS {
        return http::build_options_response(cors_enabled);
    }

    let content = match fs::read(&route.local_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_warning(&format!(
                "Failed to read static file '{}' for {}: {e}",
                route.local_path.display(),
                route.pattern
            ));
            return http::build_404_response();
        }
    };

    let etag = etag::generate_etag(&content);
    let if_none_match = parts
        .headers
        .get(hyper::header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if etag::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    let content_type = mime_guess::from_path(&route.local_path).first_or_octet_stream();

    http::build_static_response(
        Bytes::from(content),
        content_type.as_ref(),
        &etag,
        parts.method == Method::HEAD,
        cors_enabled,
        &route.response_headers,
    )
}
