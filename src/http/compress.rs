//! Response compression module
//!
//! Gzips response bodies at or above a configured size threshold.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use hyper::Response;

use crate::logger;

/// Whether the client accepts gzip-encoded responses
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|coding| {
            let mut params = coding.split(';').map(str::trim);
            matches!(params.next(), Some("gzip" | "*"))
                && !params.any(|p| p.replace(' ', "") == "q=0")
        })
}

/// Gzip the response body when it is at least `threshold` bytes long
pub async fn compress_response(
    response: Response<Full<Bytes>>,
    threshold: usize,
) -> Response<Full<Bytes>> {
    if response.headers().contains_key(CONTENT_ENCODING)
        || response.status() == 204
        || response.status() == 304
    {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let data = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };

    if data.len() < threshold {
        return Response::from_parts(parts, Full::new(data));
    }

    match gzip(&data) {
        Ok(compressed) => {
            parts
                .headers
                .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            parts
                .headers
                .append(VARY, HeaderValue::from_static("Accept-Encoding"));
            parts.headers.insert(CONTENT_LENGTH, compressed.len().into());
            Response::from_parts(parts, Full::new(Bytes::from(compressed)))
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to compress response: {e}"));
            Response::from_parts(parts, Full::new(data))
        }
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn headers(accept: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(ACCEPT_ENCODING, HeaderValue::from_str(accept).unwrap());
        map
    }

    fn text_response(body: &str) -> Response<Full<Bytes>> {
        Response::new(Full::new(Bytes::from(body.to_string())))
    }

    async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_accepts_gzip() {
        assert!(accepts_gzip(&headers("gzip, deflate, br")));
        assert!(accepts_gzip(&headers("br;q=1.0, gzip;q=0.8")));
        assert!(accepts_gzip(&headers("*")));
        assert!(!accepts_gzip(&headers("gzip;q=0")));
        assert!(!accepts_gzip(&headers("deflate, br")));
        assert!(!accepts_gzip(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn test_compresses_above_threshold() {
        let body = "a".repeat(2048);
        let response = compress_response(text_response(&body), 1024).await;

        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
        assert_eq!(response.headers()[VARY], "Accept-Encoding");

        let compressed = body_bytes(response).await;
        let mut decoded = String::new();
        GzDecoder::new(&compressed[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, body);
    }

    #[tokio::test]
    async fn test_small_body_untouched() {
        let response = compress_response(text_response("tiny"), 1024).await;
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
        assert_eq!(body_bytes(response).await, Bytes::from("tiny"));
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let response = compress_response(text_response("12345"), 5).await;
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
    }
}
