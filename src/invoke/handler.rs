//! Function request handling: cache lookup, invocation, response translation

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::{Response, StatusCode};

use super::{request_url, FunctionInvoker, GatewayEvent};
use crate::cache::ResultCache;
use crate::config::FunctionRouteConfig;
use crate::http;
use crate::logger;
use crate::routing::PathParams;

/// Cache key of a request: method, path and query
///
/// A route may answer several methods (`ANY`, HEAD on GET), so the method is
/// part of the key.
fn cache_key(parts: &Parts) -> String {
    format!("{} {}", parts.method, request_url(&parts.uri))
}

/// Serve a request for a function route
///
/// Cache hits skip the invocation entirely. Invocation failures of any kind
/// become a 500 whose body is the error text.
pub async fn handle_function_request(
    parts: &Parts,
    body: &Bytes,
    config: &FunctionRouteConfig,
    cache: Option<&ResultCache>,
    invoker: &dyn FunctionInvoker,
    path_parameters: PathParams,
) -> Response<Full<Bytes>> {
    let key = cache_key(parts);

    if let Some(entry) = cache.and_then(|c| c.get(&key)) {
        logger::log_cache_hit(&key);
        return http::build_function_response(&entry);
    }

    let event = GatewayEvent::from_request(parts, body, path_parameters);

    match invoker.invoke(&event, config).await {
        Ok(result) => {
            let entry = result.into_entry();
            let response = http::build_function_response(&entry);
            // An entry that could not be turned into a 200 response is never stored
            if response.status() == StatusCode::OK {
                if let Some(cache) = cache {
                    cache.set(&key, entry);
                }
            }
            response
        }
        Err(e) => {
            logger::log_error(&format!(
                "Function {} failed for {key}: {e}",
                config.route_id()
            ));
            http::build_500_response(&e.to_string())
        }
    }
}
