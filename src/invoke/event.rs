//! Gateway event construction

use std::collections::HashMap;

use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::Uri;
use serde::{Deserialize, Serialize};

use crate::routing::PathParams;

/// A query parameter given once or several times
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                let first = std::mem::take(first);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }
}

/// The request representation handed to function code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    pub headers: HashMap<String, String>,
    pub path: String,
    pub http_method: String,
    pub query_string_parameters: HashMap<String, QueryValue>,
    pub path_parameters: PathParams,
    /// `None` when no body was sent
    pub body: Option<String>,
}

impl GatewayEvent {
    pub fn from_request(parts: &Parts, body: &Bytes, path_parameters: PathParams) -> Self {
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in &parts.headers {
            let value = String::from_utf8_lossy(value.as_bytes());
            match headers.get_mut(name.as_str()) {
                Some(existing) => {
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
                None => {
                    headers.insert(name.as_str().to_string(), value.into_owned());
                }
            }
        }

        let mut query_string_parameters: HashMap<String, QueryValue> = HashMap::new();
        if let Some(query) = parts.uri.query() {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                let value = value.into_owned();
                match query_string_parameters.get_mut(key.as_ref()) {
                    Some(existing) => existing.push(value),
                    None => {
                        query_string_parameters.insert(key.into_owned(), QueryValue::Single(value));
                    }
                }
            }
        }

        Self {
            headers,
            path: parts.uri.path().to_string(),
            http_method: parts.method.as_str().to_string(),
            query_string_parameters,
            path_parameters,
            body: event_body(parts, body),
        }
    }
}

/// Request URL: path and query
pub fn request_url(uri: &Uri) -> String {
    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

/// Empty bodies become `None`, JSON bodies are re-serialized, anything else is passed as text
fn event_body(parts: &Parts, body: &Bytes) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    let is_json = parts
        .headers
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));

    if is_json {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            return Some(value.to_string());
        }
    }

    Some(String::from_utf8_lossy(body).into_owned())
}
