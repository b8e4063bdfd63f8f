//! Route path pattern module
//!
//! Gateway-style path patterns: literal segments, `{name}` parameters,
//! and a trailing greedy segment written as `*` or `{name+}`.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Path parameters captured by a match
pub type PathParams = HashMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("path must start with '/'")]
    NotAbsolute,
    #[error("greedy segment must be the last segment")]
    GreedyNotLast,
    #[error("malformed parameter segment '{0}'")]
    MalformedParam(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    /// Matches the rest of the path (zero or more segments)
    Greedy(Option<String>),
}

/// A parsed route path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(PatternError::NotAbsolute);
        };

        let parts = split_segments(rest);
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = parse_segment(part)?;
            if matches!(segment, Segment::Greedy(_)) && i + 1 != parts.len() {
                return Err(PatternError::GreedyNotLast);
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, returning captured parameters on success
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let parts = split_segments(rest);
        let mut params = PathParams::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Greedy(name) => {
                    if let Some(name) = name {
                        params.insert(name.clone(), parts.get(i..).unwrap_or_default().join("/"));
                    }
                    return Some(params);
                }
                Segment::Literal(literal) => {
                    if parts.get(i) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i).filter(|v| !v.is_empty())?;
                    params.insert(name.clone(), (*value).to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Length of the pattern text before its first dynamic segment
    pub fn literal_prefix_len(&self) -> usize {
        self.raw.find(['*', '{']).unwrap_or(self.raw.len())
    }

    /// Number of parameter and greedy segments
    pub fn dynamic_segments(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| !matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Sort key placing more specific patterns first
    pub fn specificity(&self) -> (Reverse<usize>, usize) {
        (Reverse(self.literal_prefix_len()), self.dynamic_segments())
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a path (without its leading slash) into segments, ignoring one trailing slash
fn split_segments(rest: &str) -> Vec<&str> {
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    }
}

fn parse_segment(part: &str) -> Result<Segment, PatternError> {
    if part == "*" {
        return Ok(Segment::Greedy(None));
    }

    let Some(inner) = part.strip_prefix('{') else {
        if part.contains(['{', '}', '*']) {
            return Err(PatternError::MalformedParam(part.to_string()));
        }
        return Ok(Segment::Literal(part.to_string()));
    };

    let name = inner
        .strip_suffix('}')
        .filter(|n| !n.is_empty() && !n.contains(['{', '}', '*']))
        .ok_or_else(|| PatternError::MalformedParam(part.to_string()))?;

    match name.strip_suffix('+') {
        Some("") => Err(PatternError::MalformedParam(part.to_string())),
        Some(greedy) => Ok(Segment::Greedy(Some(greedy.to_string()))),
        None => Ok(Segment::Param(name.to_string())),
    }
}
