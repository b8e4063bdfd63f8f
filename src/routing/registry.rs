//! Route registry module
//!
//! The ordered table of routes mounted on the listener. Routes are matched in
//! mount order and the first match wins. The only way to remove routes is to
//! remove all of them.

use std::sync::{Arc, PoisonError, RwLock};

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use thiserror::Error;

use super::pattern::{PathParams, PatternError, RoutePattern};
use super::static_routes::StaticRouteConfig;
use crate::cache::ResultCache;
use crate::config::FunctionRouteConfig;
use crate::handler::static_files;
use crate::http;
use crate::invoke::{self, FunctionInvoker};
use crate::logger;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("invalid HTTP method '{0}'")]
    Method(String),
}

/// What a mounted route serves
pub enum RouteTarget {
    Function {
        config: Arc<FunctionRouteConfig>,
        cache: Option<Arc<ResultCache>>,
    },
    Static {
        config: Arc<StaticRouteConfig>,
        cors_enabled: bool,
    },
}

/// A route as mounted on the listener
pub struct MountedRoute {
    pub pattern: RoutePattern,
    /// `None` accepts any method
    pub method: Option<Method>,
    pub target: RouteTarget,
}

impl MountedRoute {
    fn accepts(&self, method: &Method) -> bool {
        match &self.target {
            RouteTarget::Function { .. } => match &self.method {
                None => true,
                Some(expected) => {
                    expected == method || (*expected == Method::GET && *method == Method::HEAD)
                }
            },
            RouteTarget::Static { cors_enabled, .. } => {
                *method == Method::GET
                    || *method == Method::HEAD
                    || (*cors_enabled && *method == Method::OPTIONS)
            }
        }
    }
}

/// The live route table
pub struct RouteRegistry {
    invoker: Arc<dyn FunctionInvoker>,
    routes: RwLock<Vec<Arc<MountedRoute>>>,
}

impl RouteRegistry {
    pub fn new(invoker: Arc<dyn FunctionInvoker>) -> Self {
        Self {
            invoker,
            routes: RwLock::new(Vec::new()),
        }
    }

    /// Mount a function route; `cache` is `None` when the route is not cached
    pub fn register_function_route(
        &self,
        config: Arc<FunctionRouteConfig>,
        cache: Option<Arc<ResultCache>>,
    ) -> Result<(), RouteError> {
        let pattern = RoutePattern::parse(&config.public_path)?;
        let method = if config.http_method.eq_ignore_ascii_case("ANY") {
            None
        } else {
            let name = config.http_method.to_ascii_uppercase();
            Some(Method::from_bytes(name.as_bytes()).map_err(|_| RouteError::Method(name))?)
        };

        self.push(MountedRoute {
            pattern,
            method,
            target: RouteTarget::Function { config, cache },
        });
        Ok(())
    }

    /// Mount a static route; the route's own CORS setting overrides `cors_enabled`
    pub fn register_static_route(&self, config: Arc<StaticRouteConfig>, cors_enabled: bool) {
        let cors_enabled = config.cors.unwrap_or(cors_enabled);
        self.push(MountedRoute {
            pattern: config.pattern.clone(),
            method: Some(Method::GET),
            target: RouteTarget::Static {
                config,
                cors_enabled,
            },
        });
    }

    /// Unmount every route; requests already dispatched are unaffected
    pub fn remove_all_routes(&self) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First mounted route accepting `method` whose pattern matches `path`
    pub fn find(&self, method: &Method, path: &str) -> Option<(Arc<MountedRoute>, PathParams)> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|route| route.accepts(method))
            .find_map(|route| route.pattern.matches(path).map(|p| (Arc::clone(route), p)))
    }

    /// Route a request to its handler
    pub async fn dispatch<B>(&self, req: Request<B>, max_body_size: u64) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        // The route is cloned out so a concurrent rebuild cannot affect this request
        let Some((route, params)) = self.find(req.method(), req.uri().path()) else {
            return http::build_404_response();
        };

        match &route.target {
            RouteTarget::Static {
                config,
                cors_enabled,
            } => {
                let (parts, _) = req.into_parts();
                static_files::serve_static_file(&parts, config, *cors_enabled).await
            }
            RouteTarget::Function { config, cache } => {
                let (parts, body) = req.into_parts();
                let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
                let body = match Limited::new(body, limit).collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                        logger::log_error(&format!(
                            "Request body too large (max: {max_body_size} bytes)"
                        ));
                        return http::build_413_response();
                    }
                    Err(e) => {
                        logger::log_warning(&format!("Failed to read request body: {e}"));
                        return http::build_400_response("Failed to read request body");
                    }
                };

                invoke::handle_function_request(
                    &parts,
                    &body,
                    config,
                    cache.as_deref(),
                    self.invoker.as_ref(),
                    params,
                )
                .await
            }
        }
    }

    fn push(&self, route: MountedRoute) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(route));
    }
}
