//! Routing module
//!
//! Gateway-style routing for the dev server:
//! - Path patterns with parameters and greedy segments
//! - Static route expansion and specificity ordering
//! - The live, first-match-wins route table

mod pattern;
mod registry;
mod static_routes;

pub use pattern::{PathParams, PatternError, RoutePattern};
pub use registry::{MountedRoute, RouteError, RouteRegistry, RouteTarget};
pub use static_routes::{resolve_static_routes, sort_static_routes, StaticRouteConfig};
