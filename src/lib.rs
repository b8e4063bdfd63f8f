//! Local development server for serverless HTTP functions.
//!
//! Maps configured routes to locally executed functions and static files,
//! caches successful function results and rebuilds its routes whenever a
//! source file changes.

pub mod cache;
pub mod config;
pub mod handler;
pub mod http;
pub mod invoke;
pub mod logger;
pub mod routing;
pub mod server;
