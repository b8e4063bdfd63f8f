//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from routing
//! and function invocation.

pub mod compress;
pub mod etag;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_304_response, build_400_response, build_404_response, build_413_response,
    build_500_response, build_function_response, build_options_response, build_static_response,
};
