//! Request handler module
//!
//! Request entry point and static file serving. Function routes are handled
//! by the `invoke` module.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
