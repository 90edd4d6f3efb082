//! Request handler module
//!
//! `dispatch` holds the image logic independent of any server framework;
//! `router` adapts it to hyper.

pub mod dispatch;
pub mod router;

// Re-export main entry points
pub use dispatch::Reply;
pub use router::handle_request;
