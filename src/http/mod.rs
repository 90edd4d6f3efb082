//! HTTP protocol layer module
//!
//! Response builders for the hyper hosting adapter, decoupled from the
//! image dispatching logic.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_health_response, build_options_response, build_reply_response, TEXT_PLAIN_UTF8,
};
