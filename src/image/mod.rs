//! Image domain module
//!
//! Orientation and index selection, device sniffing and the upstream fetch.

pub mod device;
pub mod fetch;
pub mod orientation;

pub use device::DeviceType;
pub use fetch::{FetchError, ImageFetcher, UpstreamFetcher};
pub use orientation::{ImageRequest, Orientation};
