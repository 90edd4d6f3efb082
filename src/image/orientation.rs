//! Image selection
//!
//! Maps an orientation to its index range and builds the remote URL for a
//! randomly picked image.

use crate::config::ImageConfig;
use std::fmt;

/// Which half of the catalogue an image comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Path segment used on the remote host
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Horizontal => "h",
            Self::Vertical => "v",
        }
    }

    /// Highest image number available for this orientation
    pub const fn max_index(self, images: &ImageConfig) -> u32 {
        match self {
            Self::Horizontal => images.max_horizontal,
            Self::Vertical => images.max_vertical,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
        }
    }
}

/// One randomly chosen image, alive for the duration of a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub orientation: Orientation,
    pub index: u32,
    pub remote_url: String,
}

impl ImageRequest {
    /// Pick an index uniformly in `1..=max` for the orientation
    pub fn random(orientation: Orientation, images: &ImageConfig, rng: &mut fastrand::Rng) -> Self {
        let index = rng.u32(1..=orientation.max_index(images));
        Self::with_index(orientation, index, images)
    }

    pub fn with_index(orientation: Orientation, index: u32, images: &ImageConfig) -> Self {
        Self {
            orientation,
            index,
            remote_url: remote_url(&images.base_url, orientation, index),
        }
    }
}

/// `{base}/{h|v}/{index}.webp`
pub fn remote_url(base_url: &str, orientation: Orientation, index: u32) -> String {
    format!(
        "{}/{}/{index}.webp",
        base_url.trim_end_matches('/'),
        orientation.segment()
    )
}
