//! Device classification from the `User-Agent` header

use super::Orientation;
use regex::Regex;
use std::sync::OnceLock;

/// Lowercased tokens whose presence marks a mobile client
const MOBILE_TOKENS: [&str; 16] = [
    "mobile",
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "windows phone",
    "opera mini",
    "iemobile",
    "mobile safari",
    "webos",
    "kindle",
    "silk",
    "fennec",
    "maemo",
    "tablet",
];

static MOBILE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn mobile_pattern() -> &'static Regex {
    MOBILE_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)android|webos|iphone|ipad|ipod|blackberry|iemobile|opera mini")
            .unwrap_or_else(|_| unreachable!("mobile pattern is a valid regex"))
    })
}

/// Client class inferred from the `User-Agent` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Mobile,
    Desktop,
}

impl DeviceType {
    /// Classify a `User-Agent`; a missing or empty header is a desktop
    pub fn classify(user_agent: Option<&str>) -> Self {
        match user_agent {
            Some(ua) if is_mobile(ua) => Self::Mobile,
            _ => Self::Desktop,
        }
    }

    /// Mobile screens get portrait images
    pub const fn orientation(self) -> Orientation {
        match self {
            Self::Mobile => Orientation::Vertical,
            Self::Desktop => Orientation::Horizontal,
        }
    }

    /// Value of the `X-Device-Type` header
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }
}

fn is_mobile(user_agent: &str) -> bool {
    if user_agent.is_empty() {
        return false;
    }
    let lower = user_agent.to_lowercase();
    MOBILE_TOKENS.iter().any(|token| lower.contains(token)) || mobile_pattern().is_match(user_agent)
}
