//! Host-neutral request dispatcher
//!
//! Turns the `img` query parameter and the caller's `User-Agent` into a
//! [`Reply`]. Nothing here knows about hyper; the hosting adapter converts the
//! reply into whatever its environment sends.

use crate::config::ImageConfig;
use crate::http::TEXT_PLAIN_UTF8;
use crate::image::{DeviceType, FetchError, ImageFetcher, ImageRequest, Orientation};
use crate::logger;
use hyper::body::Bytes;
use hyper::StatusCode;

/// Response produced by the dispatcher: status, ordered headers and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
}

#[cfg(test)]
impl Reply {
    /// First header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the `img` parameter asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Fixed(Orientation),
    ByDevice,
}

impl Mode {
    /// Read the `img` parameter from a raw query string
    ///
    /// Only a single `img=h|v|ua` is recognized; a missing, empty, unknown or
    /// repeated parameter yields `None`.
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        let query = query?;
        let mut values = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == "img")
            .map(|(_, value)| value);
        let value = values.next()?;
        if values.next().is_some() {
            return None;
        }
        match &*value {
            "h" => Some(Self::Fixed(Orientation::Horizontal)),
            "v" => Some(Self::Fixed(Orientation::Vertical)),
            "ua" => Some(Self::ByDevice),
            _ => None,
        }
    }
}

/// Handle one request
///
/// Performs at most one fetch through `fetcher`; the help text path performs none.
pub async fn dispatch<F: ImageFetcher>(
    query: Option<&str>,
    user_agent: Option<&str>,
    images: &ImageConfig,
    fetcher: &F,
    rng: &mut fastrand::Rng,
) -> Reply {
    let Some(mode) = Mode::from_query(query) else {
        return help_reply(images);
    };

    let (orientation, device) = match mode {
        Mode::Fixed(orientation) => (orientation, None),
        Mode::ByDevice => {
            let device = DeviceType::classify(user_agent);
            (device.orientation(), Some(device))
        }
    };

    let image = ImageRequest::random(orientation, images, rng);
    logger::log_debug(&format!(
        "Selected {} image #{} -> {}",
        image.orientation, image.index, image.remote_url
    ));

    match fetcher.fetch(&image.remote_url, user_agent).await {
        Ok(bytes) => image_reply(&image, device, bytes),
        Err(err) => {
            logger::log_warning(&format!("Fetching {} failed: {err}", image.remote_url));
            error_reply(&err)
        }
    }
}

fn image_reply(image: &ImageRequest, device: Option<DeviceType>, body: Bytes) -> Reply {
    let mut headers = vec![
        ("Content-Type", "image/webp".to_string()),
        ("Cache-Control", "public, max-age=3600".to_string()),
        ("Access-Control-Allow-Origin", "*".to_string()),
        ("X-Image-Number", image.index.to_string()),
        ("X-Proxy-Url", image.remote_url.clone()),
    ];
    if let Some(device) = device {
        headers.push(("X-Device-Type", device.as_str().to_string()));
    }
    Reply {
        status: StatusCode::OK,
        headers,
        body,
    }
}

fn error_reply(err: &FetchError) -> Reply {
    Reply {
        status: err.status_code(),
        headers: vec![("Content-Type", TEXT_PLAIN_UTF8.to_string())],
        body: Bytes::from(err.to_string()),
    }
}

fn help_reply(images: &ImageConfig) -> Reply {
    Reply {
        status: StatusCode::OK,
        headers: vec![
            ("Content-Type", TEXT_PLAIN_UTF8.to_string()),
            ("Access-Control-Allow-Origin", "*".to_string()),
        ],
        body: Bytes::from(help_text(images)),
    }
}

/// Usage text listing the modes and the configured maxima
pub fn help_text(images: &ImageConfig) -> String {
    let mut text = format!(
        "🖼️ 随机图片展示器\n\n\
         使用方法:\n\
         • ?img=h - 获取横屏随机图片\n\
         • ?img=v - 获取竖屏随机图片\n\
         • ?img=ua - 根据设备类型自动选择图片\n\n\
         配置信息:\n\
         • 横屏图片最大编号: {}\n\
         • 竖屏图片最大编号: {}",
        images.max_horizontal, images.max_vertical
    );
    if let Some(updated) = &images.last_updated {
        text.push_str(&format!("\n• 上次爬图：{updated}"));
    }
    text
}
