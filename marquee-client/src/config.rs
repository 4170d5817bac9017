//! Client configuration

use marquee_core::models::PageKey;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{ClientError, Result};

/// Connection settings for a screen talking to a marquee server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server base URL, e.g. `http://127.0.0.1:8080`
    pub base_url: String,
    pub request_timeout_seconds: u64,
    /// Request catalog-resolved layouts (`?resolve=true`)
    pub resolve: bool,
    pub reconnect_min_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub carousel: CarouselConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_seconds: 10,
            resolve: false,
            reconnect_min_delay_ms: 500,
            reconnect_max_delay_ms: 30_000,
            carousel: CarouselConfig::default(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    fn base(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// `GET /api/layout/{page}`
    pub fn layout_url(&self, page: &PageKey) -> Result<Url> {
        let mut url = self.base()?.join(&format!("api/layout/{page}"))?;
        if self.resolve {
            url.query_pairs_mut().append_pair("resolve", "true");
        }
        Ok(url)
    }

    /// `ws(s)://.../ws/layout`
    pub fn events_url(&self) -> Result<Url> {
        let mut url = self.base()?.join("ws/layout")?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ClientError::InvalidUrl(format!("Unsupported scheme: {other}")));
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| ClientError::InvalidUrl(format!("Cannot use scheme {scheme}")))?;
        Ok(url)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    #[must_use]
    pub fn reconnect_min_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_min_delay_ms)
    }

    #[must_use]
    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms.max(self.reconnect_min_delay_ms))
    }
}

/// Hero carousel timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    /// Auto-advance period
    pub auto_advance_interval_ms: u64,
    /// Nominal duration of one animated page transition
    pub animation_duration_ms: u64,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            auto_advance_interval_ms: 4000,
            animation_duration_ms: 350,
        }
    }
}

impl CarouselConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.auto_advance_interval_ms.max(1))
    }

    #[must_use]
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }
}
