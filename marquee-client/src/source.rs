//! Where a screen reads its layout from

use async_trait::async_trait;
use marquee_core::models::{Layout, PageKey};
use reqwest::Client;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::{config::ClientConfig, ClientError, Result};

/// Whole-document layout reads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LayoutSource: Send + Sync {
    async fn fetch(&self, page: &PageKey) -> Result<Layout>;
}

/// [`LayoutSource`] backed by `GET /api/layout/{page}`
#[derive(Debug, Clone)]
pub struct HttpLayoutSource {
    config: ClientConfig,
    client: Client,
}

impl HttpLayoutSource {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        // Validate the base URL up front
        config.events_url()?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }
}

#[async_trait]
impl LayoutSource for HttpLayoutSource {
    async fn fetch(&self, page: &PageKey) -> Result<Layout> {
        let url = self.config.layout_url(page)?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: JsonValue = response.json().await?;
        let (layout, report) = Layout::from_value(body);
        if !report.is_clean() {
            warn!(page = %page, ?report, "Server returned a malformed layout, coerced");
        }

        debug!(
            page = %page,
            hero = layout.hero_content.len(),
            sections = layout.sections.len(),
            "Fetched layout"
        );
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_layout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/layout/home"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "heroContent": [{"id": "1", "title": "One", "type": "movie"}],
                "sections": null
            })))
            .mount(&server)
            .await;

        let source = HttpLayoutSource::new(&ClientConfig::with_base_url(server.uri())).unwrap();
        let layout = source.fetch(&PageKey::home()).await.unwrap();
        assert_eq!(layout.hero_content.len(), 1);
        assert!(layout.sections.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_resolved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/layout/shorts"))
            .and(query_param("resolve", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "heroContent": [],
                "sections": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig {
            resolve: true,
            ..ClientConfig::with_base_url(server.uri())
        };
        let source = HttpLayoutSource::new(&config).unwrap();
        assert!(source.fetch(&PageKey::shorts()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = HttpLayoutSource::new(&ClientConfig::with_base_url(server.uri())).unwrap();
        let err = source.fetch(&PageKey::home()).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 500, .. }));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpLayoutSource::new(&ClientConfig::with_base_url("nope")).is_err());
    }
}
