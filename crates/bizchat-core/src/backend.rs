use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExchangeError;
use crate::state::{BusinessProfile, HistoryEntry};

/// Body of `POST /chat`. Profile fields are flattened into the top level.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
    #[serde(flatten)]
    pub profile: BusinessProfile,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// The remote side of a chat exchange
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ExchangeError>;
    async fn health(&self) -> Result<(), ExchangeError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ExchangeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ExchangeError> {
        let url = format!("{}/chat", self.base_url);
        debug!(%url, history = request.history.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExchangeError::Status(response.status()));
        }

        let body = response.text().await?;
        let chat_response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Malformed(e.to_string()))?;
        Ok(chat_response.response)
    }

    async fn health(&self) -> Result<(), ExchangeError> {
        let url = format!("{}/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ExchangeError::Status(response.status()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            message: "hi".into(),
            history: vec![HistoryEntry { role: "model".into(), text: "hello".into() }],
            profile: BusinessProfile {
                product: "coffee".into(),
                target_customer: "students".into(),
                geographic_market: "local".into(),
                pricing_strategy: "low-cost".into(),
                main_channels: "social media".into(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["message"], "hi");
        assert_eq!(json["history"][0]["role"], "model");
        assert_eq!(json["history"][0]["text"], "hello");
        assert_eq!(json["product"], "coffee");
        assert_eq!(json["targetCustomer"], "students");
        assert_eq!(json["geographicMarket"], "local");
        assert_eq!(json["pricingStrategy"], "low-cost");
        assert_eq!(json["mainChannels"], "social media");
        assert!(json.get("profile").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
    }
}
