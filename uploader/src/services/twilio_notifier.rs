//! Twilio SMS notifier

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::config::TwilioConfig;
use crate::error::{UploaderError, UploaderResult};
use crate::traits::Notifier;

const TWILIO_API: &str = "https://api.twilio.com";

pub struct TwilioNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
    base_url: String,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig, timeout: Duration) -> UploaderResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| TWILIO_API.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            config,
            base_url,
        })
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, message: &str) -> UploaderResult<()> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        );

        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", self.config.to_number.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploaderError::Notification {
                message: format!("Twilio returned HTTP {}: {}", status.as_u16(), body),
            });
        }

        info!("📱 SMS summary sent to {}", self.config.to_number);
        Ok(())
    }
}

/// Notifier used when Twilio is not configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> UploaderResult<()> {
        info!("SMS not configured; summary: {}", message);
        Ok(())
    }
}
