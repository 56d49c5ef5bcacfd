//! remove.bg HTTP backend for [`BackgroundRemover`].

use reqwest::blocking::{multipart, Client};

use crate::background::BackgroundRemover;
use crate::config::RemoveBgConfig;
use crate::error::{Error, Result};

/// Calls the remove.bg API once per image. Responses are PNG.
pub struct RemoveBgClient {
    http: Client,
    url: String,
    api_key: String,
}

impl RemoveBgClient {
    /// Create a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApiKey`] without a key, or [`Error::Http`] if
    /// the HTTP client cannot be built.
    pub fn new(config: &RemoveBgConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            api_key,
        })
    }
}

impl BackgroundRemover for RemoveBgClient {
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        let file = multipart::Part::bytes(input.to_vec()).file_name("badge.png");
        let form = multipart::Form::new()
            .part("image_file", file)
            .text("size", "auto")
            .text("format", "png");

        let response = self
            .http
            .post(&self.url)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        if let Some(credits) = response.headers().get("X-Credits-Charged") {
            log::debug!("remove.bg credits charged: {credits:?}");
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Pull `errors[0].title` out of a remove.bg error body, else return it trimmed.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["errors"][0]["title"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_first_title() {
        let body = r#"{"errors":[{"title":"Insufficient credits","code":"insufficient_credits"}]}"#;
        assert_eq!(error_message(body), "Insufficient credits");
        assert_eq!(error_message(" bad gateway \n"), "bad gateway");
    }

    #[test]
    fn client_requires_api_key() {
        assert!(matches!(
            RemoveBgClient::new(&RemoveBgConfig::default()),
            Err(Error::MissingApiKey("REMOVE_BG_API_KEY"))
        ));
        assert!(RemoveBgClient::new(&RemoveBgConfig::default().with_api_key("k")).is_ok());
    }
}
