//! Twilio Programmable Messaging client.

use crate::config::TwilioConfig;
use crate::error::SendError;
use crate::provider::{ProviderResponse, SmsGateway, SmsRequest};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

pub struct TwilioGateway {
    client: Client,
    config: TwilioConfig,
}

impl TwilioGateway {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_url.trim_end_matches('/'),
            self.config.credentials.account_sid
        )
    }
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send_sms(&self, request: &SmsRequest) -> Result<ProviderResponse, SendError> {
        debug!(to = %request.to, from = %request.from, "Sending SMS via Twilio");

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.config.credentials.api_key_sid,
                Some(&self.config.credentials.api_key_secret),
            )
            .form(&[
                ("To", request.to.as_str()),
                ("From", request.from.as_str()),
                ("Body", request.body.as_str()),
            ])
            .send()
            .await?;

        Ok(ProviderResponse::from_reqwest(response).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TwilioCredentials;
    use http::StatusCode;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: String) -> TwilioConfig {
        TwilioConfig {
            credentials: TwilioCredentials {
                account_sid: "AC123".into(),
                api_key_sid: "SK123".into(),
                api_key_secret: "secret".into(),
            },
            from_phone_number: "+15550000000".into(),
            api_url,
            lookup_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            // base64("SK123:secret")
            .and(header("authorization", "Basic U0sxMjM6c2VjcmV0"))
            .and(body_string_contains("To=%2B14155550100"))
            .and(body_string_contains("Body=hello+there"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"sid":"SM1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = TwilioGateway::new(config(server.uri()));
        let response = gateway
            .send_sms(&SmsRequest {
                to: "+14155550100".into(),
                from: "+15550000000".into(),
                body: "hello there".into(),
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, r#"{"sid":"SM1"}"#);
    }

    #[tokio::test]
    async fn test_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
            .mount(&server)
            .await;

        let gateway = TwilioGateway::new(config(server.uri()));
        let response = gateway
            .send_sms(&SmsRequest {
                to: "+14155550100".into(),
                from: "+15550000000".into(),
                body: "hi".into(),
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.retry_after, Some(std::time::Duration::from_secs(12)));
    }
}
