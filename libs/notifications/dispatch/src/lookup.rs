//! Phone number validation backends.

use crate::config::TwilioCredentials;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

static E164: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern is valid"));

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhoneNumberLookup: Send + Sync {
    /// Whether `number` is a deliverable phone number.
    async fn is_valid(&self, number: &str) -> bool;
}

/// Offline check against the E.164 format.
#[derive(Debug, Clone, Copy, Default)]
pub struct E164Lookup;

#[async_trait]
impl PhoneNumberLookup for E164Lookup {
    async fn is_valid(&self, number: &str) -> bool {
        E164.is_match(number)
    }
}

/// Twilio Lookup v2. Numbers failing the E.164 format are rejected without
/// a request.
pub struct TwilioLookup {
    client: Client,
    credentials: TwilioCredentials,
    lookup_url: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    valid: bool,
}

impl TwilioLookup {
    pub fn new(credentials: TwilioCredentials, lookup_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            lookup_url: lookup_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PhoneNumberLookup for TwilioLookup {
    async fn is_valid(&self, number: &str) -> bool {
        if !E164.is_match(number) {
            return false;
        }

        let url = format!("{}/v2/PhoneNumbers/{}", self.lookup_url, number);
        let response = match self
            .client
            .get(&url)
            .basic_auth(
                &self.credentials.api_key_sid,
                Some(&self.credentials.api_key_secret),
            )
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Phone number lookup failed");
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Phone number lookup rejected");
            return false;
        }

        match response.json::<LookupResponse>().await {
            Ok(body) => {
                debug!(valid = body.valid, "Phone number lookup completed");
                body.valid
            }
            Err(e) => {
                warn!(error = %e, "Unreadable phone number lookup response");
                false
            }
        }
    }
}
