//! Shared handler state. Every field is cheap to clone.

use crate::auth::JwtAuth;
use core_config::AppInfo;
use dispatch::lookup::PhoneNumberLookup;
use dispatch::{EmailMessage, SmsMessage};
use messaging::nats::Publisher;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub app: AppInfo,
    pub auth: JwtAuth,
    pub sms: Arc<dyn Publisher<SmsMessage>>,
    pub email: Arc<dyn Publisher<EmailMessage>>,
    pub lookup: Arc<dyn PhoneNumberLookup>,
}
