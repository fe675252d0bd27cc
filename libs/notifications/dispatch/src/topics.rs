//! Topic definitions for the two message types.

use crate::models::{EmailMessage, SmsMessage};
use messaging::nats::Topic;

pub struct SmsTopic;

impl Topic for SmsTopic {
    type Message = SmsMessage;
    const STREAM_NAME: &'static str = "DOTFLYER_SMS";
    const SUBJECT: &'static str = "dotflyer.sms";
    const CONSUMER_NAME: &'static str = "sms-topic-processor";
    const DLQ_STREAM: &'static str = "DOTFLYER_SMS_DLQ";
}

pub struct EmailTopic;

impl Topic for EmailTopic {
    type Message = EmailMessage;
    const STREAM_NAME: &'static str = "DOTFLYER_EMAIL";
    const SUBJECT: &'static str = "dotflyer.email";
    const CONSUMER_NAME: &'static str = "email-topic-processor";
    const DLQ_STREAM: &'static str = "DOTFLYER_EMAIL_DLQ";
}
