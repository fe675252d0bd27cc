use super::{message_id, Enqueued};
use crate::auth::{Claims, Role};
use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Extension, Json,
};
use dispatch::{validate_sms_message, SmsMessage};
use tracing::info;

/// `POST /dotflyer/sms`: validate, then hand the message to the SMS stream.
pub async fn send_sms(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    payload: Result<Json<SmsMessage>, JsonRejection>,
) -> Result<Json<Enqueued>, ApiError> {
    claims.require_any(&[Role::SendAll, Role::SendSms])?;

    let Json(message) = payload.map_err(|e| ApiError::MalformedBody(e.body_text()))?;
    validate_sms_message(&message, state.lookup.as_ref()).await?;

    let receipt = state
        .sms
        .publish(&message, message_id(&headers))
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    info!(
        sub = %claims.sub,
        sequence = receipt.sequence,
        duplicate = receipt.duplicate,
        "SMS enqueued"
    );
    Ok(Json(Enqueued::new(receipt.duplicate)))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    const VALID: &str = r#"{"To":"+14155550100","Body":"Your code is 1234"}"#;

    #[tokio::test]
    async fn test_valid_sms_is_enqueued() {
        let gw = gateway();
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/sms",
            Some(&token(&["sender.sms"])),
            None,
            VALID,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "enqueued", "duplicate": false}));
        let published = gw.sms.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0.to, "+14155550100");
        assert_eq!(published[0].1, None);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let gw = gateway();
        let (status, body) = post_json(&gw.router, "/dotflyer/sms", None, None, VALID).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(gw.sms.count(), 0);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let gw = gateway();
        let (status, _) =
            post_json(&gw.router, "/dotflyer/sms", Some("not-a-jwt"), None, VALID).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_email_role_cannot_send_sms() {
        let gw = gateway();
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/sms",
            Some(&token(&["sender.email"])),
            None,
            VALID,
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden");
        assert_eq!(gw.sms.count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_number_is_rejected_with_field_errors() {
        let gw = gateway();
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/sms",
            Some(&token(&["dotflyer.sender.all"])),
            None,
            r#"{"To":"0155","Body":""}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["To"].is_array());
        assert!(body["errors"]["Body"].is_array());
        assert_eq!(gw.sms.count(), 0);
    }

    #[tokio::test]
    async fn test_null_fields_get_field_level_errors() {
        let gw = gateway();
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/sms",
            Some(&token(&["sender.sms"])),
            None,
            r#"{"To":null,"Body":null}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"errors": {
                "To": ["'To' field is required"],
                "Body": ["'Body' field is required"]
            }})
        );
        assert_eq!(gw.sms.count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let gw = gateway();
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/sms",
            Some(&token(&["sender.all"])),
            None,
            "{not json",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["body"][0].is_string());
    }

    #[tokio::test]
    async fn test_publish_failure_is_service_unavailable() {
        let gw = gateway_with(RecordingPublisher::failing(), RecordingPublisher::default());
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/sms",
            Some(&token(&["sender.sms"])),
            None,
            VALID,
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "ServiceUnavailable");
    }
}
