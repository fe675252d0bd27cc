use super::{message_id, Enqueued};
use crate::auth::{Claims, Role};
use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Extension, Json,
};
use dispatch::{validate_email_message, EmailMessage};
use messaging::Message;
use tracing::info;

/// `POST /dotflyer/email`. A `Message-Id` header makes resubmission
/// idempotent for the length of the stream's duplicate window.
pub async fn send_email(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    payload: Result<Json<EmailMessage>, JsonRejection>,
) -> Result<Json<Enqueued>, ApiError> {
    claims.require_any(&[Role::SendAll, Role::SendEmail])?;

    let Json(message) = payload.map_err(|e| ApiError::MalformedBody(e.body_text()))?;
    validate_email_message(&message)?;

    let receipt = state
        .email
        .publish(&message, message_id(&headers))
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    if receipt.duplicate {
        info!(sub = %claims.sub, "Duplicate email submission ignored");
    } else {
        info!(
            sub = %claims.sub,
            to = %message.recipients(),
            sequence = receipt.sequence,
            "Email enqueued"
        );
    }
    Ok(Json(Enqueued::new(receipt.duplicate)))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn valid() -> String {
        json!({
            "From": {"Email": "ops@example.com", "Name": "Ops"},
            "To": [{"Email": "dev@example.com", "Name": "Dev"}],
            "Subject": "Rotation due",
            "Body": "Rotate the storage key"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_valid_email_is_enqueued_with_message_id() {
        let gw = gateway();
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/email",
            Some(&token(&["sender.email"])),
            Some("msg-42"),
            &valid(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["duplicate"], false);
        let published = gw.email.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0.subject, "Rotation due");
        assert_eq!(published[0].1.as_deref(), Some("msg-42"));
    }

    #[tokio::test]
    async fn test_resubmission_with_same_message_id_is_noop() {
        let gw = gateway();
        let token = token(&["sender.all"]);

        for expected_duplicate in [false, true] {
            let (status, body) = post_json(
                &gw.router,
                "/dotflyer/email",
                Some(&token),
                Some("msg-7"),
                &valid(),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["duplicate"], expected_duplicate);
        }

        assert_eq!(gw.email.count(), 1);
    }

    #[tokio::test]
    async fn test_sms_role_cannot_send_email() {
        let gw = gateway();
        let (status, _) = post_json(
            &gw.router,
            "/dotflyer/email",
            Some(&token(&["sender.sms"])),
            None,
            &valid(),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(gw.email.count(), 0);
    }

    #[tokio::test]
    async fn test_email_without_content_lists_every_error() {
        let gw = gateway();
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/email",
            Some(&token(&["sender.email"])),
            None,
            r#"{"From":{"Email":"ops@example.com","Name":"Ops"},"To":[],"Subject":""}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let errors = body["errors"].as_object().unwrap();
        assert!(errors.contains_key("To"));
        assert!(errors.contains_key("Subject"));
        assert!(errors.contains_key("Body"));
        assert_eq!(gw.email.count(), 0);
    }

    #[tokio::test]
    async fn test_null_contact_fields_get_field_level_errors() {
        let gw = gateway();
        let (status, body) = post_json(
            &gw.router,
            "/dotflyer/email",
            Some(&token(&["sender.email"])),
            None,
            r#"{"From":{"Email":null,"Name":null},"To":null,"Subject":null,"Body":"hi"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["From.Email"], json!(["'Email' field is required"]));
        assert_eq!(body["errors"]["From.Name"], json!(["'Name' field is required"]));
        assert_eq!(body["errors"]["Subject"], json!(["'Subject' field is required"]));
        assert!(body["errors"]["To"].is_array());
        assert_eq!(gw.email.count(), 0);
    }

    #[tokio::test]
    async fn test_null_body_is_bad_request() {
        let gw = gateway();
        let (status, _) = post_json(
            &gw.router,
            "/dotflyer/email",
            Some(&token(&["sender.email"])),
            None,
            "null",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
