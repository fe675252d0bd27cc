use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Liveness only; the gateway has no dependency worth probing per request.
pub async fn live_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "name": state.app.name,
        "version": state.app.version,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::gateway;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_live_needs_no_token() {
        let gw = gateway();
        let response = gw
            .router
            .oneshot(
                Request::get("/dotflyer/healthz/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["name"], "dotflyer_api");
    }
}
