pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session API
        .route("/api/v1/sessions", post(handlers::handle_open_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_close_session),
        )
        .route(
            "/api/v1/sessions/:id/identify",
            post(handlers::handle_identify),
        )
        .route(
            "/api/v1/sessions/:id/profile",
            put(handlers::handle_update_profile),
        )
        .route("/api/v1/sessions/:id/advice", post(handlers::handle_advice))
        .route("/api/v1/sessions/:id/save", post(handlers::handle_save))
        // Stateless question API
        .route("/api/advice", post(handlers::handle_question))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::testing::{client, EchoBackend, FailingBackend};
    use crate::llm_client::ModelBackend;
    use crate::session::registry::SessionRegistry;
    use crate::session::SessionSettings;
    use crate::store::{MemoryProfileStore, ProfileStore};

    fn app_with(store: Arc<MemoryProfileStore>, backend: Arc<dyn ModelBackend>) -> Router {
        let state = AppState {
            store: store as Arc<dyn ProfileStore>,
            advisor: client(backend),
            sessions: Arc::new(SessionRegistry::new(
                SessionSettings::default(),
                chrono::Duration::minutes(60),
            )),
            config: Config::from_lookup(|_| None).unwrap(),
            store_check_error: None,
        };
        build_router(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(
            Arc::new(MemoryProfileStore::new()),
            Arc::new(EchoBackend::new("ok")),
        );
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"]["backend"], "memory");
        assert_eq!(body["store"]["ready"], true);
    }

    #[tokio::test]
    async fn test_open_session_returns_the_registered_session() {
        let app = app_with(
            Arc::new(MemoryProfileStore::new()),
            Arc::new(EchoBackend::new("ok")),
        );
        let (status, opened) = send(&app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = opened["session_id"].as_str().unwrap().to_string();

        let (status, fetched) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(opened, fetched);
    }

    #[tokio::test]
    async fn test_full_visit_persists_advice() {
        let store = Arc::new(MemoryProfileStore::new());
        let app = app_with(store.clone(), Arc::new(EchoBackend::new("Pick the PPO.")));

        let (status, opened) = send(&app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(opened["phase"], "unidentified");
        let id = opened["session_id"].as_str().unwrap().to_string();

        let (status, loaded) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/identify"),
            Some(json!({"name": "Alice", "employee_number": "E12345"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loaded["resolution"], "new_profile");
        assert_eq!(loaded["session"]["phase"], "ready");
        assert_eq!(loaded["session"]["profile"]["age"], 30);

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/v1/sessions/{id}/profile"),
            Some(json!({"age": 35, "family_status": "married", "health_concerns": ["vision"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, advised) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/advice"),
            Some(json!({"intent": {"kind": "recommend", "benefit_types": ["health_insurance"]}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(advised["advice"], "Pick the PPO.");
        assert_eq!(advised["fallback"], false);
        assert_eq!(advised["commit"]["status"], "committed");

        let record = store.get("E12345").await.unwrap().unwrap();
        assert_eq!(record.profile.age, 35);
        assert_eq!(record.recommendations.as_deref(), Some("Pick the PPO."));

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_identify_validation_error_is_bad_request() {
        let app = app_with(
            Arc::new(MemoryProfileStore::new()),
            Arc::new(EchoBackend::new("ok")),
        );
        let (_, opened) = send(&app, "POST", "/api/v1/sessions", None).await;
        let id = opened["session_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/identify"),
            Some(json!({"name": "Alice", "employee_number": "E1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_compare_with_one_type_is_bad_request() {
        let app = app_with(
            Arc::new(MemoryProfileStore::new()),
            Arc::new(EchoBackend::new("ok")),
        );
        let (_, opened) = send(&app, "POST", "/api/v1/sessions", None).await;
        let id = opened["session_id"].as_str().unwrap().to_string();
        send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/identify"),
            Some(json!({"name": "Alice", "employee_number": "E12345"})),
        )
        .await;

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/advice"),
            Some(json!({"intent": {"kind": "compare", "benefit_types": ["dental"]}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app_with(
            Arc::new(MemoryProfileStore::new()),
            Arc::new(EchoBackend::new("ok")),
        );
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{}/save", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stateless_question_reports_fallback() {
        let app = app_with(Arc::new(MemoryProfileStore::new()), Arc::new(FailingBackend));
        let (status, body) = send(
            &app,
            "POST",
            "/api/advice",
            Some(json!({"question": "What health insurance options are available?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["fallback"], true);

        let (status, _) = send(&app, "POST", "/api/advice", Some(json!({"question": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
