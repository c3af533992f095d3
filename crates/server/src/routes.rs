use axum::{http::HeaderValue, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::bootstrap::Application;
use crate::{drafts, health, intake};

pub fn build(app: &Application) -> Router {
    Router::new()
        .merge(intake::router(app.runtime.clone()))
        .merge(drafts::router(app.drafts.clone()))
        .merge(health::router(app.db_pool.clone()))
        .layer(cors_layer(&app.config.cors.allowed_origins))
}

/// `*` anywhere in the list allows every origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let origins = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    event_name = "system.cors.invalid_origin",
                    origin = origin.as_str(),
                    error = %error,
                    "ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect::<Vec<_>>();
    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use devteam_agent::ScriptedLlmClient;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::bootstrap::{bootstrap_with_client, test_config};
    use crate::routes::build;

    async fn app(dir: &TempDir, responses: &[&str]) -> Router {
        let llm = Arc::new(ScriptedLlmClient::new(responses.iter().copied()));
        let app = bootstrap_with_client(test_config(dir.path()), llm)
            .await
            .expect("bootstrap should succeed");
        build(&app)
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, payload)
    }

    async fn start_shop(router: &Router) -> String {
        let (status, started) =
            call(router, Method::POST, "/intake/start", Some(json!({"projectName": "Shop"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["message"], "Intake started. Please provide project details.");
        started["conversationId"].as_str().expect("conversation id").to_string()
    }

    async fn answer(router: &Router, id: &str, slot: &str, value: Value) -> Value {
        let (status, body) = call(
            router,
            Method::POST,
            "/intake/answer",
            Some(json!({"conversationId": id, "slotName": slot, "value": value})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "answer {slot} failed: {body}");
        body
    }

    #[tokio::test]
    async fn shop_scenario_commits_prd_and_contract() {
        let dir = TempDir::new().expect("tempdir");
        let router = app(&dir, &[r##"{"prd_content": "# Shop\n\nAn online shop."}"##]).await;
        let id = start_shop(&router).await;

        answer(&router, &id, "project_description", json!("An online shop")).await;
        answer(&router, &id, "target_users", json!("Shoppers")).await;
        answer(&router, &id, "data_entities", json!(["Order"])).await;
        let last = answer(&router, &id, "key_features", json!("cart, checkout")).await;
        assert_eq!(last["gaps"], json!([]));
        assert_eq!(last["nextQuestion"], Value::Null);
        assert_eq!(last["stage"], "ready");

        let (status, report) =
            call(&router, Method::POST, "/intake/commit", Some(json!({"conversationId": id}))).await;
        assert_eq!(status, StatusCode::OK, "{report}");
        assert_eq!(report["message"], "PRD generated and contracts updated successfully");
        assert_eq!(report["degraded"], false);
        let artifacts = report["artifacts"].as_array().expect("artifacts");
        assert_eq!(artifacts.len(), 2);
        assert!(artifacts[0].as_str().expect("prd path").ends_with(".md"));
        assert!(artifacts[1].as_str().expect("contract path").ends_with("contracts/api.yaml"));

        let (status, document) = call(&router, Method::GET, "/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(document["paths"]["/v1/orders"].is_object());
        assert!(document["components"]["schemas"]["Order"].is_object());

        let (status, _) =
            call(&router, Method::POST, "/intake/commit", Some(json!({"conversation_id": id}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn premature_commit_returns_missing_slots() {
        let dir = TempDir::new().expect("tempdir");
        let router = app(&dir, &[]).await;
        let id = start_shop(&router).await;
        answer(&router, &id, "target_users", json!("Shoppers")).await;
        answer(&router, &id, "key_features", json!(["cart"])).await;

        let (status, body) =
            call(&router, Method::POST, "/intake/commit", Some(json!({"conversationId": id}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["missing"], json!(["project_description"]));
        assert!(!dir.path().join("docs/prds").exists());
    }

    #[tokio::test]
    async fn unusable_model_output_commits_degraded() {
        let dir = TempDir::new().expect("tempdir");
        let router = app(&dir, &["I cannot do that", "Still not JSON"]).await;
        let id = start_shop(&router).await;
        answer(&router, &id, "project_description", json!("An online shop")).await;
        answer(&router, &id, "target_users", json!("Shoppers")).await;
        answer(&router, &id, "key_features", json!("cart")).await;

        let (status, report) =
            call(&router, Method::POST, "/intake/commit", Some(json!({"conversationId": id}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["degraded"], true);
        assert_eq!(report["artifacts"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn status_drafts_and_health_checks_are_routed() {
        let dir = TempDir::new().expect("tempdir");
        let router = app(&dir, &[]).await;
        let id = start_shop(&router).await;

        let (status, body) =
            call(&router, Method::GET, &format!("/intake/status?conversationId={id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gaps"][0], "project_description");
        assert_eq!(body["nextQuestion"], "Please provide a brief description of your project.");

        let (status, _) =
            call(&router, Method::GET, "/intake/status?conversationId=conv_unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, created) = call(
            &router,
            Method::POST,
            "/v1/drafts",
            Some(json!({"owner": "alice", "payload": {"title": "Checkout"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let draft_uri = format!("/v1/drafts/{}", created["id"].as_str().expect("draft id"));
        let (status, _) = call(&router, Method::DELETE, &draft_uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&router, Method::GET, &draft_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, health) = call(&router, Method::GET, "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health, json!({"status": "healthy", "service": "devteam"}));
        let (status, ready) = call(&router, Method::GET, "/readyz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ready["database"], "connected");
    }
}
