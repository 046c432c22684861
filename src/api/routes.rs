use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{import, query, server};
use crate::services::{ImportService, QueryService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<QueryService>,
    pub imports: Arc<ImportService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/servers", get(server::list_servers))
        .route("/execute", post(query::execute_query))
        .route("/import", post(import::import_data))
        .route("/import/preview", post(import::preview_import))
        .route("/transliterate/{text}", get(server::transliterate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatabaseServer, Dialect};
    use crate::services::database::mock::MockAdapter;
    use crate::services::schema::DdlGenerator;
    use crate::services::{QueryDispatcher, ServerRegistry};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(mock: &MockAdapter) -> Router {
        let registry = Arc::new(
            ServerRegistry::from_servers(vec![DatabaseServer {
                id: 1,
                name: "reporting".to_string(),
                host: "pg.local".to_string(),
                port: 5432,
                username: "report".to_string(),
                password: "hunter2".to_string(),
                database: "dwh".to_string(),
                dialect: Dialect::PostgreSql,
            }])
            .unwrap(),
        );
        let dispatcher = Arc::new(QueryDispatcher::new(
            2,
            Duration::from_secs(5),
            Arc::new(mock.clone()),
        ));
        create_router(AppState {
            queries: Arc::new(QueryService::new(registry.clone(), dispatcher.clone())),
            imports: Arc::new(ImportService::new(registry, dispatcher, DdlGenerator::new("pw"))),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(&MockAdapter::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_servers_hide_credentials() {
        let request = Request::builder().uri("/servers").body(Body::empty()).unwrap();
        let (status, body) = send(app(&MockAdapter::new()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "reporting");
        assert_eq!(body[0]["type"], "postgresql");
        assert!(body[0].get("password").is_none());
        assert!(!body.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_execute_returns_query_result() {
        let (status, body) = send(
            app(&MockAdapter::new()),
            post_json("/execute", json!({"server_id": 1, "query": "SELECT 1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["server"], "reporting");
        assert_eq!(body["status"], "success");
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_execute_unknown_server_is_error_result() {
        let mock = MockAdapter::new();
        let (status, body) = send(
            app(&mock),
            post_json("/execute", json!({"server_id": 9, "query": "SELECT 1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Server 9 not found");
        assert_eq!(mock.connects(), 0);
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_query() {
        let (status, body) = send(
            app(&MockAdapter::new()),
            post_json("/execute", json!({"server_id": 1, "query": "   "})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_import_creates_and_loads() {
        let mock = MockAdapter::new();
        let payload = json!({
            "server_id": 1,
            "schema_name": "staging",
            "table_name": "sales",
            "columns": ["region", "amount"],
            "rows": [["north", 10], ["south", 12.5]]
        });
        let (status, body) = send(app(&mock), post_json("/import", payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success", "{}", body);
        assert_eq!(body["message"], "Import completed: 2 rows");
        assert_eq!(mock.table("staging.sales").len(), 2);
    }

    #[tokio::test]
    async fn test_import_rejects_ragged_rows() {
        let payload = json!({
            "server_id": 1,
            "schema_name": "staging",
            "table_name": "sales",
            "columns": ["region", "amount"],
            "rows": [["north"]]
        });
        let (status, _) = send(app(&MockAdapter::new()), post_json("/import", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_preview() {
        let payload = json!({
            "columns": ["id", "note"],
            "rows": [[1, "a"], [2, null]]
        });
        let (status, body) =
            send(app(&MockAdapter::new()), post_json("/import/preview", payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["headers"], json!(["id", "note"]));
        assert_eq!(body["rows"], json!([["1", "a"], ["2", ""]]));
        assert_eq!(body["inferred_types"][0]["mysql"], "SMALLINT");
        assert_eq!(body["inferred_types"][1]["oracle"], "VARCHAR2(2)");
    }

    #[tokio::test]
    async fn test_transliterate() {
        let request = Request::builder()
            .uri("/transliterate/%D0%98%D0%BC%D1%8F")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(&MockAdapter::new()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("Imja"));
    }
}
