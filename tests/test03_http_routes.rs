mod common;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use common::app_state;
use dashboard_dal::api::router;
use dashboard_dal::envelope::{ALLOW_METHODS, has_cors_headers};
use dashboard_dal::prelude::*;
use dashboard_dal::test_utils::{MemoryFactory, rows};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, "https://example.com")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn branch_row(id: i64, name: &str) -> Vec<RowValues> {
    vec![RowValues::Int(id), RowValues::from(name), RowValues::Bool(true)]
}

#[tokio::test]
async fn test01_cold_list_builds_one_pool_and_returns_rows() {
    let factory = MemoryFactory::new();
    factory.respond_with(|_| {
        Ok(rows(
            &["id", "name", "is_active"],
            vec![branch_row(2, "Airport"), branch_row(1, "Harbour")],
        ))
    });
    let state = app_state(&factory);
    let pools = Arc::clone(&state.pools);
    assert_eq!(pools.state(Target::Primary), Some(PoolState::Uninitialized));

    let response = router(state)
        .oneshot(request("GET", "/api/admin/branches"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(has_cors_headers(response.headers()));
    assert_eq!(factory.builds(), 1);
    assert_eq!(pools.state(Target::Primary), Some(PoolState::Connected));

    let executed = factory.executed();
    assert!(executed[0].sql.contains("ORDER BY name ASC"));
    assert!(executed[0].sql.contains("is_active = 1"));
    assert_eq!(
        body_json(response).await,
        json!({"data": [
            {"id": 2, "name": "Airport", "is_active": true},
            {"id": 1, "name": "Harbour", "is_active": true},
        ]})
    );
}

#[tokio::test]
async fn test02_unreachable_database_is_503_without_details() {
    let factory = MemoryFactory::new();
    factory.fail_connect(DalError::ConnectionError(
        "Login failed for user 'app_user' on db.test.local:1433".into(),
    ));

    let response = router(app_state(&factory))
        .oneshot(request("GET", "/api/admin/branches"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(has_cors_headers(response.headers()));
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"error": "Database connection failed. Please try again later."})
    );
    assert!(!body.to_string().contains("app_user"));
}

#[tokio::test]
async fn test03_preflight_echoes_origin_on_any_admin_route() {
    let factory = MemoryFactory::new();
    for uri in ["/api/admin/branches", "/api/admin/branches/5", "/api/admin/nowhere"] {
        let response = router(app_state(&factory))
            .oneshot(request("OPTIONS", uri))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://example.com");
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        assert_eq!(methods, ALLOW_METHODS);
        for method in ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"] {
            assert!(methods.split(',').any(|m| m == method), "{method} missing");
        }
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }
    assert_eq!(factory.builds(), 0);
}

#[tokio::test]
async fn test04_put_with_empty_name_is_400_and_issues_no_query() {
    let factory = MemoryFactory::new();
    let state = app_state(&factory);
    let pools = Arc::clone(&state.pools);

    let response = router(state)
        .oneshot(json_request("PUT", "/api/admin/branches/3", json!({"name": "  "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(has_cors_headers(response.headers()));
    assert_eq!(body_json(response).await, json!({"error": "Name is required"}));
    assert!(factory.executed().is_empty());
    assert_eq!(factory.builds(), 0);
    assert_eq!(pools.state(Target::Primary), Some(PoolState::Uninitialized));
}

#[tokio::test]
async fn test05_put_for_missing_id_is_404() {
    let factory = MemoryFactory::new();
    factory.respond_with(|descriptor| {
        if descriptor.returns_rows() {
            Ok(rows(&["id", "name", "is_active"], vec![]))
        } else {
            Ok(ResultSet::affected(0))
        }
    });

    let response = router(app_state(&factory))
        .oneshot(json_request("PUT", "/api/admin/branches/999", json!({"name": "Harbour"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(has_cors_headers(response.headers()));
    assert_eq!(body_json(response).await, json!({"error": "Branch not found"}));

    let executed = factory.executed();
    assert_eq!(executed.len(), 2);
    assert!(executed[0].sql.starts_with("UPDATE branches"));
    assert!(executed[1].sql.starts_with("SELECT"));
    assert_eq!(executed[1].params, vec![RowValues::Int(999)]);
}

#[tokio::test]
async fn test06_put_returns_the_updated_row() {
    let factory = MemoryFactory::new();
    factory.respond_with(|descriptor| {
        if descriptor.returns_rows() {
            Ok(rows(&["id", "name", "is_active"], vec![branch_row(3, "Harbour")]))
        } else {
            Ok(ResultSet::affected(1))
        }
    });

    let response = router(app_state(&factory))
        .oneshot(json_request("PUT", "/api/admin/branches/3", json!({"name": " Harbour "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"data": {"id": 3, "name": "Harbour", "is_active": true}})
    );
    assert!(factory.executed()[0].params.contains(&RowValues::Text("Harbour".into())));
}

#[tokio::test]
async fn test07_post_creates_with_201() {
    let factory = MemoryFactory::new();
    factory.respond_with(|_| Ok(rows(&["id", "name", "is_active"], vec![branch_row(10, "Depot")])));

    let response = router(app_state(&factory))
        .oneshot(json_request(
            "POST",
            "/api/admin/branches",
            json!({"name": "Depot", "code": "DPT"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(has_cors_headers(response.headers()));
    assert_eq!(body_json(response).await["data"]["id"], 10);
}

#[tokio::test]
async fn test08_malformed_input_is_400() {
    let factory = MemoryFactory::new();

    let response = router(app_state(&factory))
        .oneshot(request("GET", "/api/admin/branches/abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"error": "Invalid branch id"}));

    let bad_json = Request::builder()
        .method("POST")
        .uri("/api/admin/branches")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router(app_state(&factory)).oneshot(bad_json).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(has_cors_headers(response.headers()));
    assert_eq!(factory.builds(), 0);
}

#[tokio::test]
async fn test09_query_failures_are_500_without_details() {
    let factory = MemoryFactory::new();
    factory.respond_with(|_| Err(DalError::QueryError("Invalid column name 'secret_col'".into())));

    let response = router(app_state(&factory))
        .oneshot(request("GET", "/api/admin/branches/1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(has_cors_headers(response.headers()));
    let body = body_json(response).await;
    assert!(!body.to_string().contains("secret_col"));
}

#[tokio::test]
async fn test10_delete_is_soft_and_missing_rows_are_404() {
    let factory = MemoryFactory::new();
    factory.respond_with(|descriptor| {
        let found = descriptor.named_value("id") == Some(&RowValues::Int(4));
        Ok(ResultSet::affected(u64::from(found)))
    });

    let response = router(app_state(&factory))
        .oneshot(request("DELETE", "/api/admin/branches/4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(factory.executed()[0].sql.contains("SET is_active = 0"));

    let response = router(app_state(&factory))
        .oneshot(request("DELETE", "/api/admin/branches/5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"error": "Branch not found"}));
}

#[tokio::test]
async fn test11_hrms_routes_use_the_hrms_target() {
    let factory = MemoryFactory::new();
    factory.respond_with(|_| {
        let finance = vec![RowValues::Int(1), RowValues::from("Finance")];
        Ok(rows(&["id", "name"], vec![finance]))
    });
    let state = app_state(&factory);
    let pools = Arc::clone(&state.pools);

    let response = router(state)
        .oneshot(request("GET", "/api/hrms/departments"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(pools.state(Target::Hrms), Some(PoolState::Connected));
    assert_eq!(pools.state(Target::Primary), Some(PoolState::Uninitialized));
}

#[tokio::test]
async fn test12_every_response_carries_cors_headers() {
    let factory = MemoryFactory::new();
    let cases = [
        request("GET", "/health"),
        request("GET", "/api/admin/branches"),
        request("GET", "/no/such/route"),
        request("OPTIONS", "/health"),
        request("PATCH", "/api/admin/branches/1"),
    ];
    for req in cases {
        let uri = req.uri().clone();
        let response = router(app_state(&factory)).oneshot(req).await.unwrap();
        assert!(has_cors_headers(response.headers()), "{uri} lacks CORS headers");
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://example.com"
        );
    }

    let no_origin = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router(app_state(&factory)).oneshot(no_origin).await.unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test13_health_reports_states_without_connecting() {
    let factory = MemoryFactory::new();

    let response = router(app_state(&factory))
        .oneshot(request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"data": {"pools": {"primary": "uninitialized", "hrms": "uninitialized"}}})
    );
    assert_eq!(factory.builds(), 0);
}
