use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::json;
use std::sync::Arc;

use social_api::api::{self, AppState};
use social_api::store::Store;

/// Helper macro to build the app over a fresh in-memory store
macro_rules! init_app {
    () => {{
        let store = Arc::new(Store::new(":memory:").unwrap());
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { store }))
                .configure(api::configure_routes),
        )
        .await
    }};
}

/// Helper macro to create a user and return the response body
macro_rules! create_user {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/user")
            .set_json(json!({
                "username": $username,
                "email": format!("{}@example.com", $username)
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        body
    }};
}

// ==================== Create User Tests ====================

#[actix_web::test]
async fn test_create_user() {
    let app = init_app!();

    let req = test::TestRequest::post()
        .uri("/user")
        .set_json(json!({ "username": "alice", "email": "a@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["posts"], json!([]));
}

#[actix_web::test]
async fn test_create_user_duplicate_username_conflicts() {
    let app = init_app!();
    create_user!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/user")
        .set_json(json!({ "username": "alice", "email": "new@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["msg"].is_string());

    // State is unchanged
    let req = test::TestRequest::get().uri("/users").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["users"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_create_user_duplicate_email_conflicts() {
    let app = init_app!();
    create_user!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/user")
        .set_json(json!({ "username": "alicia", "email": "alice@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_create_user_missing_field_is_bad_request() {
    let app = init_app!();

    let req = test::TestRequest::post()
        .uri("/user")
        .set_json(json!({ "username": "alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["msg"].as_str().unwrap().contains("Invalid request body"));
}

#[actix_web::test]
async fn test_create_user_blank_field_is_bad_request() {
    let app = init_app!();

    let req = test::TestRequest::post()
        .uri("/user")
        .set_json(json!({ "username": "   ", "email": "a@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "username must not be empty");
}

// ==================== Read User Tests ====================

#[actix_web::test]
async fn test_list_users_projection() {
    let app = init_app!();
    create_user!(app, "alice");
    create_user!(app, "bob");

    let req = test::TestRequest::get().uri("/users").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let users = resp["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["nombre"], "alice");
    assert_eq!(users[0]["email"], "alice@example.com");
    assert_eq!(users[1]["nombre"], "bob");
    // Projection only carries name and email
    assert!(users[0]["id"].is_null());
}

#[actix_web::test]
async fn test_get_user_includes_posts() {
    let app = init_app!();
    let alice = create_user!(app, "alice");
    let id = alice["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/post/user/{}", id))
        .set_json(json!({ "message": "hello world" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri(&format!("/user/{}", id)).to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["username"], "alice");
    assert_eq!(resp["posts"][0]["message"], "hello world");
    assert_eq!(resp["posts"][0]["user_id"], id);
}

#[actix_web::test]
async fn test_get_missing_user() {
    let app = init_app!();

    let req = test::TestRequest::get().uri("/user/42").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "User 42 not found");
}

#[actix_web::test]
async fn test_non_numeric_id_is_not_found() {
    let app = init_app!();

    let req = test::TestRequest::get().uri("/user/alice").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ==================== Update / Delete Tests ====================

#[actix_web::test]
async fn test_update_user() {
    let app = init_app!();
    create_user!(app, "alice");

    let req = test::TestRequest::put()
        .uri("/user/1")
        .set_json(json!({ "username": "alice2", "email": "a2@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["username"], "alice2");
    assert_eq!(body["email"], "a2@x.com");
}

#[actix_web::test]
async fn test_update_user_partial_keeps_other_field() {
    let app = init_app!();
    create_user!(app, "alice");

    let req = test::TestRequest::put()
        .uri("/user/1")
        .set_json(json!({ "email": "new@x.com" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["username"], "alice");
    assert_eq!(resp["email"], "new@x.com");
}

#[actix_web::test]
async fn test_update_user_conflict() {
    let app = init_app!();
    create_user!(app, "alice");
    create_user!(app, "bob");

    let req = test::TestRequest::put()
        .uri("/user/2")
        .set_json(json!({ "username": "alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_update_missing_user() {
    let app = init_app!();

    let req = test::TestRequest::put()
        .uri("/user/9")
        .set_json(json!({ "username": "ghost", "email": "g@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_delete_user() {
    let app = init_app!();
    create_user!(app, "alice");

    let req = test::TestRequest::delete().uri("/user/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "success");

    let req = test::TestRequest::get().uri("/user/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete().uri("/user/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_health() {
    let app = init_app!();

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["status"], "ok");
    assert!(resp["timestamp"].is_string());
}
