use actix_web::error::InternalError;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use std::sync::Arc;

use crate::models::*;
use crate::store::{Store, StoreError};

pub struct AppState {
    pub store: Arc<Store>,
}

// ==================== Error Mapping ====================

fn store_error_response(err: StoreError) -> HttpResponse {
    match err {
        StoreError::NotFound(what) => {
            HttpResponse::NotFound().json(MessageResponse::new(format!("{} not found", what)))
        }
        StoreError::Conflict(what) => HttpResponse::Conflict().json(MessageResponse::new(what)),
        e => {
            // Details stay in the log.
            log::error!("Store failure: {}", e);
            HttpResponse::InternalServerError().json(MessageResponse::new("Something went wrong"))
        }
    }
}

fn bad_request(msg: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(MessageResponse::new(msg))
}

/// Returns the name of the first blank field, if any
fn first_blank<'a>(fields: &[(&'a str, &str)]) -> Option<&'a str> {
    fields
        .iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
}

/// Malformed or incomplete JSON bodies become 400 `{msg}` responses.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = bad_request(format!("Invalid request body: {}", err));
        InternalError::from_response(err, response).into()
    })
}

// ==================== Health Check ====================

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// ==================== User Endpoints ====================

pub async fn create_user(
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> impl Responder {
    let fields = [("username", body.username.as_str()), ("email", body.email.as_str())];
    if let Some(field) = first_blank(&fields) {
        return bad_request(format!("{} must not be empty", field));
    }

    let user = match state.store.create_user(&body.username, &body.email) {
        Ok(u) => u,
        Err(e) => return store_error_response(e),
    };

    // A fresh user has no posts yet.
    HttpResponse::Created().json(UserDetail::new(user, Vec::new()))
}

pub async fn list_users(state: web::Data<AppState>) -> impl Responder {
    match state.store.list_users() {
        Ok(users) => HttpResponse::Ok().json(UserListResponse { users }),
        Err(e) => store_error_response(e),
    }
}

pub async fn get_user(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match state.store.get_user_detail(path.into_inner()) {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => store_error_response(e),
    }
}

pub async fn update_user(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateUserRequest>,
) -> impl Responder {
    let username = body.username.as_deref();
    let email = body.email.as_deref();

    let provided: Vec<(&str, &str)> = [("username", username), ("email", email)]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect();
    if let Some(field) = first_blank(&provided) {
        return bad_request(format!("{} must not be empty", field));
    }

    match state.store.update_user(path.into_inner(), username, email) {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => store_error_response(e),
    }
}

pub async fn delete_user(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match state.store.delete_user(path.into_inner()) {
        Ok(_) => HttpResponse::Ok().json(MessageResponse::new("success")),
        Err(e) => store_error_response(e),
    }
}

// ==================== Post Endpoints ====================

pub async fn create_post(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<CreatePostRequest>,
) -> impl Responder {
    if first_blank(&[("message", body.message.as_str())]).is_some() {
        return bad_request("message must not be empty");
    }

    match state.store.create_post(path.into_inner(), &body.message) {
        Ok(post) => HttpResponse::Created().json(post),
        Err(e) => store_error_response(e),
    }
}

pub async fn list_user_posts(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match state.store.list_posts_by_user(path.into_inner()) {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => store_error_response(e),
    }
}

pub async fn list_posts(state: web::Data<AppState>) -> impl Responder {
    match state.store.list_posts() {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(e) => store_error_response(e),
    }
}

pub async fn get_post(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match state.store.get_post(path.into_inner()) {
        Ok(post) => HttpResponse::Ok().json(post),
        Err(e) => store_error_response(e),
    }
}

// ==================== Follower Endpoints ====================

pub async fn follow_user(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<FollowRequest>,
) -> impl Responder {
    match state.store.add_follow(path.into_inner(), body.user) {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => store_error_response(e),
    }
}

pub async fn unfollow_user(
    state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (user_id, target_id) = path.into_inner();
    match state.store.remove_follow(user_id, target_id) {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => store_error_response(e),
    }
}

/// Users that `{id}` follows, under the `followers` key.
pub async fn list_followed(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match state.store.list_followed(path.into_inner()) {
        Ok(graph) => HttpResponse::Ok().json(graph),
        Err(e) => store_error_response(e),
    }
}

/// Users following `{id}`.
pub async fn list_followers(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match state.store.list_followers(path.into_inner()) {
        Ok(graph) => HttpResponse::Ok().json(graph),
        Err(e) => store_error_response(e),
    }
}

// ==================== Route Configuration ====================

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        .app_data(json_config())

        // Health check
        .route("/health", web::get().to(health))

        // Users
        .route("/user", web::post().to(create_user))
        .route("/users", web::get().to(list_users))
        .route("/user/{id}", web::get().to(get_user))
        .route("/user/{id}", web::put().to(update_user))
        .route("/user/{id}", web::delete().to(delete_user))

        // Posts
        .route("/post/user/{id}", web::post().to(create_post))
        .route("/user/{id}/posts", web::get().to(list_user_posts))
        .route("/posts", web::get().to(list_posts))
        .route("/post/{id}", web::get().to(get_post))

        // Follower graph
        .route("/follower/{id}", web::post().to(follow_user))
        .route("/follower/{id}/{target_id}", web::delete().to(unfollow_user))
        .route("/followed/{id}", web::get().to(list_followed))
        .route("/followers/{id}", web::get().to(list_followers));
}
