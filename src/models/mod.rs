use serde::{Deserialize, Serialize};

/// User is an account that owns posts and follows other users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Post is a short message owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub message: String,
    pub user_id: i64,
}

/// UserDetail is the full user representation returned by the API,
/// with the user's posts materialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDetail {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub posts: Vec<Post>,
}

impl UserDetail {
    pub fn new(user: User, posts: Vec<Post>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            posts,
        }
    }
}

/// Lightweight projection used by the user listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    #[serde(rename = "nombre")]
    pub username: String,
    pub email: String,
}

/// Post joined with its author's username
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: i64,
    pub message: String,
    pub username: String,
}

/// A user together with one side of its follow edges.
///
/// The `followers` key is kept for both traversals. For `/followed/{id}` it
/// holds the users that `user` follows, for `/followers/{id}` the users that
/// follow `user`.
#[derive(Debug, Clone, Serialize)]
pub struct FollowGraphResponse {
    pub user: UserDetail,
    pub followers: Vec<UserDetail>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
}

/// Plain `{msg}` envelope used for errors and acknowledgements
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

// Request types for API
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    /// Id of the user to follow
    pub user: i64,
}
