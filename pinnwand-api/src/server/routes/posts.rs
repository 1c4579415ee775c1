use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::{
    model::{
        Id,
        like::LikeToggle,
        post::{CreatePost, Post, PostMarker, UpdatePost},
    },
    permission::{Action, is_allowed},
};
use pinnwand_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_patch(update_post)
        .typed_delete(delete_post)
        .typed_post(toggle_like)
        .typed_get(post_details)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct ListPostsPath();

async fn list_posts(
    ListPostsPath(): ListPostsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Post>>> {
    let posts = db.fetch_posts().await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(create): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>)> {
    let id = db.create_post(&create, user.user_id()).await?;
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct UpdatePostPath {
    id: Id<PostMarker>,
}

async fn update_post(
    UpdatePostPath { id }: UpdatePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<UpdatePost>,
) -> Result<Json<Post>> {
    if update.is_empty() {
        return Err(ServerError::EmptyPostUpdate);
    }

    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    if !is_allowed(Some(user.user_id()), post.author.id, Action::Write) {
        return Err(ServerError::Forbidden);
    }

    db.update_post(id, &update).await?;
    let updated = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(updated))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct DeletePostPath {
    id: Id<PostMarker>,
}

async fn delete_post(
    DeletePostPath { id }: DeletePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    if !is_allowed(Some(user.user_id()), post.author.id, Action::Delete) {
        return Err(ServerError::Forbidden);
    }

    db.delete_post(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct LikeResponse {
    detail: &'static str,
    liked: bool,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct ToggleLikePath {
    id: Id<PostMarker>,
}

async fn toggle_like(
    ToggleLikePath { id }: ToggleLikePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<LikeResponse>)> {
    let toggle = db
        .toggle_like(id, user.user_id())
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let response = match toggle {
        LikeToggle::Created => (
            StatusCode::CREATED,
            Json(LikeResponse {
                detail: "Post liked.",
                liked: true,
            }),
        ),
        LikeToggle::Removed => (
            StatusCode::NO_CONTENT,
            Json(LikeResponse {
                detail: "Like removed.",
                liked: false,
            }),
        ),
    };

    Ok(response)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/details", rejection(ServerError))]
struct PostDetailsPath {
    id: Id<PostMarker>,
}

async fn post_details(
    PostDetailsPath { id }: PostDetailsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}
