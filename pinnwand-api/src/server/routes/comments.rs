use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::{
    model::{
        Id,
        comment::{Comment, CommentMarker, CreateComment},
    },
    permission::{Action, is_allowed},
};
use pinnwand_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments", rejection(ServerError))]
struct ListCommentsPath();

async fn list_comments(
    ListCommentsPath(): ListCommentsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = db.fetch_comments().await?;

    Ok(Json(comments))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments", rejection(ServerError))]
struct CreateCommentPath();

async fn create_comment(
    CreateCommentPath(): CreateCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(create): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>)> {
    let id = db
        .create_comment(&create, user.user_id())
        .await?
        .ok_or(ServerError::PostByIdNotFound(create.post))?;
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}", rejection(ServerError))]
struct DeleteCommentPath {
    id: Id<CommentMarker>,
}

async fn delete_comment(
    DeleteCommentPath { id }: DeleteCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;
    if !is_allowed(Some(user.user_id()), comment.author.id, Action::Delete) {
        return Err(ServerError::Forbidden);
    }

    db.delete_comment(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
