use crate::record::{AuthenticationRecord, FullCommentRecord, FullPostRecord};
use pinnwand_common::{
    model::{
        Id, ModelValidationError, PinnwandSnowflake, PinnwandSnowflakeGenerator,
        auth::{AuthTokenHash, Authentication},
        comment::{Comment, CommentMarker, CreateComment},
        like::{LikeMarker, LikeToggle},
        post::{CreatePost, Post, PostMarker, PostText, UpdatePost},
        user::UserMarker,
    },
    snowflake::NodeId,
};
use sqlx::PgPool;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<PinnwandSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, node_id: NodeId) -> Self {
        let snowflake_generator = Mutex::new(PinnwandSnowflakeGenerator::new(node_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    fn generate_snowflake(&self) -> PinnwandSnowflake {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = sqlx::query_as::<_, AuthenticationRecord>(
            "
            SELECT
                tokens.user_snowflake,
                tokens.token_hash,
                tokens.created_at,
                tokens.expires_after_seconds
            FROM
                auth.tokens
            WHERE
                tokens.token_hash = $1
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    /// All posts, newest first.
    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.content,
                posts.image_key,
                posts.created_at,
                users.user_snowflake,
                users.handle
            FROM
                posts.posts
                JOIN users.users ON users.user_snowflake = posts.user_snowflake
            ORDER BY
                posts.created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.content,
                posts.image_key,
                posts.created_at,
                users.user_snowflake,
                users.handle
            FROM
                posts.posts
                JOIN users.users ON users.user_snowflake = posts.user_snowflake
            WHERE
                posts.post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn create_post(
        &self,
        post: &CreatePost,
        author: Id<UserMarker>,
    ) -> Result<Id<PostMarker>> {
        let post_snowflake = self.generate_snowflake();

        let returned_snowflake = sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO posts.posts (post_snowflake, user_snowflake, content, image_key)
            VALUES ($1, $2, $3, $4)
            RETURNING posts.post_snowflake
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(author.snowflake().get().cast_signed())
        .bind(post.text.get())
        .bind(post.image.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(returned_snowflake.cast_unsigned().into())
    }

    /// Applies the present fields of `update`, leaves the rest untouched.
    /// Returns false when the post does not exist.
    pub async fn update_post(&self, post_id: Id<PostMarker>, update: &UpdatePost) -> Result<bool> {
        let result = sqlx::query(
            "
            UPDATE posts.posts
            SET
                content = COALESCE($2, content),
                image_key = COALESCE($3, image_key)
            WHERE
                posts.post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(update.text.as_ref().map(PostText::get))
        .bind(update.image.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the post and, through the schema's cascades, its comments
    /// and likes. Returns false when the post does not exist.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = sqlx::query(
            "
            DELETE FROM posts.posts
            WHERE posts.post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flips the like state of (post, author). The UNIQUE constraint on
    /// (post_snowflake, user_snowflake) arbitrates concurrent toggles: a
    /// losing INSERT surfaces as a unique violation and is treated as
    /// "already liked, remove instead". Returns `None` when the post row
    /// is gone.
    pub async fn toggle_like(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
    ) -> Result<Option<LikeToggle>> {
        let like_id: Id<LikeMarker> = self.generate_snowflake().into();

        let insert = sqlx::query(
            "
            INSERT INTO posts.likes (like_snowflake, post_snowflake, user_snowflake)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(like_id.snowflake().get().cast_signed())
        .bind(post_id.snowflake().get().cast_signed())
        .bind(author.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await;

        match insert {
            Ok(_) => Ok(Some(LikeToggle::Created)),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                sqlx::query(
                    "
                    DELETE FROM posts.likes
                    WHERE likes.post_snowflake = $1 AND likes.user_snowflake = $2
                    ",
                )
                .bind(post_id.snowflake().get().cast_signed())
                .bind(author.snowflake().get().cast_signed())
                .execute(&self.pool)
                .await?;

                Ok(Some(LikeToggle::Removed))
            }
            Err(sqlx::Error::Database(db_error)) if db_error.is_foreign_key_violation() => {
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// All comments, newest first.
    pub async fn fetch_comments(&self) -> Result<Vec<Comment>> {
        let records = sqlx::query_as::<_, FullCommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.content,
                comments.created_at,
                users.user_snowflake,
                users.handle
            FROM
                posts.comments
                JOIN users.users ON users.user_snowflake = comments.user_snowflake
            ORDER BY
                comments.created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn fetch_comment(
        &self,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>> {
        let record = sqlx::query_as::<_, FullCommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.content,
                comments.created_at,
                users.user_snowflake,
                users.handle
            FROM
                posts.comments
                JOIN users.users ON users.user_snowflake = comments.user_snowflake
            WHERE
                comments.comment_snowflake = $1
            ",
        )
        .bind(comment_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    /// Returns `None` when the referenced post does not exist; the foreign
    /// key rejects the insert even if the post vanishes after a caller's
    /// existence check.
    pub async fn create_comment(
        &self,
        comment: &CreateComment,
        author: Id<UserMarker>,
    ) -> Result<Option<Id<CommentMarker>>> {
        let comment_snowflake = self.generate_snowflake();

        let insert = sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO posts.comments (comment_snowflake, post_snowflake, user_snowflake, content)
            VALUES ($1, $2, $3, $4)
            RETURNING comments.comment_snowflake
            ",
        )
        .bind(comment_snowflake.get().cast_signed())
        .bind(comment.post.snowflake().get().cast_signed())
        .bind(author.snowflake().get().cast_signed())
        .bind(comment.text.get())
        .fetch_one(&self.pool)
        .await;

        match insert {
            Ok(returned_snowflake) => Ok(Some(returned_snowflake.cast_unsigned().into())),
            Err(sqlx::Error::Database(db_error)) if db_error.is_foreign_key_violation() => {
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Returns false when the comment does not exist.
    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let result = sqlx::query(
            "
            DELETE FROM posts.comments
            WHERE comments.comment_snowflake = $1
            ",
        )
        .bind(comment_id.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
