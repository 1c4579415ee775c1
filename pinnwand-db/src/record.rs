use pinnwand_common::model::{
    ModelValidationError,
    auth::Authentication,
    comment::{Comment, CommentText},
    post::{Post, PostText},
    user::{User, UserHandle},
};
use sqlx::FromRow;
use time::{Duration, PrimitiveDateTime};

/// A post row joined with its author's user row. Timestamps are stored as
/// `timestamp without time zone` and are UTC by convention.
#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_snowflake: i64,
    pub content: String,
    pub image_key: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub user_snowflake: i64,
    pub handle: String,
}

/// A comment row joined with its author's user row.
#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct FullCommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub content: String,
    pub created_at: PrimitiveDateTime,
    pub user_snowflake: i64,
    pub handle: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author: User {
                id: value.user_snowflake.cast_unsigned().into(),
                handle: UserHandle::new(value.handle)?,
            },
            text: PostText::new(value.content)?,
            image: value.image_key,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<FullCommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: FullCommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            author: User {
                id: value.user_snowflake.cast_unsigned().into(),
                handle: UserHandle::new(value.handle)?,
            },
            text: CommentText::new(value.content)?,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{AuthenticationRecord, FullCommentRecord, FullPostRecord};
    use pinnwand_common::model::{
        ModelValidationError, auth::Authentication, comment::Comment, post::Post,
    };
    use time::macros::datetime;

    #[test]
    fn post_record_converts() {
        let record = FullPostRecord {
            post_snowflake: 10,
            content: "first!".to_owned(),
            image_key: Some("uploads/sunset.webp".to_owned()),
            created_at: datetime!(2025-06-01 12:00),
            user_snowflake: 3,
            handle: "marta".to_owned(),
        };

        let post = Post::try_from(record).unwrap();
        assert_eq!(u64::from(post.id), 10);
        assert_eq!(u64::from(post.author.id), 3);
        assert_eq!(post.author.handle.get(), "marta");
        assert_eq!(post.text.get(), "first!");
        assert_eq!(post.image.as_deref(), Some("uploads/sunset.webp"));
    }

    #[test]
    fn post_record_rejects_invalid_content() {
        let record = FullPostRecord {
            post_snowflake: 10,
            content: String::new(),
            image_key: None,
            created_at: datetime!(2025-06-01 12:00),
            user_snowflake: 3,
            handle: "marta".to_owned(),
        };

        assert!(matches!(
            Post::try_from(record),
            Err(ModelValidationError::PostText(_))
        ));
    }

    #[test]
    fn comment_record_converts() {
        let record = FullCommentRecord {
            comment_snowflake: 20,
            post_snowflake: 10,
            content: "nice".to_owned(),
            created_at: datetime!(2025-06-01 12:30),
            user_snowflake: 4,
            handle: "jonas".to_owned(),
        };

        let comment = Comment::try_from(record).unwrap();
        assert_eq!(u64::from(comment.id), 20);
        assert_eq!(u64::from(comment.post), 10);
        assert_eq!(comment.author.handle.get(), "jonas");
    }

    #[test]
    fn authentication_record_rejects_bad_hash_length() {
        let record = AuthenticationRecord {
            user_snowflake: 3,
            token_hash: vec![0; 7],
            created_at: datetime!(2025-06-01 12:00),
            expires_after_seconds: None,
        };

        assert!(matches!(
            Authentication::try_from(record),
            Err(ModelValidationError::TokenHash(_))
        ));
    }
}
