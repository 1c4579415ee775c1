use crate::model::{Id, post::PostMarker, user::User};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const COMMENT_TEXT_MAX_LEN: usize = 1_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: User,
    pub text: CommentText,
    pub created_at: UtcDateTime,
}

/// Client payload for creating a comment. The target post comes from the
/// payload; the author is always the authenticated caller.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateComment {
    pub post: Id<PostMarker>,
    pub text: CommentText,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentText(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The comment text is invalid")]
pub struct InvalidCommentTextError(String);

impl CommentText {
    pub fn new(text: String) -> Result<Self, InvalidCommentTextError> {
        if !text.is_empty() && text.chars().count() <= COMMENT_TEXT_MAX_LEN {
            Ok(CommentText(text))
        } else {
            Err(InvalidCommentTextError(text))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for CommentText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentText::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"CommentText"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::comment::{COMMENT_TEXT_MAX_LEN, CommentText, CreateComment};

    #[test]
    fn text_bounds() {
        assert!(CommentText::new("nice post".to_owned()).is_ok());
        assert!(CommentText::new(String::new()).is_err());
        assert!(CommentText::new("a".repeat(COMMENT_TEXT_MAX_LEN)).is_ok());
        assert!(CommentText::new("a".repeat(COMMENT_TEXT_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn create_payload_requires_post() {
        let payload: Result<CreateComment, _> = serde_json::from_str(r#"{"text": "hi"}"#);
        assert!(payload.is_err());

        let payload: CreateComment =
            serde_json::from_str(r#"{"post": 42, "text": "hi"}"#).unwrap();
        assert_eq!(u64::from(payload.post), 42);
    }
}
