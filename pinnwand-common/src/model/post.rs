use crate::model::{Id, user::User};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_TEXT_MAX_LEN: usize = 5_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post as served to clients, author resolved to a full [`User`].
///
/// `created_at` is assigned by the database on insert and never changes
/// afterwards.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub text: PostText,
    pub image: Option<String>,
    pub created_at: UtcDateTime,
}

/// Client payload for creating a post. The author never comes from the
/// payload, it is always the authenticated caller.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreatePost {
    pub text: PostText,
    #[serde(default)]
    pub image: Option<String>,
}

/// Client payload for a partial post update. Absent fields keep their
/// stored value; a payload with no recognized field at all is rejected
/// before it reaches the database.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct UpdatePost {
    #[serde(default)]
    pub text: Option<PostText>,
    #[serde(default)]
    pub image: Option<String>,
}

impl UpdatePost {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image.is_none()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostText(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The post text is invalid")]
pub struct InvalidPostTextError(String);

impl PostText {
    pub fn new(text: String) -> Result<Self, InvalidPostTextError> {
        if !text.is_empty() && text.chars().count() <= POST_TEXT_MAX_LEN {
            Ok(PostText(text))
        } else {
            Err(InvalidPostTextError(text))
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

impl<'de> Deserialize<'de> for PostText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostText::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"PostText"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{POST_TEXT_MAX_LEN, PostText, UpdatePost};

    #[test]
    fn text_bounds() {
        assert!(PostText::new("hello".to_owned()).is_ok());
        assert!(PostText::new(String::new()).is_err());
        assert!(PostText::new("a".repeat(POST_TEXT_MAX_LEN)).is_ok());
        assert!(PostText::new("a".repeat(POST_TEXT_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn update_payload_emptiness() {
        assert!(UpdatePost::default().is_empty());

        let text_only = UpdatePost {
            text: Some(PostText::new("edited".to_owned()).unwrap()),
            image: None,
        };
        assert!(!text_only.is_empty());

        let image_only = UpdatePost {
            text: None,
            image: Some("cats/grumpy.webp".to_owned()),
        };
        assert!(!image_only.is_empty());
    }

    #[test]
    fn update_payload_deserializes_with_absent_fields() {
        let update: UpdatePost = serde_json::from_str(r#"{"text": "edited"}"#).unwrap();
        assert_eq!(update.text.unwrap().get(), "edited");
        assert!(update.image.is_none());

        let empty: UpdatePost = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
