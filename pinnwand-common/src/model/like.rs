use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LikeMarker;

/// Outcome of a like toggle. Every call flips the state: a like either
/// came into existence or was removed, there is no no-op outcome.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub enum LikeToggle {
    Created,
    Removed,
}

impl LikeToggle {
    #[must_use]
    pub fn liked(self) -> bool {
        matches!(self, LikeToggle::Created)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::like::LikeToggle;

    #[test]
    fn liked_tracks_outcome() {
        assert!(LikeToggle::Created.liked());
        assert!(!LikeToggle::Removed.liked());
    }
}
