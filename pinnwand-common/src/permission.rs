//! Object-level permission checks.
//!
//! A single pure function decides whether an actor may perform an action on
//! a resource, given the resource's recorded author. Reads are open to
//! everyone including anonymous callers; mutation is owner-only.

use crate::model::{Id, user::UserMarker};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Action {
    Read,
    Write,
    Delete,
}

/// `actor` is `None` for anonymous callers. Whether a request is allowed to
/// be anonymous at all (401 vs 403) is the route's concern; this function
/// only answers the object-level question.
#[must_use]
pub fn is_allowed(actor: Option<Id<UserMarker>>, author: Id<UserMarker>, action: Action) -> bool {
    match action {
        Action::Read => true,
        Action::Write | Action::Delete => actor == Some(author),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{Id, user::UserMarker},
        permission::{Action, is_allowed},
    };

    fn user(id: u64) -> Id<UserMarker> {
        id.into()
    }

    #[test]
    fn reads_are_open() {
        assert!(is_allowed(Some(user(1)), user(1), Action::Read));
        assert!(is_allowed(Some(user(2)), user(1), Action::Read));
        assert!(is_allowed(None, user(1), Action::Read));
    }

    #[test]
    fn mutation_is_owner_only() {
        for action in [Action::Write, Action::Delete] {
            assert!(is_allowed(Some(user(1)), user(1), action));
            assert!(!is_allowed(Some(user(2)), user(1), action));
            assert!(!is_allowed(None, user(1), action));
        }
    }
}
