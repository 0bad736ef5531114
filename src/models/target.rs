//! Target identifiers and storage contexts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a post.
///
/// Always a positive integer. Snapshot documents carry post IDs as JSON
/// object keys, so they are coerced from strings at import time with
/// [`PostId::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(u64);

/// Identifier of a user. Same coercion rules as [`PostId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

macro_rules! positive_id {
    ($ty:ident) => {
        impl $ty {
            /// Creates an identifier, returning `None` for zero.
            #[must_use]
            pub const fn new(id: u64) -> Option<Self> {
                if id == 0 { None } else { Some(Self(id)) }
            }

            /// Coerces a snapshot key into an identifier.
            ///
            /// Accepts decimal strings of a positive integer, surrounding
            /// whitespace ignored. Signs, fractions and zero are rejected.
            #[must_use]
            pub fn parse(key: &str) -> Option<Self> {
                let key = key.trim();
                if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                key.parse::<u64>().ok().and_then(Self::new)
            }

            /// Returns the raw integer value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(PostId);
positive_id!(UserId);

/// Storage context a field value lives in.
///
/// This is what the field-storage layer is addressed with: the site-wide
/// options page, a post, or a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetContext {
    /// The site-wide options page.
    Options,
    /// A single post.
    Post(PostId),
    /// A single user.
    User(UserId),
}

impl fmt::Display for TargetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Options => write!(f, "options"),
            Self::Post(id) => write!(f, "post {id}"),
            Self::User(id) => write!(f, "user {id}"),
        }
    }
}

/// Position of a value inside a snapshot field entry.
///
/// Unlike [`TargetContext`], a post target remembers the post type key it
/// was listed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The `options` entry.
    Options,
    /// An entry under `users`.
    User(UserId),
    /// An entry under `post_types.<post_type>`.
    Post {
        /// Post type key from the snapshot.
        post_type: String,
        /// Post identifier.
        id: PostId,
    },
}

impl Target {
    /// Returns the storage context for this target.
    #[must_use]
    pub const fn context(&self) -> TargetContext {
        match self {
            Self::Options => TargetContext::Options,
            Self::User(id) => TargetContext::User(*id),
            Self::Post { id, .. } => TargetContext::Post(*id),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Options => write!(f, "options"),
            Self::User(id) => write!(f, "user ID {id}"),
            Self::Post { post_type, id } => write!(f, "{post_type} ID {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("5" => Some(5); "plain")]
    #[test_case(" 42 " => Some(42); "whitespace")]
    #[test_case("0" => None; "zero")]
    #[test_case("-3" => None; "negative")]
    #[test_case("abc" => None; "alpha")]
    #[test_case("1.5" => None; "fraction")]
    #[test_case("" => None; "empty")]
    #[test_case("99999999999999999999999" => None; "overflow")]
    fn test_post_id_parse(key: &str) -> Option<u64> {
        PostId::parse(key).map(PostId::get)
    }

    #[test]
    fn test_user_id_rejects_zero() {
        assert!(UserId::new(0).is_none());
        assert_eq!(UserId::new(7).map(UserId::get), Some(7));
    }

    #[test]
    fn test_target_context() {
        let id = PostId::new(5).unwrap();
        let target = Target::Post {
            post_type: "page".to_string(),
            id,
        };
        assert_eq!(target.context(), TargetContext::Post(id));
        assert_eq!(target.to_string(), "page ID 5");
        assert_eq!(Target::Options.context(), TargetContext::Options);
    }
}
