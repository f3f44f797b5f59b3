//! Structural cache keys.
//!
//! A [`QueryKey`] is an ordered list of [`KeyPart`]s compared by value, so
//! two requests with the same filters always land on the same cache slot.
//! Prefix matching on keys is the unit of invalidation.

use std::fmt;

use crate::models::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Str(String),
    Int(i64),
    Bool(bool),
    /// A discriminator naming a user. Kept distinct from `Str` so that
    /// user-scoped entries can be found and dropped on sign-out.
    User(UserId),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<usize> for KeyPart {
    fn from(value: usize) -> Self {
        KeyPart::Int(value as i64)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl From<UserId> for KeyPart {
    fn from(value: UserId) -> Self {
        KeyPart::User(value)
    }
}

impl From<&UserId> for KeyPart {
    fn from(value: &UserId) -> Self {
        KeyPart::User(value.clone())
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Str(s) => write!(f, "{:?}", s),
            KeyPart::Int(i) => write!(f, "{}", i),
            KeyPart::Bool(b) => write!(f, "{}", b),
            KeyPart::User(id) => write!(f, "user:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Start a key with its resource name.
    pub fn new(resource: &str) -> Self {
        Self(vec![KeyPart::from(resource)])
    }

    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn resource(&self) -> Option<&str> {
        match self.0.first() {
            Some(KeyPart::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// True when `prefix` equals the first `prefix.len()` parts of this key.
    /// Every key starts with itself.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True when any part names `user`.
    pub fn mentions_user(&self, user: &UserId) -> bool {
        self.0
            .iter()
            .any(|part| matches!(part, KeyPart::User(id) if id == user))
    }

    /// True when any part names some user.
    pub fn is_user_scoped(&self) -> bool {
        self.0.iter().any(|part| matches!(part, KeyPart::User(_)))
    }
}

/// Build a key from a resource name and its discriminators, in order.
///
/// ```
/// use bazaar::query::{key_for, QueryKey};
///
/// let key = key_for("listings", ["draft"]).with(8usize);
/// assert_eq!(key, QueryKey::new("listings").with("draft").with(8usize));
/// ```
pub fn key_for<P, I>(resource: &str, discriminators: I) -> QueryKey
where
    P: Into<KeyPart>,
    I: IntoIterator<Item = P>,
{
    discriminators
        .into_iter()
        .fold(QueryKey::new(resource), |key, part| key.with(part))
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, "]")
    }
}
