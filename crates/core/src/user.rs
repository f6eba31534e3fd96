//! Users and group membership.

/// A user is an identifier and the groups the identifier belongs to.
///
/// The default value is the anonymous user: an empty id and no groups.
/// Users are produced per request by an identity resolver and never
/// persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub groups: Vec<String>,
}

impl User {
    /// Create a user with the given id and groups.
    pub fn new(id: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            id: id.into(),
            groups,
        }
    }

    /// The anonymous user.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// True when this is the anonymous user.
    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }
}

/// True iff `value` equals some element of `set`.
///
/// The empty string gets no special treatment here; callers decide what an
/// empty user id means.
pub fn is_member(value: &str, set: &[String]) -> bool {
    set.iter().any(|s| s == value)
}

/// True iff any element of `a` is a member of `b`.
///
/// O(|a|·|b|), which is fine: rights lists and group lists are short.
pub fn intersects(a: &[String], b: &[String]) -> bool {
    a.iter().any(|s| is_member(s, b))
}
