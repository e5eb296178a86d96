use serde::Deserialize;

/// Standard Stack Exchange response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Wrapper<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Post author. Deleted accounts come back without a display name.
#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A question. Only the title is needed here.
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub title: String,
}

/// An answer or comment.
///
/// `creation_date` is a unix timestamp in seconds; `body` is only
/// present when the request asks for the `withbody` filter.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub owner: Option<Owner>,
    pub creation_date: i64,
    #[serde(default)]
    pub body: Option<String>,
}
