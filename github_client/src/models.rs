use serde::Deserialize;

/// The author of an issue, pull request or comment.
#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: String,
}

/// An issue or pull request as returned by the items/list endpoints.
///
/// `created_at` is left as the API's fixed UTC string
/// (`2024-01-01T10:00:00Z`); callers parse and localize it.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: Actor,
    pub created_at: String,
}

/// A comment on an issue or pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub body: Option<String>,
    pub user: Actor,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_item_deserializes_without_body() {
        let json = r#"{
            "title": "Fix the widget",
            "user": {"login": "alice"},
            "created_at": "2024-01-01T10:00:00Z"
        }"#;

        let item: IssueItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "Fix the widget");
        assert_eq!(item.user.login, "alice");
        assert!(item.body.is_none());
    }

    #[test]
    fn test_comment_deserializes() {
        let json = r#"{
            "body": "looks good",
            "user": {"login": "bob"},
            "created_at": "2024-02-02T12:30:00Z"
        }"#;

        let comment: IssueComment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.body.as_deref(), Some("looks good"));
        assert_eq!(comment.user.login, "bob");
    }
}
