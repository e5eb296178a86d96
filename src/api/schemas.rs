//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

/// One detected update, addressed to one chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub id: i32,
    pub url: String,
    pub description: String,
    pub tg_chat_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLinksUpdate {
    pub links: Vec<LinkUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResponse {
    pub id: i32,
    pub url: String,
    pub tags: Vec<String>,
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLinksResponse {
    pub links: Vec<LinkResponse>,
    pub size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddLinkRequest {
    pub link: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveLinkRequest {
    pub link: String,
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub description: String,
    pub code: String,
    pub exception_name: String,
    pub exception_message: String,
    #[serde(default)]
    pub stacktrace: Vec<String>,
}
