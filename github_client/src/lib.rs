//! Read-only GitHub REST API client.
//!
//! A small wrapper over the endpoints the link tracker needs: a single
//! issue or pull request with its newest comment, or the newest issue/PR
//! of a whole repository. No authentication, no write operations.

mod client;
mod error;
mod models;

pub use client::{GithubClient, GithubTarget, ItemKind, DEFAULT_BASE_URL};
pub use error::{Error, Result};
pub use models::{Actor, IssueComment, IssueItem};
