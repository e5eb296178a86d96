//! Read-only Stack Exchange API client (v2.3), pinned to the
//! stackoverflow site.
//!
//! Covers the three endpoints the link tracker needs: a question, its
//! newest answer and its newest comment.

mod client;
mod error;
mod models;

pub use client::{question_id_from_url, StackOverflowClient, DEFAULT_BASE_URL};
pub use error::{Error, Result};
pub use models::{Owner, Post, Question, Wrapper};
