//! Tag and filter lists attached to subscriptions.
//!
//! Both are stored as JSON arrays of strings in the subscriptions
//! table. Tags categorize a subscription for digest queries; filters
//! restrict notifications to a set of activity authors.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Tags(pub Vec<String>);

impl Deref for Tags {
    type Target = Vec<String>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Tags {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        Tags(tags)
    }
}

impl Tags {
    /// True when this list shares at least one entry with `other`.
    pub fn intersects(&self, other: &[String]) -> bool {
        self.0.iter().any(|t| other.contains(t))
    }
}
