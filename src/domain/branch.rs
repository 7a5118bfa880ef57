//! A branch names a commit digest. Moving its head is the only legal
//! mutation after creation; names are unique within a repository.

use serde::{Deserialize, Serialize};

use crate::hash::Digest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: uuid::Uuid,
    pub name: String,
    pub head: Option<Digest>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Branch {
    pub fn new(name: impl Into<String>, head: Option<Digest>, is_active: bool) -> Self {
        Self { id: uuid::Uuid::new_v4(), name: name.into(), head, is_active, created_at: chrono::Utc::now() }
    }
}
