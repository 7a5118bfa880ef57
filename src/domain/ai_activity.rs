//! A minimal record of a commit's AI-assisted provenance. The core never
//! interprets the description text, only stores and retrieves it by commit.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiActivity {
    pub id: uuid::Uuid,
    pub commit_id: uuid::Uuid,
    pub description: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl AiActivity {
    pub fn new(commit_id: uuid::Uuid, description: impl Into<String>) -> Self {
        Self { id: uuid::Uuid::new_v4(), commit_id, description: description.into(), timestamp: chrono::Utc::now() }
    }
}
