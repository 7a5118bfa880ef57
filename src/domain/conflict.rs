//! A persisted record of one file's merge conflict, matching the
//! `MergeEngine` result shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: uuid::Uuid,
    pub path: String,
    pub base_text: String,
    pub local_text: String,
    pub remote_text: String,
    pub resolved: bool,
    pub resolved_text: String,
}

impl Conflict {
    pub fn new(path: impl Into<String>, base_text: String, local_text: String, remote_text: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            path: path.into(),
            base_text,
            local_text,
            remote_text,
            resolved: false,
            resolved_text: String::new(),
        }
    }
}
