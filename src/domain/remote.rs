//! Remote endpoint metadata. Opaque to the core — persisted only because
//! the `MetadataStore` contract requires it; no remote transport is
//! implemented here (see `RemoteTransport`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Https,
    Ssh,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
    pub protocol: Protocol,
    pub is_default: bool,
    pub project_id: Option<uuid::Uuid>,
}
