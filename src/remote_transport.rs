//! Seam traits for collaborators the core never implements itself: a push/
//! pull/fetch transport and a credential store. Modeled the way the core's
//! own protocol streaming does it — a boxed `Stream` wrapping a
//! `tokio_stream::wrappers::ReceiverStream` for progress updates — so a
//! transport crate can report long-running transfers without the core
//! depending on any particular network stack.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::errors::Result;

pub type ProgressStream = Pin<Box<dyn Stream<Item = TransferProgress> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: Option<u64>,
}

/// Wraps a bounded `mpsc` channel as a `ProgressStream`, the shape every
/// `RemoteTransport` implementor is expected to return.
pub fn progress_channel(buffer: usize) -> (mpsc::Sender<TransferProgress>, ProgressStream) {
    let (tx, rx) = mpsc::channel(buffer);
    (tx, Box::pin(ReceiverStream::new(rx)))
}

/// A credential, opaque to the core beyond its expiry.
#[derive(Debug, Clone)]
pub struct Credential {
    pub url: String,
    pub secret: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Remote push/pull/fetch, implemented by a transport crate the core never
/// depends on directly. `push`/`pull`/`fetch` report progress on the
/// returned stream and resolve once the stream is exhausted.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn push(&self, url: &str, branch: &str) -> Result<ProgressStream>;
    async fn pull(&self, url: &str, branch: &str) -> Result<ProgressStream>;
    async fn fetch(&self, url: &str) -> Result<ProgressStream>;
    async fn validate_connection(&self, url: &str) -> Result<bool>;
}

/// Credential persistence, implemented by whatever secure-storage layer the
/// embedding application already has (keychain, encrypted file, vault).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<Credential>>;
    async fn save(&self, url: &str, credential: Credential) -> Result<()>;
    async fn remove(&self, url: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<String>>;
    async fn clear_expired(&self) -> Result<()>;
}
