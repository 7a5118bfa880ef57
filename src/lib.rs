//! Linage is a line-granular version control engine: a content-addressed
//! blob store, a commit DAG with branch/merge/rebase, three pluggable
//! line-diff strategies, a three-way merge engine, and a working-tree change
//! detector, all sitting on a transactional metadata store.

pub mod change_detector;
pub mod config;
pub mod diff;
pub mod domain;
pub mod errors;
pub mod graph_service;
pub mod hash;
pub mod ignore;
pub mod line_tracker;
pub mod merge;
pub mod merkle;
pub mod metadata_store;
pub mod recovery;
pub mod remote_transport;
pub mod repository;
pub mod scanner;
pub mod storage;
pub mod unified_diff;
pub mod utils;
pub mod watcher;

pub use errors::{LinageError, Result};
pub use repository::Repository;
