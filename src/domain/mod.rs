//! Core domain types: the commit DAG's vocabulary.

pub mod ai_activity;
pub mod branch;
pub mod commit;
pub mod conflict;
pub mod file_record;
pub mod line_change;
pub mod remote;
pub mod snapshot;

pub use ai_activity::AiActivity;
pub use branch::Branch;
pub use commit::Commit;
pub use conflict::Conflict;
pub use file_record::FileRecord;
pub use line_change::{ChangeKind, LineChange};
pub use remote::{Protocol, Remote};
pub use snapshot::Snapshot;
