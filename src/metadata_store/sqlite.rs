//! SQLite-backed `MetadataStore`. Schema is created on connect if absent;
//! no external migration tool is required since the whole `.linage`
//! directory is meant to be self-contained.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbBackend, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Schema, TransactionTrait,
};
use tracing::info;

use super::entities::{ai_activity, branches, commit_parents, commits, conflicts, file_records, line_changes, remotes, snapshots};
use super::{MetadataStore, StoreStatistics};
use crate::domain::{AiActivity, Branch, ChangeKind, Commit, Conflict, FileRecord, LineChange, Protocol, Remote, Snapshot};
use crate::errors::{LinageError, Result};
use crate::hash::Digest;

pub struct SqliteMetadataStore {
    connection: DatabaseConnection,
}

impl SqliteMetadataStore {
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let connection = Database::connect(connection_string).await?;
        ensure_schema(&connection).await?;
        info!(connection = connection_string, "metadata store connected");
        Ok(Self { connection })
    }

    /// Runs `connect` to completion on a fresh current-thread `tokio`
    /// runtime, for callers operating outside an async context.
    pub fn connect_blocking(connection_string: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LinageError::IoError)?;
        runtime.block_on(Self::connect(connection_string))
    }
}

async fn ensure_schema(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();

    macro_rules! create_table {
        ($entity:expr) => {{
            let mut stmt = schema.create_table_from_entity($entity);
            stmt.if_not_exists();
            db.execute(backend.build(&stmt)).await?;
        }};
    }

    create_table!(commits::Entity);
    create_table!(commit_parents::Entity);
    create_table!(branches::Entity);
    create_table!(snapshots::Entity);
    create_table!(file_records::Entity);
    create_table!(line_changes::Entity);
    create_table!(remotes::Entity);
    create_table!(ai_activity::Entity);
    create_table!(conflicts::Entity);

    Ok(())
}

fn parse_digest(s: &str) -> Result<Digest> {
    Digest::from_str(s)
}

fn parse_uuid(s: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s).map_err(|e| LinageError::Corruption(format!("invalid uuid `{s}`: {e}")))
}

async fn load_commit_model(
    db: &DatabaseConnection,
    model: commits::Model,
) -> Result<Commit> {
    let parent_rows = commit_parents::Entity::find()
        .filter(commit_parents::Column::CommitId.eq(model.id.clone()))
        .order_by_asc(commit_parents::Column::Position)
        .all(db)
        .await?;
    let mut parent_digests = Vec::with_capacity(parent_rows.len());
    for row in parent_rows {
        parent_digests.push(parse_digest(&row.parent_digest)?);
    }

    let snapshot_model = snapshots::Entity::find_by_id(model.snapshot_id.clone())
        .one(db)
        .await?
        .ok_or_else(|| LinageError::Corruption(format!("snapshot {} missing for commit {}", model.snapshot_id, model.id)))?;

    let file_rows = file_records::Entity::find()
        .filter(file_records::Column::SnapshotId.eq(snapshot_model.id.clone()))
        .all(db)
        .await?;
    let mut files = Vec::with_capacity(file_rows.len());
    for row in file_rows {
        files.push(FileRecord {
            id: parse_uuid(&row.id)?,
            path: row.path,
            digest: parse_digest(&row.digest)?,
            size: row.size as u64,
            modified_at: row.modified_at,
            deleted: row.deleted,
        });
    }

    let snapshot = Snapshot {
        id: parse_uuid(&snapshot_model.id)?,
        timestamp: snapshot_model.timestamp,
        files,
        digest: parse_digest(&snapshot_model.digest)?,
    };

    Ok(Commit {
        id: parse_uuid(&model.id)?,
        digest: parse_digest(&model.digest)?,
        message: model.message,
        author_name: model.author_name,
        author_email: model.author_email,
        timestamp: model.timestamp,
        parent_digests,
        snapshot,
        ai_assisted: model.ai_assisted,
    })
}

fn change_kind_str(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Added => "ADDED",
        ChangeKind::Deleted => "DELETED",
        ChangeKind::Modified => "MODIFIED",
    }
}

fn parse_change_kind(s: &str) -> Result<ChangeKind> {
    match s {
        "ADDED" => Ok(ChangeKind::Added),
        "DELETED" => Ok(ChangeKind::Deleted),
        "MODIFIED" => Ok(ChangeKind::Modified),
        other => Err(LinageError::Corruption(format!("unknown line change kind `{other}`"))),
    }
}

fn protocol_str(p: Protocol) -> &'static str {
    match p {
        Protocol::Https => "HTTPS",
        Protocol::Ssh => "SSH",
        Protocol::File => "FILE",
    }
}

fn parse_protocol(s: &str) -> Result<Protocol> {
    match s {
        "HTTPS" => Ok(Protocol::Https),
        "SSH" => Ok(Protocol::Ssh),
        "FILE" => Ok(Protocol::File),
        other => Err(LinageError::Corruption(format!("unknown remote protocol `{other}`"))),
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn save_commit(&self, commit: &Commit) -> Result<()> {
        let txn = self.connection.begin().await?;

        if commits::Entity::find()
            .filter(commits::Column::Digest.eq(commit.digest.to_hex()))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(LinageError::Conflict(format!("commit digest {} already exists", commit.digest)));
        }

        let snapshot_am = snapshots::ActiveModel {
            id: Set(commit.snapshot.id.to_string()),
            digest: Set(commit.snapshot.digest.to_hex()),
            timestamp: Set(commit.snapshot.timestamp),
        };
        snapshots::Entity::insert(snapshot_am).exec(&txn).await?;

        for file in &commit.snapshot.files {
            let file_am = file_records::ActiveModel {
                id: Set(file.id.to_string()),
                snapshot_id: Set(commit.snapshot.id.to_string()),
                path: Set(file.path.clone()),
                digest: Set(file.digest.to_hex()),
                size: Set(file.size as i64),
                modified_at: Set(file.modified_at),
                deleted: Set(file.deleted),
            };
            file_records::Entity::insert(file_am).exec(&txn).await?;
        }

        let commit_am = commits::ActiveModel {
            id: Set(commit.id.to_string()),
            digest: Set(commit.digest.to_hex()),
            message: Set(commit.message.clone()),
            author_name: Set(commit.author_name.clone()),
            author_email: Set(commit.author_email.clone()),
            timestamp: Set(commit.timestamp),
            snapshot_id: Set(commit.snapshot.id.to_string()),
            ai_assisted: Set(commit.ai_assisted),
        };
        commits::Entity::insert(commit_am).exec(&txn).await?;

        for (position, parent) in commit.parent_digests.iter().enumerate() {
            let parent_am = commit_parents::ActiveModel {
                row_id: sea_orm::ActiveValue::NotSet,
                commit_id: Set(commit.id.to_string()),
                parent_digest: Set(parent.to_hex()),
                position: Set(position as i32),
            };
            commit_parents::Entity::insert(parent_am).exec(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn get_commit(&self, id: uuid::Uuid) -> Result<Option<Commit>> {
        match commits::Entity::find_by_id(id.to_string()).one(&self.connection).await? {
            Some(model) => Ok(Some(load_commit_model(&self.connection, model).await?)),
            None => Ok(None),
        }
    }

    async fn get_commit_by_digest(&self, digest: &Digest) -> Result<Option<Commit>> {
        match commits::Entity::find()
            .filter(commits::Column::Digest.eq(digest.to_hex()))
            .one(&self.connection)
            .await?
        {
            Some(model) => Ok(Some(load_commit_model(&self.connection, model).await?)),
            None => Ok(None),
        }
    }

    async fn commit_exists(&self, digest: &Digest) -> Result<bool> {
        Ok(commits::Entity::find()
            .filter(commits::Column::Digest.eq(digest.to_hex()))
            .one(&self.connection)
            .await?
            .is_some())
    }

    async fn list_commits(&self) -> Result<Vec<Commit>> {
        let models = commits::Entity::find().all(&self.connection).await?;
        let mut commits = Vec::with_capacity(models.len());
        for model in models {
            commits.push(load_commit_model(&self.connection, model).await?);
        }
        Ok(commits)
    }

    async fn commits_by_author(&self, name: &str) -> Result<Vec<Commit>> {
        let models = commits::Entity::find()
            .filter(commits::Column::AuthorName.eq(name))
            .order_by_desc(commits::Column::Timestamp)
            .all(&self.connection)
            .await?;
        let mut commits = Vec::with_capacity(models.len());
        for model in models {
            commits.push(load_commit_model(&self.connection, model).await?);
        }
        Ok(commits)
    }

    async fn commits_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Commit>> {
        let models = commits::Entity::find()
            .filter(commits::Column::Timestamp.gte(start))
            .filter(commits::Column::Timestamp.lte(end))
            .all(&self.connection)
            .await?;
        let mut commits = Vec::with_capacity(models.len());
        for model in models {
            commits.push(load_commit_model(&self.connection, model).await?);
        }
        Ok(commits)
    }

    async fn save_branch(&self, branch: &Branch) -> Result<()> {
        let existing = branches::Entity::find_by_id(branch.id.to_string()).one(&self.connection).await?;
        let am = branches::ActiveModel {
            id: Set(branch.id.to_string()),
            name: Set(branch.name.clone()),
            head_digest: Set(branch.head.as_ref().map(Digest::to_hex)),
            is_active: Set(branch.is_active),
            created_at: Set(branch.created_at),
        };
        if existing.is_some() {
            branches::Entity::update(am).exec(&self.connection).await?;
        } else {
            branches::Entity::insert(am).exec(&self.connection).await?;
        }
        Ok(())
    }

    async fn get_branch(&self, name: &str) -> Result<Option<Branch>> {
        let model = branches::Entity::find()
            .filter(branches::Column::Name.eq(name))
            .one(&self.connection)
            .await?;
        match model {
            Some(m) => Ok(Some(Branch {
                id: parse_uuid(&m.id)?,
                name: m.name,
                head: m.head_digest.as_deref().map(parse_digest).transpose()?,
                is_active: m.is_active,
                created_at: m.created_at,
            })),
            None => Ok(None),
        }
    }

    async fn list_branches(&self) -> Result<Vec<Branch>> {
        let models = branches::Entity::find().all(&self.connection).await?;
        let mut out = Vec::with_capacity(models.len());
        for m in models {
            out.push(Branch {
                id: parse_uuid(&m.id)?,
                name: m.name,
                head: m.head_digest.as_deref().map(parse_digest).transpose()?,
                is_active: m.is_active,
                created_at: m.created_at,
            });
        }
        Ok(out)
    }

    async fn delete_branch(&self, name: &str) -> Result<()> {
        branches::Entity::delete_many().filter(branches::Column::Name.eq(name)).exec(&self.connection).await?;
        Ok(())
    }

    async fn batch_save_line_changes(&self, changes: &[LineChange]) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let txn = self.connection.begin().await?;
        for change in changes {
            let am = line_changes::ActiveModel {
                id: Set(change.id.to_string()),
                commit_id: Set(change.commit_id.map(|id| id.to_string())),
                line_number: Set(change.line_number as i64),
                old_digest: Set(change.old_digest.as_ref().map(Digest::to_hex)),
                new_digest: Set(change.new_digest.as_ref().map(Digest::to_hex)),
                kind: Set(change_kind_str(change.kind).to_string()),
                timestamp: Set(change.timestamp),
            };
            line_changes::Entity::insert(am).exec(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn line_changes_by_commit(&self, commit_id: uuid::Uuid) -> Result<Vec<LineChange>> {
        let models = line_changes::Entity::find()
            .filter(line_changes::Column::CommitId.eq(commit_id.to_string()))
            .order_by_asc(line_changes::Column::LineNumber)
            .all(&self.connection)
            .await?;
        let mut out = Vec::with_capacity(models.len());
        for m in models {
            out.push(LineChange {
                id: parse_uuid(&m.id)?,
                line_number: m.line_number as usize,
                old_digest: m.old_digest.as_deref().map(parse_digest).transpose()?,
                new_digest: m.new_digest.as_deref().map(parse_digest).transpose()?,
                kind: parse_change_kind(&m.kind)?,
                timestamp: m.timestamp,
                commit_id: m.commit_id.as_deref().map(parse_uuid).transpose()?,
            });
        }
        Ok(out)
    }

    async fn save_remote(&self, remote: &Remote) -> Result<()> {
        let existing = remotes::Entity::find_by_id(remote.name.clone()).one(&self.connection).await?;
        let am = remotes::ActiveModel {
            name: Set(remote.name.clone()),
            url: Set(remote.url.clone()),
            protocol: Set(protocol_str(remote.protocol).to_string()),
            is_default: Set(remote.is_default),
            project_id: Set(remote.project_id.map(|id| id.to_string())),
        };
        if existing.is_some() {
            remotes::Entity::update(am).exec(&self.connection).await?;
        } else {
            remotes::Entity::insert(am).exec(&self.connection).await?;
        }
        Ok(())
    }

    async fn get_remote(&self, name: &str) -> Result<Option<Remote>> {
        match remotes::Entity::find_by_id(name.to_string()).one(&self.connection).await? {
            Some(m) => Ok(Some(Remote {
                name: m.name,
                url: m.url,
                protocol: parse_protocol(&m.protocol)?,
                is_default: m.is_default,
                project_id: m.project_id.as_deref().map(parse_uuid).transpose()?,
            })),
            None => Ok(None),
        }
    }

    async fn list_remotes(&self) -> Result<Vec<Remote>> {
        let models = remotes::Entity::find().all(&self.connection).await?;
        let mut out = Vec::with_capacity(models.len());
        for m in models {
            out.push(Remote {
                name: m.name,
                url: m.url,
                protocol: parse_protocol(&m.protocol)?,
                is_default: m.is_default,
                project_id: m.project_id.as_deref().map(parse_uuid).transpose()?,
            });
        }
        Ok(out)
    }

    async fn delete_remote(&self, name: &str) -> Result<()> {
        remotes::Entity::delete_by_id(name.to_string()).exec(&self.connection).await?;
        Ok(())
    }

    async fn save_ai_activity(&self, activity: &AiActivity) -> Result<()> {
        let am = ai_activity::ActiveModel {
            id: Set(activity.id.to_string()),
            commit_id: Set(activity.commit_id.to_string()),
            description: Set(activity.description.clone()),
            timestamp: Set(activity.timestamp),
        };
        ai_activity::Entity::insert(am).exec(&self.connection).await?;
        Ok(())
    }

    async fn ai_activity_by_commit(&self, commit_id: uuid::Uuid) -> Result<Vec<AiActivity>> {
        let models = ai_activity::Entity::find()
            .filter(ai_activity::Column::CommitId.eq(commit_id.to_string()))
            .all(&self.connection)
            .await?;
        let mut out = Vec::with_capacity(models.len());
        for m in models {
            out.push(AiActivity { id: parse_uuid(&m.id)?, commit_id: parse_uuid(&m.commit_id)?, description: m.description, timestamp: m.timestamp });
        }
        Ok(out)
    }

    async fn recent_ai_activity(&self, limit: u64) -> Result<Vec<AiActivity>> {
        let models = ai_activity::Entity::find()
            .order_by_desc(ai_activity::Column::Timestamp)
            .limit(limit)
            .all(&self.connection)
            .await?;
        let mut out = Vec::with_capacity(models.len());
        for m in models {
            out.push(AiActivity { id: parse_uuid(&m.id)?, commit_id: parse_uuid(&m.commit_id)?, description: m.description, timestamp: m.timestamp });
        }
        Ok(out)
    }

    async fn save_conflict(&self, conflict: &Conflict) -> Result<()> {
        let am = conflicts::ActiveModel {
            id: Set(conflict.id.to_string()),
            path: Set(conflict.path.clone()),
            base_text: Set(conflict.base_text.clone()),
            local_text: Set(conflict.local_text.clone()),
            remote_text: Set(conflict.remote_text.clone()),
            resolved: Set(conflict.resolved),
            resolved_text: Set(conflict.resolved_text.clone()),
        };
        conflicts::Entity::insert(am).exec(&self.connection).await?;
        Ok(())
    }

    async fn list_unresolved_conflicts(&self) -> Result<Vec<Conflict>> {
        let models = conflicts::Entity::find()
            .filter(conflicts::Column::Resolved.eq(false))
            .all(&self.connection)
            .await?;
        let mut out = Vec::with_capacity(models.len());
        for m in models {
            out.push(Conflict {
                id: parse_uuid(&m.id)?,
                path: m.path,
                base_text: m.base_text,
                local_text: m.local_text,
                remote_text: m.remote_text,
                resolved: m.resolved,
                resolved_text: m.resolved_text,
            });
        }
        Ok(out)
    }

    async fn resolve_conflict(&self, id: uuid::Uuid, resolved_text: &str) -> Result<()> {
        let model = conflicts::Entity::find_by_id(id.to_string())
            .one(&self.connection)
            .await?
            .ok_or_else(|| LinageError::NotFound(format!("conflict {id}")))?;
        let mut am: conflicts::ActiveModel = model.into();
        am.resolved = Set(true);
        am.resolved_text = Set(resolved_text.to_string());
        conflicts::Entity::update(am).exec(&self.connection).await?;
        Ok(())
    }

    async fn statistics(&self) -> Result<StoreStatistics> {
        Ok(StoreStatistics {
            commits: commits::Entity::find().count(&self.connection).await?,
            branches: branches::Entity::find().count(&self.connection).await?,
            line_changes: line_changes::Entity::find().count(&self.connection).await?,
            remotes: remotes::Entity::find().count(&self.connection).await?,
            conflicts: conflicts::Entity::find().count(&self.connection).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashAlgorithm, Hasher};

    async fn store() -> SqliteMetadataStore {
        SqliteMetadataStore::connect("sqlite::memory:").await.unwrap()
    }

    fn sample_commit() -> Commit {
        let hasher = Hasher::new(HashAlgorithm::Sha256);
        let snapshot = Snapshot::new(
            hasher,
            Utc::now(),
            vec![FileRecord::new("a.txt".into(), hasher.hash_text("a"), 1, Utc::now())],
        );
        Commit::new(hasher, "init", "Ada", "ada@example.com", Utc::now(), vec![], snapshot, false)
    }

    #[tokio::test]
    async fn save_and_load_commit_round_trips() {
        let store = store().await;
        let commit = sample_commit();
        store.save_commit(&commit).await.unwrap();

        let loaded = store.get_commit_by_digest(&commit.digest).await.unwrap().unwrap();
        assert_eq!(loaded.message, "init");
        assert_eq!(loaded.snapshot.files.len(), 1);
        assert_eq!(loaded.snapshot.files[0].path, "a.txt");
    }

    #[tokio::test]
    async fn duplicate_digest_is_rejected() {
        let store = store().await;
        let commit = sample_commit();
        store.save_commit(&commit).await.unwrap();
        let err = store.save_commit(&commit).await.unwrap_err();
        assert!(matches!(err, LinageError::Conflict(_)));
    }

    #[tokio::test]
    async fn branch_crud_round_trips() {
        let store = store().await;
        let branch = Branch::new("main", None, true);
        store.save_branch(&branch).await.unwrap();

        let loaded = store.get_branch("main").await.unwrap().unwrap();
        assert_eq!(loaded.name, "main");
        assert!(loaded.is_active);

        store.delete_branch("main").await.unwrap();
        assert!(store.get_branch("main").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn statistics_counts_reflect_inserts() {
        let store = store().await;
        store.save_commit(&sample_commit()).await.unwrap();
        store.save_branch(&Branch::new("main", None, true)).await.unwrap();
        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.branches, 1);
    }
}
