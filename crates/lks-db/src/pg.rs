//! Postgres-backed [`Repository`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use lks_schemas::{Lock, LogEntry};

use crate::repository::Repository;
use crate::rows::{CredentialId, HistoryEntry, LockUpdate, Snapshot, UpdateType};

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn snapshot_from_row(row: &PgRow) -> Result<Snapshot> {
    let lock_json: Value = row.try_get("lock_json")?;
    let lock: Lock = serde_json::from_value(lock_json).context("decode lock_json failed")?;
    Ok(Snapshot {
        lock_id: row.try_get("lock_id")?,
        credential_id: CredentialId::new(row.try_get::<String, _>("credential_id")?),
        is_active: row.try_get("is_active")?,
        update_token: row.try_get("update_token")?,
        lock,
        updated_at: row.try_get("updated_at_utc")?,
    })
}

fn history_from_row(row: &PgRow) -> Result<HistoryEntry> {
    let log_json: Value = row.try_get("log_json")?;
    let log: LogEntry = serde_json::from_value(log_json).context("decode log_json failed")?;
    Ok(HistoryEntry {
        id: row.try_get("log_id")?,
        lock_id: row.try_get("lock_id")?,
        credential_id: CredentialId::new(row.try_get::<String, _>("credential_id")?),
        created_at: row.try_get("created_at_utc")?,
        processed: row.try_get("processed")?,
        log,
    })
}

fn update_from_row(row: &PgRow) -> Result<LockUpdate> {
    Ok(LockUpdate {
        id: row.try_get("update_id")?,
        created_at: row.try_get("created_at_utc")?,
        lock_id: row.try_get("lock_id")?,
        credential_id: CredentialId::new(row.try_get::<String, _>("credential_id")?),
        update_type: UpdateType::parse(&row.try_get::<String, _>("update_type")?)?,
        payload: row.try_get("payload")?,
    })
}

const SNAPSHOT_COLUMNS: &str =
    "lock_id, credential_id, is_active, update_token, lock_json, updated_at_utc";
const HISTORY_COLUMNS: &str =
    "log_id, lock_id, credential_id, created_at_utc, processed, log_json";
const UPDATE_COLUMNS: &str =
    "update_id, created_at_utc, lock_id, credential_id, update_type, payload";

#[async_trait::async_trait]
impl Repository for PgRepository {
    async fn snapshot(&self, lock_id: &str, cred: &CredentialId) -> Result<Option<Snapshot>> {
        let row = sqlx::query(&format!(
            "select {SNAPSHOT_COLUMNS} from lock_snapshots where lock_id = $1 and credential_id = $2"
        ))
        .bind(lock_id)
        .bind(cred.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("snapshot fetch failed")?;

        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn active_snapshots(
        &self,
        cred: &CredentialId,
        shared_lock_ids: Option<&[String]>,
    ) -> Result<Vec<Snapshot>> {
        let rows = match shared_lock_ids {
            None => sqlx::query(&format!(
                "select {SNAPSHOT_COLUMNS} from lock_snapshots \
                 where credential_id = $1 and is_active = true \
                 order by lock_id"
            ))
            .bind(cred.as_str())
            .fetch_all(&self.pool)
            .await
            .context("active_snapshots failed")?,
            Some(ids) => sqlx::query(&format!(
                "select {SNAPSHOT_COLUMNS} from lock_snapshots \
                 where credential_id = $1 and is_active = true and shared_lock_id = any($2) \
                 order by lock_id"
            ))
            .bind(cred.as_str())
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .context("active_snapshots (shared filter) failed")?,
        };

        rows.iter().map(snapshot_from_row).collect()
    }

    async fn upsert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let lock_json = serde_json::to_value(&snapshot.lock).context("encode lock failed")?;
        sqlx::query(
            r#"
            insert into lock_snapshots
              (lock_id, credential_id, is_active, update_token, shared_lock_id, lock_json, updated_at_utc)
            values ($1, $2, $3, $4, $5, $6, $7)
            on conflict (lock_id, credential_id) do update set
              is_active = excluded.is_active,
              update_token = excluded.update_token,
              shared_lock_id = excluded.shared_lock_id,
              lock_json = excluded.lock_json,
              updated_at_utc = excluded.updated_at_utc
            "#,
        )
        .bind(&snapshot.lock_id)
        .bind(snapshot.credential_id.as_str())
        .bind(snapshot.is_active)
        .bind(snapshot.update_token)
        .bind(snapshot.lock.shared_lock_id())
        .bind(lock_json)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await
        .context("upsert_snapshot failed")?;
        Ok(())
    }

    async fn mark_snapshot_inactive(&self, lock_id: &str, cred: &CredentialId) -> Result<()> {
        sqlx::query(
            "update lock_snapshots set is_active = false where lock_id = $1 and credential_id = $2",
        )
        .bind(lock_id)
        .bind(cred.as_str())
        .execute(&self.pool)
        .await
        .context("mark_snapshot_inactive failed")?;
        Ok(())
    }

    async fn most_recent_history_id(
        &self,
        lock_id: &str,
        cred: &CredentialId,
    ) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            select log_id from lock_history
            where lock_id = $1 and credential_id = $2
            order by created_at_utc desc, inserted_seq desc
            limit 1
            "#,
        )
        .bind(lock_id)
        .bind(cred.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("most_recent_history_id failed")?;
        Ok(row.map(|(id,)| id))
    }

    async fn unprocessed_history(&self, cred: &CredentialId) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(&format!(
            "select {HISTORY_COLUMNS} from lock_history \
             where credential_id = $1 and processed = false \
             order by created_at_utc asc, inserted_seq asc"
        ))
        .bind(cred.as_str())
        .fetch_all(&self.pool)
        .await
        .context("unprocessed_history failed")?;

        rows.iter().map(history_from_row).collect()
    }

    async fn has_unprocessed_history(&self, lock_id: &str, cred: &CredentialId) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            select exists (
              select 1 from lock_history
              where lock_id = $1 and credential_id = $2 and processed = false
            )
            "#,
        )
        .bind(lock_id)
        .bind(cred.as_str())
        .fetch_one(&self.pool)
        .await
        .context("has_unprocessed_history failed")?;
        Ok(exists)
    }

    async fn insert_history(&self, entries: &[HistoryEntry]) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("history tx begin failed")?;
        let mut inserted = 0usize;
        for e in entries {
            let log_json = serde_json::to_value(&e.log).context("encode log failed")?;
            let res = sqlx::query(
                r#"
                insert into lock_history
                  (log_id, credential_id, lock_id, created_at_utc, processed, log_json)
                values ($1, $2, $3, $4, $5, $6)
                on conflict (credential_id, log_id) do nothing
                "#,
            )
            .bind(&e.id)
            .bind(e.credential_id.as_str())
            .bind(&e.lock_id)
            .bind(e.created_at)
            .bind(e.processed)
            .bind(log_json)
            .execute(&mut *tx)
            .await
            .context("insert_history failed")?;
            inserted += res.rows_affected() as usize;
        }
        tx.commit().await.context("history tx commit failed")?;
        debug!(offered = entries.len(), inserted, "db/history-inserted");
        Ok(inserted)
    }

    async fn mark_history_processed(&self, id: &str, cred: &CredentialId) -> Result<()> {
        sqlx::query(
            "update lock_history set processed = true where log_id = $1 and credential_id = $2",
        )
        .bind(id)
        .bind(cred.as_str())
        .execute(&self.pool)
        .await
        .context("mark_history_processed failed")?;
        Ok(())
    }

    async fn update(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        update_type: UpdateType,
    ) -> Result<Option<LockUpdate>> {
        let row = sqlx::query(&format!(
            "select {UPDATE_COLUMNS} from lock_updates \
             where lock_id = $1 and credential_id = $2 and update_type = $3 \
             order by created_at_utc desc, inserted_seq desc limit 1"
        ))
        .bind(lock_id)
        .bind(cred.as_str())
        .bind(update_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("update fetch failed")?;

        row.as_ref().map(update_from_row).transpose()
    }

    async fn pending_updates(&self, cred: &CredentialId) -> Result<Vec<LockUpdate>> {
        let rows = sqlx::query(&format!(
            "select {UPDATE_COLUMNS} from lock_updates \
             where credential_id = $1 \
             order by created_at_utc asc, inserted_seq asc"
        ))
        .bind(cred.as_str())
        .fetch_all(&self.pool)
        .await
        .context("pending_updates failed")?;

        rows.iter().map(update_from_row).collect()
    }

    async fn insert_update(&self, update: &LockUpdate) -> Result<()> {
        sqlx::query(
            r#"
            insert into lock_updates
              (update_id, created_at_utc, lock_id, credential_id, update_type, payload)
            values ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(update.id)
        .bind(update.created_at)
        .bind(&update.lock_id)
        .bind(update.credential_id.as_str())
        .bind(update.update_type.as_str())
        .bind(&update.payload)
        .execute(&self.pool)
        .await
        .context("insert_update failed")?;
        Ok(())
    }

    async fn upsert_update(&self, update: &LockUpdate) -> Result<()> {
        sqlx::query(
            r#"
            insert into lock_updates
              (update_id, created_at_utc, lock_id, credential_id, update_type, payload)
            values ($1, $2, $3, $4, $5, $6)
            on conflict (update_id) do update set
              payload = excluded.payload
            "#,
        )
        .bind(update.id)
        .bind(update.created_at)
        .bind(&update.lock_id)
        .bind(update.credential_id.as_str())
        .bind(update.update_type.as_str())
        .bind(&update.payload)
        .execute(&self.pool)
        .await
        .context("upsert_update failed")?;
        Ok(())
    }

    async fn delete_update(&self, id: Uuid) -> Result<()> {
        sqlx::query("delete from lock_updates where update_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete_update failed")?;
        Ok(())
    }

    async fn delete_updates_of_type(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        update_type: UpdateType,
    ) -> Result<()> {
        sqlx::query(
            "delete from lock_updates where lock_id = $1 and credential_id = $2 and update_type = $3",
        )
        .bind(lock_id)
        .bind(cred.as_str())
        .bind(update_type.as_str())
        .execute(&self.pool)
        .await
        .context("delete_updates_of_type failed")?;
        Ok(())
    }

    async fn delete_all_updates(&self, lock_id: &str, cred: &CredentialId) -> Result<()> {
        sqlx::query("delete from lock_updates where lock_id = $1 and credential_id = $2")
            .bind(lock_id)
            .bind(cred.as_str())
            .execute(&self.pool)
            .await
            .context("delete_all_updates failed")?;
        Ok(())
    }

    async fn share_link(&self, lock_id: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("select link from share_links where lock_id = $1")
                .bind(lock_id)
                .fetch_optional(&self.pool)
                .await
                .context("share_link fetch failed")?;
        Ok(row.map(|(l,)| l))
    }

    async fn upsert_share_link(&self, lock_id: &str, link: &str) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        sqlx::query(
            r#"
            insert into share_links (lock_id, link, cached_at_utc)
            values ($1, $2, $3)
            on conflict (lock_id) do update set link = excluded.link, cached_at_utc = excluded.cached_at_utc
            "#,
        )
        .bind(lock_id)
        .bind(link)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("upsert_share_link failed")?;
        Ok(())
    }

    async fn delete_share_link(&self, lock_id: &str) -> Result<()> {
        sqlx::query("delete from share_links where lock_id = $1")
            .bind(lock_id)
            .execute(&self.pool)
            .await
            .context("delete_share_link failed")?;
        Ok(())
    }
}
