//! Phrase storage for community-submitted translations.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct PhraseStore {
    pool: SqlitePool,
}

/// Moderation state of a submitted phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhraseStatus {
    Pending,
    Approved,
    Rejected,
}

impl PhraseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhraseStatus::Pending => "pending",
            PhraseStatus::Approved => "approved",
            PhraseStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "approved" => PhraseStatus::Approved,
            "rejected" => PhraseStatus::Rejected,
            _ => PhraseStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Phrase {
    pub id: i64,
    pub author_id: i64,
    pub source_text: String,
    pub target_text: String,
    pub tag: String,
    pub status: PhraseStatus,
    pub reject_reason: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct PhraseRow {
    id: i64,
    author_id: i64,
    source_text: String,
    target_text: String,
    tag: String,
    status: String,
    reject_reason: Option<String>,
    created_at: String,
}

impl From<PhraseRow> for Phrase {
    fn from(row: PhraseRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            source_text: row.source_text,
            target_text: row.target_text,
            tag: row.tag,
            status: PhraseStatus::from_str(&row.status),
            reject_reason: row.reject_reason,
            created_at: row.created_at,
        }
    }
}

impl PhraseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Submit a new phrase. Starts in the pending state. Returns the phrase ID.
    pub async fn create(
        &self,
        author_id: i64,
        source_text: &str,
        target_text: &str,
        tag: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO phrases (author_id, source_text, target_text, tag) VALUES (?, ?, ?, ?)",
        )
        .bind(author_id)
        .bind(source_text)
        .bind(target_text)
        .bind(tag)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a phrase by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Phrase>, sqlx::Error> {
        let row: Option<PhraseRow> = sqlx::query_as(
            "SELECT id, author_id, source_text, target_text, tag, status, reject_reason, created_at
             FROM phrases WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Phrase::from))
    }

    /// List approved phrases, newest first, optionally filtered by tag.
    pub async fn list_approved(&self, tag: Option<&str>) -> Result<Vec<Phrase>, sqlx::Error> {
        let rows: Vec<PhraseRow> = if let Some(tag) = tag {
            sqlx::query_as(
                "SELECT id, author_id, source_text, target_text, tag, status, reject_reason, created_at
                 FROM phrases WHERE status = 'approved' AND tag = ? ORDER BY id DESC",
            )
            .bind(tag)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT id, author_id, source_text, target_text, tag, status, reject_reason, created_at
                 FROM phrases WHERE status = 'approved' ORDER BY id DESC",
            )
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows.into_iter().map(Phrase::from).collect())
    }

    /// List an author's own submissions, any status, newest first.
    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<Phrase>, sqlx::Error> {
        let rows: Vec<PhraseRow> = sqlx::query_as(
            "SELECT id, author_id, source_text, target_text, tag, status, reject_reason, created_at
             FROM phrases WHERE author_id = ? ORDER BY id DESC",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Phrase::from).collect())
    }

    /// List the moderation queue (pending submissions), oldest first.
    pub async fn list_pending(&self) -> Result<Vec<Phrase>, sqlx::Error> {
        let rows: Vec<PhraseRow> = sqlx::query_as(
            "SELECT id, author_id, source_text, target_text, tag, status, reject_reason, created_at
             FROM phrases WHERE status = 'pending' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Phrase::from).collect())
    }

    /// Approve a phrase. Clears any previous rejection reason.
    pub async fn approve(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE phrases SET status = 'approved', reject_reason = NULL WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reject a phrase with a reason.
    pub async fn reject(&self, id: i64, reason: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE phrases SET status = 'rejected', reject_reason = ? WHERE id = ?")
                .bind(reason)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a phrase. Bookmarks pointing at it cascade.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM phrases WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
