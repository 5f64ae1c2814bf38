//! Bookmark storage: which accounts saved which phrases.

use sqlx::sqlite::SqlitePool;

use super::phrase::{Phrase, PhraseStatus};

#[derive(Clone)]
pub struct BookmarkStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct BookmarkedPhraseRow {
    id: i64,
    author_id: i64,
    source_text: String,
    target_text: String,
    tag: String,
    status: String,
    reject_reason: Option<String>,
    created_at: String,
}

impl From<BookmarkedPhraseRow> for Phrase {
    fn from(row: BookmarkedPhraseRow) -> Self {
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

impl BookmarkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a bookmark. Returns false if it already exists.
    pub async fn add(&self, account_id: i64, phrase_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO bookmarks (account_id, phrase_id) VALUES (?, ?)",
        )
        .bind(account_id)
        .bind(phrase_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a bookmark. Returns false if it did not exist.
    pub async fn remove(&self, account_id: i64, phrase_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE account_id = ? AND phrase_id = ?")
            .bind(account_id)
            .bind(phrase_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List the phrases an account has bookmarked, newest bookmark first.
    pub async fn list_for_account(&self, account_id: i64) -> Result<Vec<Phrase>, sqlx::Error> {
        let rows: Vec<BookmarkedPhraseRow> = sqlx::query_as(
            "SELECT p.id, p.author_id, p.source_text, p.target_text, p.tag, p.status, p.reject_reason, p.created_at
             FROM phrases p
             JOIN bookmarks b ON b.phrase_id = p.id
             WHERE b.account_id = ?
             ORDER BY b.rowid DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Phrase::from).collect())
    }
}
