mod account;
mod bookmark;
mod phrase;
mod verification;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use account::{Account, AccountStore, Provider, Role};
pub use bookmark::BookmarkStore;
pub use phrase::{Phrase, PhraseStatus, PhraseStore};
pub use verification::VerificationStore;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let (url, max_connections) = if path == ":memory:" {
            // Every pooled connection opens its own private in-memory
            // database, so the pool must stay at a single connection.
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite:{}?mode=rwc", path), 5)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Accounts table. local_id/password_hash are set for local
                // accounts, email is required for social accounts; the
                // partial unique index enforces one account per
                // (email, provider) pair.
                "CREATE TABLE accounts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    local_id TEXT UNIQUE COLLATE NOCASE,
                    password_hash TEXT,
                    nickname TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    email TEXT,
                    provider TEXT NOT NULL DEFAULT 'LOCAL',
                    role TEXT NOT NULL DEFAULT 'user',
                    refresh_token TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE UNIQUE INDEX idx_accounts_email_provider ON accounts(email, provider) WHERE email IS NOT NULL",
                "CREATE INDEX idx_accounts_local_id ON accounts(local_id)",
                "CREATE INDEX idx_accounts_refresh_token ON accounts(refresh_token)",
                // Phrases table
                "CREATE TABLE phrases (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    author_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                    source_text TEXT NOT NULL,
                    target_text TEXT NOT NULL,
                    tag TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending',
                    reject_reason TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_phrases_status ON phrases(status)",
                "CREATE INDEX idx_phrases_tag ON phrases(tag)",
                "CREATE INDEX idx_phrases_author_id ON phrases(author_id)",
                // Bookmarks table
                "CREATE TABLE bookmarks (
                    account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                    phrase_id INTEGER NOT NULL REFERENCES phrases(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (account_id, phrase_id)
                )",
                "CREATE INDEX idx_bookmarks_phrase_id ON bookmarks(phrase_id)",
                // Email verification codes table
                "CREATE TABLE email_verifications (
                    email TEXT PRIMARY KEY,
                    code TEXT NOT NULL,
                    expires_at TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_email_verifications_expires_at ON email_verifications(expires_at)",
            ],
        )
        .await
    }

    /// Get the account store.
    pub fn accounts(&self) -> AccountStore {
        AccountStore::new(self.pool.clone())
    }

    /// Get the phrase store.
    pub fn phrases(&self) -> PhraseStore {
        PhraseStore::new(self.pool.clone())
    }

    /// Get the bookmark store.
    pub fn bookmarks(&self) -> BookmarkStore {
        BookmarkStore::new(self.pool.clone())
    }

    /// Get the verification code store.
    pub fn verifications(&self) -> VerificationStore {
        VerificationStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
