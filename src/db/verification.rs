use sqlx::sqlite::SqlitePool;

/// Store for email verification codes.
///
/// Codes are stored keyed by email address. Each address holds at most one
/// live code: re-requesting replaces the previous one. A code is consumed
/// (deleted) on first successful verification, so it cannot be replayed.
#[derive(Clone)]
pub struct VerificationStore {
    pool: SqlitePool,
}

impl VerificationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a verification code for an email address, valid for 5 minutes.
    ///
    /// Replaces any existing code for the same address.
    pub async fn store(&self, email: &str, code: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR REPLACE INTO email_verifications (email, code, expires_at)
             VALUES (?, ?, datetime('now', '+5 minutes'))",
        )
        .bind(email)
        .bind(code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Verify and consume a code in one step.
    ///
    /// Returns true only if a matching, unexpired code existed; the row is
    /// deleted as part of the same statement, so a second call with the same
    /// code fails.
    pub async fn consume(&self, email: &str, code: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM email_verifications
             WHERE email = ? AND code = ? AND expires_at > datetime('now')",
        )
        .bind(email)
        .bind(code)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove expired codes. Called by the background cleanup task.
    pub async fn cleanup_expired(&self) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM email_verifications WHERE expires_at <= datetime('now')")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
