use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

/// Account role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Sign-in provider. Closed set: an unknown column value is a decode error,
/// not a fallback, so a typo cannot silently alias two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    Local,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "LOCAL",
            Provider::Google => "GOOGLE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LOCAL" => Some(Provider::Local),
            "GOOGLE" => Some(Provider::Google),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub local_id: Option<String>,
    pub password_hash: Option<String>,
    pub nickname: String,
    pub email: Option<String>,
    pub provider: Provider,
    pub role: Role,
    pub refresh_token: Option<String>,
    pub created_at: String,
}

impl Account {
    /// Stable display identity: email when present, local id otherwise.
    pub fn username(&self) -> &str {
        self.email
            .as_deref()
            .or(self.local_id.as_deref())
            .unwrap_or(&self.nickname)
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    local_id: Option<String>,
    password_hash: Option<String>,
    nickname: String,
    email: Option<String>,
    provider: String,
    role: String,
    refresh_token: Option<String>,
    created_at: String,
}

impl TryFrom<AccountRow> for Account {
    type Error = sqlx::Error;

    fn try_from(row: AccountRow) -> Result<Self, sqlx::Error> {
        let provider = Provider::from_str(&row.provider).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown provider: {}", row.provider).into())
        })?;
        Ok(Self {
            id: row.id,
            local_id: row.local_id,
            password_hash: row.password_hash,
            nickname: row.nickname,
            email: row.email,
            provider,
            role: Role::from_str(&row.role),
            refresh_token: row.refresh_token,
            created_at: row.created_at,
        })
    }
}

const SELECT_ACCOUNT: &str = "SELECT id, local_id, password_hash, nickname, email, provider, role, refresh_token, created_at FROM accounts";

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a local account. Returns the account ID.
    pub async fn create_local(
        &self,
        local_id: &str,
        password_hash: &str,
        nickname: &str,
        email: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO accounts (local_id, password_hash, nickname, email, provider) VALUES (?, ?, ?, ?, 'LOCAL')",
        )
        .bind(local_id)
        .bind(password_hash)
        .bind(nickname)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Create a social account (auto-provisioned on first sign-in). Returns the account ID.
    pub async fn create_social(
        &self,
        email: &str,
        provider: Provider,
        nickname: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO accounts (email, provider, nickname) VALUES (?, ?, ?)")
            .bind(email)
            .bind(provider.as_str())
            .bind(nickname)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Find an account by ID.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("{SELECT_ACCOUNT} WHERE id = ?");
        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    /// Find an account by local login id.
    pub async fn find_by_local_id(&self, local_id: &str) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("{SELECT_ACCOUNT} WHERE local_id = ?");
        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(local_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    /// Find an account by its (email, provider) pair.
    pub async fn find_by_email_and_provider(
        &self,
        email: &str,
        provider: Provider,
    ) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("{SELECT_ACCOUNT} WHERE email = ? AND provider = ?");
        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(email)
            .bind(provider.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    /// Find the account currently holding a refresh token value.
    pub async fn find_by_refresh_token(&self, token: &str) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("{SELECT_ACCOUNT} WHERE refresh_token = ?");
        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    /// Find an account by nickname.
    pub async fn find_by_nickname(&self, nickname: &str) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("{SELECT_ACCOUNT} WHERE nickname = ?");
        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(nickname)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::try_from).transpose()
    }

    /// Store a refresh token unconditionally. Used at login, where a fresh
    /// sign-in displaces any previous session.
    pub async fn set_refresh_token(&self, id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a refresh token only if the stored value still equals `old`.
    /// The single UPDATE is the atomicity boundary: of N concurrent calls
    /// presenting the same `old`, exactly one observes a row change.
    pub async fn swap_refresh_token(&self, old: &str, new: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET refresh_token = ? WHERE refresh_token = ?")
            .bind(new)
            .bind(old)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the stored refresh token (logout, account deletion).
    pub async fn clear_refresh_token(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET refresh_token = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the nickname.
    pub async fn update_nickname(&self, id: i64, nickname: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET nickname = ? WHERE id = ?")
            .bind(nickname)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the password hash.
    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the role for an account.
    pub async fn set_role(&self, id: i64, role: Role) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an account. Bookmarks and submitted phrases cascade.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
