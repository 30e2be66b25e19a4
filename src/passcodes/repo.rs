use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Recovery code issued to a user. Never deleted on use; it simply stops
/// matching once `expires_at` has passed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TemporaryPasscode {
    pub id: i64,
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub user_id: i64,
}

#[async_trait]
pub trait PasscodeStore: Send + Sync {
    async fn create(
        &self,
        user_id: i64,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<TemporaryPasscode>;

    /// A record with exactly this code that is still live at `now`.
    async fn find_valid(
        &self,
        code: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<TemporaryPasscode>>;
}

#[derive(Clone)]
pub struct PgPasscodeStore {
    db: PgPool,
}

impl PgPasscodeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PasscodeStore for PgPasscodeStore {
    async fn create(
        &self,
        user_id: i64,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<TemporaryPasscode> {
        let row = sqlx::query_as::<_, TemporaryPasscode>(
            r#"
            INSERT INTO temporary_passcodes (code, expires_at, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, code, expires_at, user_id
            "#,
        )
        .bind(code)
        .bind(expires_at)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .context("insert temporary passcode")?;
        Ok(row)
    }

    async fn find_valid(
        &self,
        code: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<TemporaryPasscode>> {
        let row = sqlx::query_as::<_, TemporaryPasscode>(
            r#"
            SELECT id, code, expires_at, user_id
              FROM temporary_passcodes
             WHERE code = $1 AND expires_at > $2
             ORDER BY expires_at ASC
             LIMIT 1
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("select temporary passcode")?;
        Ok(row)
    }
}
