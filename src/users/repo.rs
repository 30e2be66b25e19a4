use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::users::repo_types::{Address, NewUser, User, UserRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

/// Write failure. `Conflict` is the store rejecting a duplicate that slipped
/// past the service-level uniqueness check.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint on {0:?} violated")]
    Conflict(UniqueField),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    /// Overwrites every column of an existing user, address included.
    async fn update(&self, user: &User) -> Result<(), StoreError>;
    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.email, u.password_hash, u.active,
           u.first_name, u.last_name, u.phone, u.image, u.bio,
           a.line1 AS address_line1, a.line2 AS address_line2,
           a.city AS address_city, a.state AS address_state,
           a.country AS address_country, a.postal_code AS address_postal_code
    FROM users u
    LEFT JOIN addresses a ON a.user_id = u.id
"#;

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, filter: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE {filter}");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("select user where {filter}"))?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE u.id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("select user by id")?;
        Ok(row.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.find_one("u.username = $1", username).await
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one("u.email = $1", email).await
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, phone, image, bio)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.image)
        .bind(&user.bio)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if let Some(address) = &user.address {
            upsert_address(&mut tx, id, address).await?;
        }
        tx.commit().await.context("commit tx")?;
        Ok(user.into_user(id))
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query(
            r#"
            UPDATE users
               SET username = $2, email = $3, password_hash = $4, active = $5,
                   first_name = $6, last_name = $7, phone = $8, image = $9, bio = $10,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.image)
        .bind(&user.bio)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        match &user.address {
            Some(address) => upsert_address(&mut tx, user.id, address).await?,
            None => {
                sqlx::query("DELETE FROM addresses WHERE user_id = $1")
                    .bind(user.id)
                    .execute(&mut *tx)
                    .await
                    .context("delete address")?;
            }
        }
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        // addresses and temporary_passcodes cascade
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(done.rows_affected() > 0)
    }
}

async fn upsert_address(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    address: &Address,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO addresses (user_id, line1, line2, city, state, country, postal_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE
           SET line1 = EXCLUDED.line1, line2 = EXCLUDED.line2, city = EXCLUDED.city,
               state = EXCLUDED.state, country = EXCLUDED.country,
               postal_code = EXCLUDED.postal_code
        "#,
    )
    .bind(user_id)
    .bind(&address.line1)
    .bind(&address.line2)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.country)
    .bind(&address.postal_code)
    .execute(&mut **tx)
    .await
    .context("upsert address")?;
    Ok(())
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_username_key") => return StoreError::Conflict(UniqueField::Username),
                Some("users_email_key") => return StoreError::Conflict(UniqueField::Email),
                _ => {}
            }
        }
    }
    StoreError::Other(anyhow::Error::new(e).context("write user"))
}
