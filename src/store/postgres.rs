use super::{Account, AccountChanges, AccountId, AccountLookup, AccountStore, NewAccount, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, instrument, Instrument};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const ACCOUNT_COLUMNS: &str = "id, public_id, name, email, password, created_at, updated_at";

/// `users` table access through a shared sqlx pool.
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the schema statements fail.
    pub async fn ensure_schema(&self) -> Result<()> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE",
            db.statement = "schema.sql"
        );
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to apply users schema")?;

        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        public_id: row.get("public_id"),
        name: row.get("name"),
        email: row.get("email"),
        password: row.get("password"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Name of the violated unique constraint, if `err` is a unique violation (23505).
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err)
            if db_err.code().is_some_and(|code| code.as_ref() == "23505") =>
        {
            Some(db_err.constraint().unwrap_or("unique").to_string())
        }
        _ => None,
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip_all)]
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            r"
            INSERT INTO users
                (public_id, name, email, password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );

        match sqlx::query(&query)
            .bind(&account.public_id)
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password)
            .bind(account.created_at)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
        {
            Ok(row) => Ok(account_from_row(&row)),
            Err(err) => match unique_violation(&err) {
                Some(constraint) => Err(StoreError::Duplicate(constraint)),
                None => Err(StoreError::Backend(
                    anyhow::Error::new(err).context("failed to insert user"),
                )),
            },
        }
    }

    #[instrument(skip_all)]
    async fn find_by(&self, lookup: AccountLookup) -> Result<Option<Account>> {
        let (column, query) = match lookup {
            AccountLookup::Id(_) => ("id", format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1")),
            AccountLookup::Email(_) => (
                "email",
                format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"),
            ),
        };
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );

        let statement = sqlx::query(&query);
        let statement = match lookup {
            AccountLookup::Id(id) => statement.bind(id),
            AccountLookup::Email(email) => statement.bind(email),
        };

        let row = statement
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to lookup user by {column}"))?;

        Ok(row.as_ref().map(account_from_row))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: AccountId, changes: AccountChanges) -> Result<Option<Account>> {
        let query = format!(
            r"
            UPDATE users
            SET name = COALESCE($2, name),
                password = COALESCE($3, password),
                updated_at = COALESCE($4, updated_at)
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query.as_str()
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(changes.name)
            .bind(changes.password)
            .bind(changes.updated_at)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update user")?;

        Ok(row.as_ref().map(account_from_row))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: AccountId) -> Result<Option<String>> {
        let query = "DELETE FROM users WHERE id = $1 RETURNING email";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete user")?;

        Ok(row.map(|row| row.get("email")))
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}
