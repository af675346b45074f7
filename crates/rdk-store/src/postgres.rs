//! PostgreSQL store backend.
//!
//! One row per state key in `application_state`. The conditional write is a
//! single UPDATE guarded by hitting the stored `version` (or an INSERT … ON
//! CONFLICT DO NOTHING for the create path); `rows_affected == 0` is the
//! conflict signal in both directions. No transaction is needed; each save
//! is one statement.

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use rdk_schemas::{ApplicationState, StateSeed};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{StateStore, StoreError, VersionToken};

pub const ENV_DB_URL: &str = "RDK_DATABASE_URL";

/// Connect to Postgres using RDK_DATABASE_URL.
pub async fn connect_from_env() -> anyhow::Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> anyhow::Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='application_state'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_state_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_state_table: bool,
}

// ---------------------------------------------------------------------------
// PgStateStore
// ---------------------------------------------------------------------------

pub struct PgStateStore {
    pool: PgPool,
    state_key: String,
    seed: StateSeed,
}

impl PgStateStore {
    pub fn new(pool: PgPool, state_key: impl Into<String>, seed: StateSeed) -> Self {
        Self {
            pool,
            state_key: state_key.into(),
            seed,
        }
    }

    pub fn state_key(&self) -> &str {
        &self.state_key
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn load(&self) -> Result<(ApplicationState, Option<VersionToken>), StoreError> {
        let row = sqlx::query("select document, version from application_state where state_key = $1")
            .bind(&self.state_key)
            .fetch_optional(&self.pool)
            .await
            .context("state load query failed")?;

        let Some(row) = row else {
            return Ok((ApplicationState::initial(&self.seed, Utc::now()), None));
        };

        let document: serde_json::Value =
            row.try_get("document").context("document column decode")?;
        let version: String = row.try_get("version").context("version column decode")?;

        let state: ApplicationState =
            serde_json::from_value(document).context("state document decode failed")?;
        Ok((state, Some(VersionToken::new(version))))
    }

    async fn save(
        &self,
        state: &ApplicationState,
        token: Option<&VersionToken>,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_value(state).context("state document encode failed")?;
        let next_version = Uuid::new_v4().to_string();

        let rows_affected = match token {
            Some(tok) => {
                // Replace-if-version-matches. Zero rows = stale token, or the
                // document vanished under us; both are conflicts.
                sqlx::query(
                    r#"
                    update application_state
                    set document = $2, version = $3, updated_at_utc = $4
                    where state_key = $1 and version = $5
                    "#,
                )
                .bind(&self.state_key)
                .bind(&document)
                .bind(&next_version)
                .bind(Utc::now())
                .bind(tok.as_str())
                .execute(&self.pool)
                .await
                .context("state conditional update failed")?
                .rows_affected()
            }
            None => {
                // Create-only. Zero rows = somebody else created it first.
                sqlx::query(
                    r#"
                    insert into application_state (state_key, document, version, updated_at_utc)
                    values ($1, $2, $3, $4)
                    on conflict (state_key) do nothing
                    "#,
                )
                .bind(&self.state_key)
                .bind(&document)
                .bind(&next_version)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .context("state create failed")?
                .rows_affected()
            }
        };

        if rows_affected == 0 {
            return Err(StoreError::Conflict {
                state_key: self.state_key.clone(),
            });
        }
        Ok(())
    }
}
