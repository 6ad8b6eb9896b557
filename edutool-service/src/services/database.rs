//! PostgreSQL account storage.

use crate::models::DeletionSummary;
use crate::services::accounts::AccountStore;
use crate::services::metrics;
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "edutool-service"))]
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        info!(max_connections = max_connections, "Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn delete_owned_rows(
        tx: &mut Transaction<'_, Postgres>,
        table: &str,
        user_id: &str,
    ) -> Result<u64, AppError> {
        // Table names come from a fixed list, never from input.
        let result = sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", table))
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete from {}: {}", table, e))
            })?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AccountStore for Database {
    #[instrument(skip(self))]
    async fn delete_account(&self, user_id: &str) -> Result<DeletionSummary, AppError> {
        let start = Instant::now();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let generation_requests =
            Self::delete_owned_rows(&mut tx, "generation_requests", user_id).await?;
        let custom_tool_types =
            Self::delete_owned_rows(&mut tx, "custom_tool_types", user_id).await?;
        let custom_categories =
            Self::delete_owned_rows(&mut tx, "custom_categories", user_id).await?;

        let users = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete user: {}", e)))?
            .rows_affected();

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        metrics::record_db_operation("delete_account", start.elapsed().as_secs_f64());

        let summary = DeletionSummary {
            generation_requests,
            custom_tool_types,
            custom_categories,
            users,
        };
        info!(
            generation_requests,
            custom_tool_types,
            custom_categories,
            users,
            "Account rows deleted"
        );

        Ok(summary)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let start = Instant::now();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        metrics::record_db_operation("health_check", start.elapsed().as_secs_f64());
        Ok(())
    }
}
