use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use crate::measurement::{Bucket, Measurement};
use crate::storage::Storage;

const MAX_CONNECTIONS: u32 = 4;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .context("failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Creates the measurements table if absent. The primary key doubles as
    /// the latest-sample lookup index.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS measurements (
                bucket TEXT NOT NULL,
                point TEXT NOT NULL,
                measured_at TIMESTAMPTZ NOT NULL,
                fields JSONB NOT NULL,
                PRIMARY KEY (bucket, point, measured_at)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create measurements table")?;

        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn insert(&self, measurements: &[Measurement]) -> Result<()> {
        if measurements.is_empty() {
            return Ok(());
        }

        let buckets: Vec<&str> = measurements.iter().map(|m| m.bucket.as_str()).collect();
        let points: Vec<&str> = measurements.iter().map(|m| m.point.as_str()).collect();
        let measured_ats: Vec<DateTime<Utc>> = measurements.iter().map(|m| m.measured_at).collect();
        let fields: Vec<Json<&IndexMap<String, f64>>> =
            measurements.iter().map(|m| Json(&m.fields)).collect();

        let mut tx = self.pool.begin().await.context("failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO measurements (bucket, point, measured_at, fields)
            SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[], $3::TIMESTAMPTZ[], $4::JSONB[])
            ON CONFLICT (bucket, point, measured_at) DO UPDATE SET fields = EXCLUDED.fields
            "#,
        )
        .bind(&buckets)
        .bind(&points)
        .bind(&measured_ats)
        .bind(&fields)
        .execute(&mut *tx)
        .await
        .context("failed to execute bulk insert query")?;

        tx.commit().await.context("failed to commit transaction")?;

        Ok(())
    }

    async fn latest(
        &self,
        bucket: Bucket,
        point: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Measurement>> {
        let row: Option<(DateTime<Utc>, Json<IndexMap<String, f64>>)> = sqlx::query_as(
            r#"
            SELECT measured_at, fields FROM measurements
            WHERE bucket = $1 AND point = $2 AND measured_at > $3
            ORDER BY measured_at DESC
            LIMIT 1
            "#,
        )
        .bind(bucket.as_str())
        .bind(point)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to query latest {point} sample"))?;

        Ok(row.map(|(measured_at, Json(fields))| Measurement {
            bucket,
            point: point.to_owned(),
            measured_at,
            fields,
        }))
    }
}
