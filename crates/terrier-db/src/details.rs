//! Property details repository implementation.
//!
//! `fields` and `provenance` are stored as JSONB columns; serialization
//! errors here indicate a bug in the merger, not bad user input.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use terrier_core::{Error, PropertyDetails, PropertyDetailsRepository, Result};

/// PostgreSQL implementation of PropertyDetailsRepository.
#[derive(Clone)]
pub struct PgPropertyDetailsRepository {
    pool: Pool<Postgres>,
}

impl PgPropertyDetailsRepository {
    /// Create a new PgPropertyDetailsRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyDetailsRepository for PgPropertyDetailsRepository {
    async fn fetch(&self, property_id: Uuid) -> Result<Option<PropertyDetails>> {
        let row = sqlx::query(
            "SELECT property_id, fields, provenance, completeness_score, updated_at
             FROM property_details
             WHERE property_id = $1",
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let fields: serde_json::Value = row.get("fields");
        let provenance: serde_json::Value = row.get("provenance");
        Ok(Some(PropertyDetails {
            property_id: row.get("property_id"),
            fields: serde_json::from_value(fields)?,
            provenance: serde_json::from_value(provenance)?,
            completeness_score: row.get("completeness_score"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn upsert(&self, details: &PropertyDetails) -> Result<()> {
        sqlx::query(
            "INSERT INTO property_details
                 (property_id, fields, provenance, completeness_score, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (property_id) DO UPDATE SET
                 fields = EXCLUDED.fields,
                 provenance = EXCLUDED.provenance,
                 completeness_score = EXCLUDED.completeness_score,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(details.property_id)
        .bind(serde_json::to_value(&details.fields)?)
        .bind(serde_json::to_value(&details.provenance)?)
        .bind(details.completeness_score)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, property_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM property_details WHERE property_id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
