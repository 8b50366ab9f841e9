//! Property repository implementation.
//!
//! Backing schema (see `migrations/`): `property` carries a unique
//! constraint on `(tenant_id, address_hash)` — the dedup guarantee the
//! identity resolver depends on — and `document_relationship` carries one
//! on `(document_id, property_id)`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use terrier_core::{
    AddressSource, DocumentRelationship, Error, NewProperty, NewRelationship, Property,
    PropertyRepository, Result,
};

/// PostgreSQL implementation of PropertyRepository.
#[derive(Clone)]
pub struct PgPropertyRepository {
    pool: Pool<Postgres>,
}

impl PgPropertyRepository {
    /// Create a new PgPropertyRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn map_property(row: &sqlx::postgres::PgRow) -> Property {
        Property {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            address_hash: row.get("address_hash"),
            normalized_address: row.get("normalized_address"),
            formatted_address: row.get("formatted_address"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            completeness_score: row.get("completeness_score"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn map_relationship(row: &sqlx::postgres::PgRow) -> DocumentRelationship {
        DocumentRelationship {
            id: row.get("id"),
            document_id: row.get("document_id"),
            property_id: row.get("property_id"),
            relationship_type: row.get("relationship_type"),
            address_source: AddressSource::from_str_loose(
                row.get::<String, _>("address_source").as_str(),
            ),
            confidence_score: row.get("confidence_score"),
            created_at: row.get("created_at"),
        }
    }

}

#[async_trait]
impl PropertyRepository for PgPropertyRepository {
    async fn find_by_hash(&self, tenant_id: Uuid, address_hash: &str) -> Result<Option<Property>> {
        let row = sqlx::query(
            "SELECT id, tenant_id, address_hash, normalized_address, formatted_address,
                    latitude, longitude, completeness_score, created_at, updated_at
             FROM property
             WHERE tenant_id = $1 AND address_hash = $2",
        )
        .bind(tenant_id)
        .bind(address_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::map_property))
    }

    async fn insert(&self, property: NewProperty) -> Result<Property> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO property
                 (id, tenant_id, address_hash, normalized_address, formatted_address,
                  latitude, longitude, completeness_score, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0.0, $8, $8)
             RETURNING id, tenant_id, address_hash, normalized_address, formatted_address,
                       latitude, longitude, completeness_score, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(property.tenant_id)
        .bind(&property.address_hash)
        .bind(&property.normalized_address)
        .bind(&property.formatted_address)
        .bind(property.latitude)
        .bind(property.longitude)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            tenant_id = %property.tenant_id,
            address_hash = %property.address_hash,
            "inserted property"
        );
        Ok(Self::map_property(&row))
    }

    async fn fetch(&self, id: Uuid) -> Result<Property> {
        let row = sqlx::query(
            "SELECT id, tenant_id, address_hash, normalized_address, formatted_address,
                    latitude, longitude, completeness_score, created_at, updated_at
             FROM property WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::PropertyNotFound(id))?;

        Ok(Self::map_property(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM property WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::PropertyNotFound(id));
        }
        Ok(())
    }

    async fn update_geocode(
        &self,
        id: Uuid,
        formatted_address: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE property
             SET formatted_address = $1, latitude = $2, longitude = $3, updated_at = $4
             WHERE id = $5",
        )
        .bind(formatted_address)
        .bind(latitude)
        .bind(longitude)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn update_completeness(&self, id: Uuid, score: f64) -> Result<()> {
        sqlx::query(
            "UPDATE property SET completeness_score = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(score.clamp(0.0, 1.0))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn link_document(&self, relationship: NewRelationship) -> Result<()> {
        sqlx::query(
            "INSERT INTO document_relationship
                 (id, document_id, property_id, relationship_type, address_source,
                  confidence_score, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (document_id, property_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(relationship.document_id)
        .bind(relationship.property_id)
        .bind(&relationship.relationship_type)
        .bind(relationship.address_source.as_str())
        .bind(relationship.confidence_score)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn relationships_for(&self, property_id: Uuid) -> Result<Vec<DocumentRelationship>> {
        let rows = sqlx::query(
            "SELECT id, document_id, property_id, relationship_type, address_source,
                    confidence_score, created_at
             FROM document_relationship
             WHERE property_id = $1
             ORDER BY created_at",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::map_relationship).collect())
    }

    async fn reassign_relationships(&self, from: Uuid, to: Uuid) -> Result<u64> {
        let moved = sqlx::query(
            "UPDATE document_relationship SET property_id = $1
             WHERE property_id = $2
               AND document_id NOT IN
                   (SELECT document_id FROM document_relationship WHERE property_id = $1)",
        )
        .bind(to)
        .bind(from)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?
        .rows_affected();
        Ok(moved)
    }

    /// Reassigns relationships and deletes the secondary row in one
    /// transaction, so a failure cannot strand relationships on a deleted
    /// property.
    async fn merge(&self, primary: Uuid, secondary: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let moved = sqlx::query(
            "UPDATE document_relationship SET property_id = $1
             WHERE property_id = $2
               AND document_id NOT IN
                   (SELECT document_id FROM document_relationship WHERE property_id = $1)",
        )
        .bind(primary)
        .bind(secondary)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?
        .rows_affected();

        // Documents already linked to the primary would violate the
        // (document_id, property_id) constraint; drop their stale links
        sqlx::query("DELETE FROM document_relationship WHERE property_id = $1")
            .bind(secondary)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM property_details WHERE property_id = $1")
            .bind(secondary)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let deleted = sqlx::query("DELETE FROM property WHERE id = $1")
            .bind(secondary)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::PropertyNotFound(secondary));
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            property_id = %primary,
            merged_from = %secondary,
            moved_relationships = moved,
            "merged properties"
        );
        Ok(moved)
    }
}
