//! Core traits for terrier abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. The Postgres
//! implementations live in terrier-db; terrier-geo ships an HTTP and a mock
//! geocoder.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PROPERTY REPOSITORY
// =============================================================================

/// Repository for canonical property rows.
///
/// Implementations must enforce uniqueness of `(tenant_id, address_hash)`
/// at the storage layer: concurrent inserts for the same address race, and
/// the loser must fail with a constraint violation, not create a duplicate.
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Exact-hash lookup scoped to a tenant.
    async fn find_by_hash(&self, tenant_id: Uuid, address_hash: &str) -> Result<Option<Property>>;

    /// Insert a new property. Fails with a database error carrying the
    /// unique-violation code when the `(tenant, hash)` pair already exists.
    async fn insert(&self, property: NewProperty) -> Result<Property>;

    /// Fetch a property by id.
    async fn fetch(&self, id: Uuid) -> Result<Property>;

    /// Delete a property row. Used only by the administrative merge after
    /// its relationships have been reassigned.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Update geocoding fields on an existing property.
    async fn update_geocode(
        &self,
        id: Uuid,
        formatted_address: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<()>;

    /// Update the completeness score (recomputed by the field merger).
    async fn update_completeness(&self, id: Uuid, score: f64) -> Result<()>;

    /// Link a document to a property. Idempotent on the
    /// `(document_id, property_id)` pair.
    async fn link_document(&self, relationship: NewRelationship) -> Result<()>;

    /// List relationships pointing at a property.
    async fn relationships_for(&self, property_id: Uuid) -> Result<Vec<DocumentRelationship>>;

    /// Repoint all relationships from one property to another. Returns the
    /// number of relationships moved.
    async fn reassign_relationships(&self, from: Uuid, to: Uuid) -> Result<u64>;

    /// Merge `secondary` into `primary`: repoint its relationships, then
    /// delete the secondary row. Returns the number of relationships
    /// moved. The default runs the two steps sequentially; backends that
    /// can should override this to make the merge atomic.
    async fn merge(&self, primary: Uuid, secondary: Uuid) -> Result<u64> {
        let moved = self.reassign_relationships(secondary, primary).await?;
        self.delete(secondary).await?;
        Ok(moved)
    }
}

// =============================================================================
// PROPERTY DETAILS REPOSITORY
// =============================================================================

/// Repository for the enriched, merged field-set of a property.
#[async_trait]
pub trait PropertyDetailsRepository: Send + Sync {
    /// Fetch the details record for a property, if one exists.
    async fn fetch(&self, property_id: Uuid) -> Result<Option<PropertyDetails>>;

    /// Insert or replace the details record for a property.
    async fn upsert(&self, details: &PropertyDetails) -> Result<()>;

    /// Delete the details record for a property.
    async fn delete(&self, property_id: Uuid) -> Result<()>;
}

// =============================================================================
// GEOCODING GATEWAY
// =============================================================================

/// External geocoding capability.
///
/// A black box resolving one address string to coordinates plus confidence.
/// Transport failures surface as `GeocodeStatus::Error` results, not `Err`;
/// `Err` is reserved for misconfiguration.
#[async_trait]
pub trait GeocodingGateway: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult>;
}
