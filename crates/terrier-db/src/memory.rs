//! In-memory property repository for tests.
//!
//! Enforces the same `(tenant_id, address_hash)` uniqueness as the
//! Postgres schema and reports duplicates as a unique-violation database
//! error, so the resolver's race handling is exercised without a live
//! database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

use terrier_core::{
    DocumentRelationship, Error, NewProperty, NewRelationship, Property, PropertyRepository,
    ResolvedAddress, Result,
};

#[derive(Debug)]
struct FakeUniqueViolation(String);

impl fmt::Display for FakeUniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for FakeUniqueViolation {}

impl sqlx::error::DatabaseError for FakeUniqueViolation {
    fn message(&self) -> &str {
        &self.0
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }
}

fn unique_violation(tenant_id: Uuid, hash: &str) -> Error {
    Error::Database(sqlx::Error::Database(Box::new(FakeUniqueViolation(
        format!("duplicate key ({tenant_id}, {hash})"),
    ))))
}

#[derive(Default)]
struct State {
    properties: HashMap<Uuid, Property>,
    relationships: Vec<DocumentRelationship>,
}

/// In-memory implementation of PropertyRepository.
#[derive(Default)]
pub struct MemoryPropertyRepository {
    state: Mutex<State>,
    miss_next_lookup: std::sync::atomic::AtomicBool,
}

impl MemoryPropertyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `find_by_hash` report no row even if one exists,
    /// simulating a lookup that raced a concurrent insert.
    pub fn miss_next_lookup(&self) {
        self.miss_next_lookup
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Insert a row for the given address out of band, simulating a
    /// concurrent worker winning the insert race.
    pub async fn inject_race(&self, tenant_id: Uuid, address: &ResolvedAddress) -> Property {
        let now = Utc::now();
        let property = Property {
            id: Uuid::new_v4(),
            tenant_id,
            address_hash: address.address_hash.clone(),
            normalized_address: address.normalized.clone(),
            formatted_address: address.geocode.formatted_address.clone(),
            latitude: address.geocode.latitude,
            longitude: address.geocode.longitude,
            completeness_score: 0.0,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .expect("memory repo lock poisoned")
            .properties
            .insert(property.id, property.clone());
        property
    }
}

#[async_trait]
impl PropertyRepository for MemoryPropertyRepository {
    async fn find_by_hash(&self, tenant_id: Uuid, address_hash: &str) -> Result<Option<Property>> {
        if self
            .miss_next_lookup
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Ok(None);
        }
        let state = self.state.lock().expect("memory repo lock poisoned");
        Ok(state
            .properties
            .values()
            .find(|p| p.tenant_id == tenant_id && p.address_hash == address_hash)
            .cloned())
    }

    async fn insert(&self, property: NewProperty) -> Result<Property> {
        let mut state = self.state.lock().expect("memory repo lock poisoned");
        let duplicate = state
            .properties
            .values()
            .any(|p| p.tenant_id == property.tenant_id && p.address_hash == property.address_hash);
        if duplicate {
            return Err(unique_violation(property.tenant_id, &property.address_hash));
        }

        let now = Utc::now();
        let created = Property {
            id: Uuid::new_v4(),
            tenant_id: property.tenant_id,
            address_hash: property.address_hash,
            normalized_address: property.normalized_address,
            formatted_address: property.formatted_address,
            latitude: property.latitude,
            longitude: property.longitude,
            completeness_score: 0.0,
            created_at: now,
            updated_at: now,
        };
        state.properties.insert(created.id, created.clone());
        Ok(created)
    }

    async fn fetch(&self, id: Uuid) -> Result<Property> {
        let state = self.state.lock().expect("memory repo lock poisoned");
        state
            .properties
            .get(&id)
            .cloned()
            .ok_or(Error::PropertyNotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().expect("memory repo lock poisoned");
        state
            .properties
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::PropertyNotFound(id))
    }

    async fn update_geocode(
        &self,
        id: Uuid,
        formatted_address: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<()> {
        let mut state = self.state.lock().expect("memory repo lock poisoned");
        let property = state
            .properties
            .get_mut(&id)
            .ok_or(Error::PropertyNotFound(id))?;
        property.formatted_address = formatted_address.map(str::to_string);
        property.latitude = latitude;
        property.longitude = longitude;
        property.updated_at = Utc::now();
        Ok(())
    }

    async fn update_completeness(&self, id: Uuid, score: f64) -> Result<()> {
        let mut state = self.state.lock().expect("memory repo lock poisoned");
        let property = state
            .properties
            .get_mut(&id)
            .ok_or(Error::PropertyNotFound(id))?;
        property.completeness_score = score.clamp(0.0, 1.0);
        property.updated_at = Utc::now();
        Ok(())
    }

    async fn link_document(&self, relationship: NewRelationship) -> Result<()> {
        let mut state = self.state.lock().expect("memory repo lock poisoned");
        let exists = state.relationships.iter().any(|r| {
            r.document_id == relationship.document_id && r.property_id == relationship.property_id
        });
        if exists {
            return Ok(());
        }
        state.relationships.push(DocumentRelationship {
            id: Uuid::new_v4(),
            document_id: relationship.document_id,
            property_id: relationship.property_id,
            relationship_type: relationship.relationship_type,
            address_source: relationship.address_source,
            confidence_score: relationship.confidence_score,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn relationships_for(&self, property_id: Uuid) -> Result<Vec<DocumentRelationship>> {
        let state = self.state.lock().expect("memory repo lock poisoned");
        Ok(state
            .relationships
            .iter()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn reassign_relationships(&self, from: Uuid, to: Uuid) -> Result<u64> {
        let mut state = self.state.lock().expect("memory repo lock poisoned");
        let already_linked: Vec<Uuid> = state
            .relationships
            .iter()
            .filter(|r| r.property_id == to)
            .map(|r| r.document_id)
            .collect();

        let mut moved = 0;
        state.relationships.retain_mut(|r| {
            if r.property_id != from {
                return true;
            }
            if already_linked.contains(&r.document_id) {
                // Would collide with an existing (document, property) link.
                return false;
            }
            r.property_id = to;
            moved += 1;
            true
        });
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrier_core::AddressSource;

    fn new_property(tenant_id: Uuid, hash: &str) -> NewProperty {
        NewProperty {
            tenant_id,
            address_hash: hash.to_string(),
            normalized_address: "1 test lane".to_string(),
            formatted_address: None,
            latitude: None,
            longitude: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_unique_violation() {
        let repo = MemoryPropertyRepository::new();
        let tenant = Uuid::new_v4();
        repo.insert(new_property(tenant, "h1")).await.unwrap();

        let err = repo.insert(new_property(tenant, "h1")).await.unwrap_err();
        match err {
            Error::Database(e) => {
                assert!(e.as_database_error().unwrap().is_unique_violation());
            }
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_link_document_idempotent() {
        let repo = MemoryPropertyRepository::new();
        let tenant = Uuid::new_v4();
        let property = repo.insert(new_property(tenant, "h1")).await.unwrap();

        let rel = NewRelationship {
            document_id: Uuid::new_v4(),
            property_id: property.id,
            relationship_type: "mentioned_in".to_string(),
            address_source: AddressSource::Filename,
            confidence_score: 1.0,
        };
        repo.link_document(rel.clone()).await.unwrap();
        repo.link_document(rel).await.unwrap();

        assert_eq!(repo.relationships_for(property.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_completeness_clamped() {
        let repo = MemoryPropertyRepository::new();
        let property = repo
            .insert(new_property(Uuid::new_v4(), "h1"))
            .await
            .unwrap();

        repo.update_completeness(property.id, 1.7).await.unwrap();
        assert_eq!(repo.fetch(property.id).await.unwrap().completeness_score, 1.0);

        let missing = repo.update_completeness(Uuid::new_v4(), 0.5).await;
        assert!(matches!(missing, Err(Error::PropertyNotFound(_))));
    }

    #[tokio::test]
    async fn test_reassign_skips_colliding_links() {
        let repo = MemoryPropertyRepository::new();
        let tenant = Uuid::new_v4();
        let a = repo.insert(new_property(tenant, "h1")).await.unwrap();
        let b = repo.insert(new_property(tenant, "h2")).await.unwrap();

        let shared_doc = Uuid::new_v4();
        for property_id in [a.id, b.id] {
            repo.link_document(NewRelationship {
                document_id: shared_doc,
                property_id,
                relationship_type: "mentioned_in".to_string(),
                address_source: AddressSource::Extraction,
                confidence_score: 0.9,
            })
            .await
            .unwrap();
        }

        let moved = repo.reassign_relationships(b.id, a.id).await.unwrap();
        assert_eq!(moved, 0);
        assert_eq!(repo.relationships_for(a.id).await.unwrap().len(), 1);
        assert!(repo.relationships_for(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_moves_links_and_removes_secondary() {
        let repo = MemoryPropertyRepository::new();
        let tenant = Uuid::new_v4();
        let a = repo.insert(new_property(tenant, "h1")).await.unwrap();
        let b = repo.insert(new_property(tenant, "h2")).await.unwrap();

        let shared_doc = Uuid::new_v4();
        let only_b_doc = Uuid::new_v4();
        for (document_id, property_id) in
            [(shared_doc, a.id), (shared_doc, b.id), (only_b_doc, b.id)]
        {
            repo.link_document(NewRelationship {
                document_id,
                property_id,
                relationship_type: "mentioned_in".to_string(),
                address_source: AddressSource::Extraction,
                confidence_score: 0.9,
            })
            .await
            .unwrap();
        }

        let moved = repo.merge(a.id, b.id).await.unwrap();
        assert_eq!(moved, 1);
        assert_eq!(repo.relationships_for(a.id).await.unwrap().len(), 2);
        assert!(repo.relationships_for(b.id).await.unwrap().is_empty());
        assert!(matches!(
            repo.fetch(b.id).await,
            Err(Error::PropertyNotFound(_))
        ));
    }
}
