//! Property identity resolution.
//!
//! Find-or-create over the `(tenant_id, address_hash)` unique key. The
//! read-then-insert window is closed by the storage constraint: when two
//! workers race on the same address, the losing insert fails with a
//! unique violation and is retried as a lookup, so both callers observe
//! the same property id.

use tracing::{debug, info, warn};
use uuid::Uuid;

use terrier_core::{
    Error, MatchOutcome, NewProperty, Property, PropertyRepository, ResolvedAddress, Result,
};

/// Find the property for a resolved address within a tenant, creating it
/// when absent.
///
/// An empty `address_hash` (the unhashable-address sentinel) is rejected:
/// a blank key would silently collapse every unparseable address in the
/// tenant onto one row.
pub async fn find_or_create(
    repo: &dyn PropertyRepository,
    tenant_id: Uuid,
    address: &ResolvedAddress,
) -> Result<(Property, MatchOutcome)> {
    if address.address_hash.is_empty() {
        return Err(Error::InvalidInput(
            "cannot resolve a property from an empty address".to_string(),
        ));
    }

    if let Some(existing) = repo.find_by_hash(tenant_id, &address.address_hash).await? {
        debug!(
            tenant_id = %tenant_id,
            property_id = %existing.id,
            address_hash = %address.address_hash,
            "matched existing property"
        );
        return Ok((existing, MatchOutcome::ExactMatch));
    }

    let new_property = NewProperty {
        tenant_id,
        address_hash: address.address_hash.clone(),
        normalized_address: address.normalized.clone(),
        formatted_address: address.geocode.formatted_address.clone(),
        latitude: address.geocode.latitude,
        longitude: address.geocode.longitude,
    };

    match repo.insert(new_property).await {
        Ok(created) => {
            info!(
                tenant_id = %tenant_id,
                property_id = %created.id,
                address_hash = %address.address_hash,
                "created property"
            );
            Ok((created, MatchOutcome::NewProperty))
        }
        Err(Error::Database(e)) if is_unique_violation(&e) => {
            // Lost an insert race; the winner's row is the canonical one.
            debug!(
                tenant_id = %tenant_id,
                address_hash = %address.address_hash,
                "concurrent insert detected, retrying as lookup"
            );
            let existing = repo
                .find_by_hash(tenant_id, &address.address_hash)
                .await?
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "unique violation for hash {} but no row found",
                        address.address_hash
                    ))
                })?;
            Ok((existing, MatchOutcome::ExactMatch))
        }
        Err(e) => Err(e),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Merge two property rows: repoint `secondary`'s document relationships
/// at `primary`, then delete `secondary`. Returns the number of
/// relationships moved.
///
/// Validation happens here; the mutation is the repository's `merge`
/// operation, which the Postgres backend runs as a single transaction.
pub async fn merge_properties(
    repo: &dyn PropertyRepository,
    primary: Uuid,
    secondary: Uuid,
) -> Result<u64> {
    if primary == secondary {
        return Err(Error::InvalidInput(
            "cannot merge a property into itself".to_string(),
        ));
    }

    // Both rows must exist before any mutation.
    repo.fetch(primary).await?;
    repo.fetch(secondary).await?;

    let moved = repo.merge(primary, secondary).await?;

    warn!(
        property_id = %primary,
        merged_from = %secondary,
        moved_relationships = moved,
        "merged duplicate property"
    );
    Ok(moved)
}
