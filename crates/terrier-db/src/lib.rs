//! # terrier-db
//!
//! PostgreSQL persistence layer for terrier.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for properties, relationships, and details
//! - Identity resolution (find-or-create over the address-hash unique key)
//! - An in-memory repository for tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use terrier_db::{resolver, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/terrier").await?;
//!
//!     let (property, outcome) =
//!         resolver::find_or_create(&db.properties, tenant_id, &resolved).await?;
//!     println!("{} ({})", property.id, outcome.as_str());
//!     Ok(())
//! }
//! ```

pub mod details;
pub mod memory;
pub mod pool;
pub mod properties;
pub mod resolver;

// Re-export core types
pub use terrier_core::*;

pub use details::PgPropertyDetailsRepository;
pub use memory::MemoryPropertyRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use properties::PgPropertyRepository;
pub use resolver::{find_or_create, merge_properties};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Property repository for identity rows.
    pub properties: PgPropertyRepository,
    /// Details repository for merged field-sets.
    pub details: PgPropertyDetailsRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            properties: PgPropertyRepository::new(pool.clone()),
            details: PgPropertyDetailsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
