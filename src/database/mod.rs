//! Data access. One repository trait per table family, implemented by the
//! Postgres store (`postgres`) and the in-process store (`memory`).

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AuditEntry, AuditFilter, CreateProduct, Movement, MovementFilter, NewAuditEntry,
        NewMovement, NewPurchaseOrder, NewUser, OrderChanges, OrderFilter, Product,
        ProductChanges, ProductFilter, PurchaseOrder, PurchaseOrderDetail, Supplier,
        SupplierChanges, SupplierFilter, SupplierInput, User, UserChanges, UserFilter, Warehouse,
        WarehouseChanges, WarehouseFilter, WarehouseInput,
    },
};

pub use memory::MemoryStore;
pub use postgres::{create_database_pool, run_migrations, PgStore};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<Product>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Product>>;
    /// Inserts the catalog row with zero stock; opening stock is booked as a movement.
    async fn create(&self, input: &CreateProduct) -> AppResult<Product>;
    async fn update(&self, id: Uuid, changes: &ProductChanges) -> AppResult<Option<Product>>;
    /// `Conflict` when movements or order lines still reference the product.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait MovementRepository: Send + Sync {
    async fn list(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Movement>>;
    /// Applies the movement to the product's stock and appends the ledger row,
    /// atomically with respect to other movements on the same product.
    async fn record(&self, movement: &NewMovement) -> AppResult<Movement>;
}

#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn list(&self, filter: &SupplierFilter) -> AppResult<Vec<Supplier>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Supplier>>;
    async fn create(&self, input: &SupplierInput) -> AppResult<Supplier>;
    async fn update(&self, id: Uuid, changes: &SupplierChanges) -> AppResult<Option<Supplier>>;
    /// `Conflict` while purchase orders reference the supplier; products are unlinked.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn list(&self, filter: &WarehouseFilter) -> AppResult<Vec<Warehouse>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Warehouse>>;
    async fn create(&self, input: &WarehouseInput) -> AppResult<Warehouse>;
    async fn update(&self, id: Uuid, changes: &WarehouseChanges) -> AppResult<Option<Warehouse>>;
    /// Products, users and orders assigned to the warehouse are unlinked.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self, filter: &UserFilter) -> AppResult<Vec<User>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn create(&self, user: &NewUser) -> AppResult<User>;
    async fn update(&self, id: Uuid, changes: &UserChanges) -> AppResult<Option<User>>;
    async fn record_login(&self, id: Uuid) -> AppResult<()>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    async fn count(&self) -> AppResult<i64>;
}

#[async_trait]
pub trait PurchaseOrderRepository: Send + Sync {
    async fn list(&self, filter: &OrderFilter) -> AppResult<Vec<PurchaseOrder>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<PurchaseOrderDetail>>;
    async fn create(&self, order: &NewPurchaseOrder) -> AppResult<PurchaseOrderDetail>;
    /// Only while `pendiente`; `Conflict` otherwise.
    async fn update(&self, id: Uuid, changes: &OrderChanges) -> AppResult<PurchaseOrderDetail>;
    async fn approve(&self, id: Uuid, approved_by: Uuid) -> AppResult<PurchaseOrder>;
    async fn reject(&self, id: Uuid, rejected_by: Uuid, reason: &str) -> AppResult<PurchaseOrder>;
    /// Books an `entrada` per line, raises each product's stock and marks the
    /// order `completada`, all or nothing.
    async fn complete(&self, id: Uuid, received_by: Uuid) -> AppResult<(PurchaseOrder, Vec<Movement>)>;
    /// Only while `pendiente` or `rechazada`; `Conflict` otherwise.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &NewAuditEntry) -> AppResult<AuditEntry>;
    async fn list(&self, filter: &AuditFilter) -> AppResult<Vec<AuditEntry>>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

/// Handle to every repository. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pub products: Arc<dyn ProductRepository>,
    pub movements: Arc<dyn MovementRepository>,
    pub suppliers: Arc<dyn SupplierRepository>,
    pub warehouses: Arc<dyn WarehouseRepository>,
    pub users: Arc<dyn UserRepository>,
    pub orders: Arc<dyn PurchaseOrderRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Database {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    pub fn memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ProductRepository
            + MovementRepository
            + SupplierRepository
            + WarehouseRepository
            + UserRepository
            + PurchaseOrderRepository
            + AuditRepository
            + HealthCheck
            + 'static,
    {
        Self {
            products: store.clone(),
            movements: store.clone(),
            suppliers: store.clone(),
            warehouses: store.clone(),
            users: store.clone(),
            orders: store.clone(),
            audit: store.clone(),
            health: store,
        }
    }
}
