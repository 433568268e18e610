pub mod audit;
pub mod inventory;
pub mod purchasing;
pub mod rbac;
pub mod user;

pub use audit::{AuditAction, AuditEntity, AuditEntry, AuditFilter, NewAuditEntry};
pub use inventory::{
    CreateMovement, CreateProduct, Movement, MovementFilter, MovementType, NewMovement, Product,
    ProductChanges, ProductFilter, ProductView, Warehouse, WarehouseChanges, WarehouseFilter,
    WarehouseInput,
};
pub use purchasing::{
    price_items, CreatePurchaseOrder, NewOrderItem, NewPurchaseOrder, OrderChanges, OrderFilter,
    OrderItemInput, OrderStatus, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderItem,
    RejectPurchaseOrder, Supplier, SupplierChanges, SupplierFilter, SupplierInput,
    UpdatePurchaseOrder,
};
pub use rbac::{UserRole, ADMINS, MANAGERS};
pub use user::{
    CreateUser, LoginRequest, LoginResponse, NewUser, SetUserActive, UpdateUser, User, UserChanges,
    UserFilter,
};
