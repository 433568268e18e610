//! In-process store. Every table sits behind one lock, so each repository call
//! is a single atomic step, the same guarantee the Postgres store gets from
//! its transactions and row locks. Used by `STORAGE=memory` and the tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AuditRepository, HealthCheck, MovementRepository, ProductRepository, PurchaseOrderRepository,
    SupplierRepository, UserRepository, WarehouseRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        AuditEntry, AuditFilter, CreateProduct, Movement, MovementFilter, MovementType,
        NewAuditEntry, NewMovement, NewOrderItem, NewPurchaseOrder, NewUser, OrderChanges,
        OrderFilter, OrderStatus, Product, ProductChanges, ProductFilter, PurchaseOrder,
        PurchaseOrderDetail, PurchaseOrderItem, Supplier, SupplierChanges, SupplierFilter,
        SupplierInput, User, UserChanges, UserFilter, Warehouse, WarehouseChanges,
        WarehouseFilter, WarehouseInput,
    },
};

fn duplicate() -> AppError {
    AppError::conflict("Ya existe un registro con esos datos")
}

fn referenced() -> AppError {
    AppError::conflict("El registro está referenciado por otros datos")
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

#[derive(Default)]
struct Tables {
    warehouses: HashMap<Uuid, Warehouse>,
    users: HashMap<Uuid, User>,
    suppliers: HashMap<Uuid, Supplier>,
    products: HashMap<Uuid, Product>,
    movements: Vec<Movement>,
    orders: HashMap<Uuid, PurchaseOrder>,
    order_items: HashMap<Uuid, Vec<PurchaseOrderItem>>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn ensure_warehouse(&self, id: Option<Uuid>) -> AppResult<()> {
        match id {
            Some(id) if !self.warehouses.contains_key(&id) => Err(referenced()),
            _ => Ok(()),
        }
    }

    fn ensure_supplier(&self, id: Option<Uuid>) -> AppResult<()> {
        match id {
            Some(id) if !self.suppliers.contains_key(&id) => Err(referenced()),
            _ => Ok(()),
        }
    }

    fn ensure_products(&self, items: &[NewOrderItem]) -> AppResult<()> {
        if items.iter().all(|item| self.products.contains_key(&item.product_id)) {
            Ok(())
        } else {
            Err(referenced())
        }
    }

    fn code_taken(&self, code: &str, except: Option<Uuid>) -> bool {
        self.products
            .values()
            .any(|p| p.code == code && Some(p.id) != except)
    }

    fn tax_id_taken(&self, tax_id: &str, except: Option<Uuid>) -> bool {
        self.suppliers
            .values()
            .any(|s| s.tax_id.as_deref() == Some(tax_id) && Some(s.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
    }

    fn apply_movement(&mut self, movement: &NewMovement) -> AppResult<Movement> {
        let product = self
            .products
            .get_mut(&movement.product_id)
            .ok_or_else(|| AppError::not_found("Producto"))?;

        let previous_stock = product.stock;
        let new_stock = movement.movement_type.apply(previous_stock, movement.quantity)?;
        let now = Utc::now();
        product.stock = new_stock;
        product.updated_at = now;

        let recorded = Movement {
            id: Uuid::new_v4(),
            product_id: movement.product_id,
            movement_type: movement.movement_type,
            quantity: movement.quantity,
            previous_stock,
            new_stock,
            reason: movement.reason.clone(),
            reference: movement.reference.clone(),
            user_id: movement.user_id,
            created_at: now,
        };
        self.movements.push(recorded.clone());
        Ok(recorded)
    }

    fn build_items(order_id: Uuid, items: &[NewOrderItem]) -> Vec<PurchaseOrderItem> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| PurchaseOrderItem {
                id: Uuid::new_v4(),
                order_id,
                line_no: index as i32 + 1,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
            })
            .collect()
    }

    fn detail(&self, order: PurchaseOrder) -> PurchaseOrderDetail {
        let items = self.order_items.get(&order.id).cloned().unwrap_or_default();
        PurchaseOrderDetail { order, items }
    }

    /// Moves a `pendiente` order into `next`, applying `stamp` to the row.
    fn transition(
        &mut self,
        id: Uuid,
        next: OrderStatus,
        stamp: impl FnOnce(&mut PurchaseOrder),
    ) -> AppResult<PurchaseOrder> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Orden de compra"))?;
        order.status.check_transition(next)?;
        order.status = next;
        order.updated_at = Utc::now();
        stamp(order);
        Ok(order.clone())
    }
}

/// Repository implementations over in-process tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn create(&self, input: &CreateProduct) -> AppResult<Product> {
        let mut tables = self.tables.write().await;
        let code = input.code.trim();
        if tables.code_taken(code, None) {
            return Err(duplicate());
        }
        tables.ensure_supplier(input.supplier_id)?;
        tables.ensure_warehouse(input.warehouse_id)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            category: input.category.clone(),
            price: input.price,
            cost: input.cost,
            stock: 0,
            min_stock: input.min_stock,
            max_stock: input.max_stock,
            supplier_id: input.supplier_id,
            warehouse_id: input.warehouse_id,
            active: input.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, changes: &ProductChanges) -> AppResult<Option<Product>> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Ok(None);
        }
        if let Some(code) = changes.code.as_deref() {
            if tables.code_taken(code.trim(), Some(id)) {
                return Err(duplicate());
            }
        }
        tables.ensure_supplier(changes.supplier_id)?;
        tables.ensure_warehouse(changes.warehouse_id)?;

        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(code) = &changes.code {
            product.code = code.trim().to_string();
        }
        if let Some(name) = &changes.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = &changes.description {
            product.description = Some(description.clone());
        }
        if let Some(category) = &changes.category {
            product.category = Some(category.clone());
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(cost) = changes.cost {
            product.cost = Some(cost);
        }
        if let Some(min_stock) = changes.min_stock {
            product.min_stock = min_stock;
        }
        if let Some(max_stock) = changes.max_stock {
            product.max_stock = Some(max_stock);
        }
        if let Some(supplier_id) = changes.supplier_id {
            product.supplier_id = Some(supplier_id);
        }
        if let Some(warehouse_id) = changes.warehouse_id {
            product.warehouse_id = Some(warehouse_id);
        }
        if let Some(active) = changes.active {
            product.active = active;
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Ok(false);
        }
        let has_movements = tables.movements.iter().any(|m| m.product_id == id);
        let on_orders = tables
            .order_items
            .values()
            .flatten()
            .any(|item| item.product_id == id);
        if has_movements || on_orders {
            return Err(referenced());
        }
        Ok(tables.products.remove(&id).is_some())
    }
}

#[async_trait]
impl MovementRepository for MemoryStore {
    async fn list(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        let tables = self.tables.read().await;
        Ok(tables
            .movements
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Movement>> {
        let tables = self.tables.read().await;
        Ok(tables.movements.iter().find(|m| m.id == id).cloned())
    }

    async fn record(&self, movement: &NewMovement) -> AppResult<Movement> {
        self.tables.write().await.apply_movement(movement)
    }
}

#[async_trait]
impl SupplierRepository for MemoryStore {
    async fn list(&self, filter: &SupplierFilter) -> AppResult<Vec<Supplier>> {
        let tables = self.tables.read().await;
        let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
        Ok(tables
            .suppliers
            .values()
            .filter(|s| {
                search.map_or(true, |term| {
                    contains_ci(&s.name, term)
                        || s.tax_id.as_deref().is_some_and(|t| contains_ci(t, term))
                })
            })
            .filter(|s| filter.active.map_or(true, |active| s.active == active))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Supplier>> {
        Ok(self.tables.read().await.suppliers.get(&id).cloned())
    }

    async fn create(&self, input: &SupplierInput) -> AppResult<Supplier> {
        let mut tables = self.tables.write().await;
        let tax_id = input.tax_id.as_deref().map(str::trim);
        if tax_id.is_some_and(|t| tables.tax_id_taken(t, None)) {
            return Err(duplicate());
        }

        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            tax_id: tax_id.map(str::to_string),
            contact_name: input.contact_name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            active: input.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        tables.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn update(&self, id: Uuid, changes: &SupplierChanges) -> AppResult<Option<Supplier>> {
        let mut tables = self.tables.write().await;
        let tax_id = changes.tax_id.as_deref().map(str::trim);
        if tax_id.is_some_and(|t| tables.tax_id_taken(t, Some(id))) {
            return Err(duplicate());
        }

        let Some(supplier) = tables.suppliers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            supplier.name = name.trim().to_string();
        }
        if let Some(tax_id) = tax_id {
            supplier.tax_id = Some(tax_id.to_string());
        }
        if let Some(contact_name) = &changes.contact_name {
            supplier.contact_name = Some(contact_name.clone());
        }
        if let Some(email) = &changes.email {
            supplier.email = Some(email.clone());
        }
        if let Some(phone) = &changes.phone {
            supplier.phone = Some(phone.clone());
        }
        if let Some(address) = &changes.address {
            supplier.address = Some(address.clone());
        }
        if let Some(active) = changes.active {
            supplier.active = active;
        }
        supplier.updated_at = Utc::now();
        Ok(Some(supplier.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.suppliers.contains_key(&id) {
            return Ok(false);
        }
        if tables.orders.values().any(|o| o.supplier_id == id) {
            return Err(referenced());
        }
        for product in tables.products.values_mut() {
            if product.supplier_id == Some(id) {
                product.supplier_id = None;
            }
        }
        Ok(tables.suppliers.remove(&id).is_some())
    }
}

#[async_trait]
impl WarehouseRepository for MemoryStore {
    async fn list(&self, filter: &WarehouseFilter) -> AppResult<Vec<Warehouse>> {
        let tables = self.tables.read().await;
        let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
        Ok(tables
            .warehouses
            .values()
            .filter(|w| {
                search.map_or(true, |term| {
                    contains_ci(&w.name, term)
                        || w.location.as_deref().is_some_and(|l| contains_ci(l, term))
                })
            })
            .filter(|w| filter.active.map_or(true, |active| w.active == active))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Warehouse>> {
        Ok(self.tables.read().await.warehouses.get(&id).cloned())
    }

    async fn create(&self, input: &WarehouseInput) -> AppResult<Warehouse> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            location: input.location.clone(),
            capacity: input.capacity,
            active: input.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        tables.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(warehouse)
    }

    async fn update(&self, id: Uuid, changes: &WarehouseChanges) -> AppResult<Option<Warehouse>> {
        let mut tables = self.tables.write().await;
        let Some(warehouse) = tables.warehouses.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            warehouse.name = name.trim().to_string();
        }
        if let Some(location) = &changes.location {
            warehouse.location = Some(location.clone());
        }
        if let Some(capacity) = changes.capacity {
            warehouse.capacity = Some(capacity);
        }
        if let Some(active) = changes.active {
            warehouse.active = active;
        }
        warehouse.updated_at = Utc::now();
        Ok(Some(warehouse.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.warehouses.remove(&id).is_none() {
            return Ok(false);
        }
        for product in tables.products.values_mut() {
            if product.warehouse_id == Some(id) {
                product.warehouse_id = None;
            }
        }
        for user in tables.users.values_mut() {
            if user.warehouse_id == Some(id) {
                user.warehouse_id = None;
            }
        }
        for order in tables.orders.values_mut() {
            if order.warehouse_id == Some(id) {
                order.warehouse_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
        Ok(tables
            .users
            .values()
            .filter(|u| search.map_or(true, |term| contains_ci(&u.name, term) || contains_ci(&u.email, term)))
            .filter(|u| filter.role.map_or(true, |role| u.role == role))
            .filter(|u| filter.active.map_or(true, |active| u.active == active))
            .filter(|u| filter.warehouse_id.map_or(true, |id| u.warehouse_id == Some(id)))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        let email = email.trim();
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        let email = user.email.trim().to_lowercase();
        if tables.email_taken(&email, None) {
            return Err(duplicate());
        }
        tables.ensure_warehouse(user.warehouse_id)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name.trim().to_string(),
            email,
            password_hash: user.password_hash.clone(),
            role: user.role,
            active: user.active,
            warehouse_id: user.warehouse_id,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let email = changes.email.as_deref().map(|e| e.trim().to_lowercase());
        if email.as_deref().is_some_and(|e| tables.email_taken(e, Some(id))) {
            return Err(duplicate());
        }
        tables.ensure_warehouse(changes.warehouse_id)?;

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(hash) = &changes.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(active) = changes.active {
            user.active = active;
        }
        if let Some(warehouse_id) = changes.warehouse_id {
            user.warehouse_id = Some(warehouse_id);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        for movement in tables.movements.iter_mut() {
            if movement.user_id == Some(id) {
                movement.user_id = None;
            }
        }
        for order in tables.orders.values_mut() {
            if order.created_by == Some(id) {
                order.created_by = None;
            }
            if order.approved_by == Some(id) {
                order.approved_by = None;
            }
        }
        for entry in tables.audit.iter_mut() {
            if entry.user_id == Some(id) {
                entry.user_id = None;
            }
        }
        Ok(true)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.read().await.users.len() as i64)
    }
}

#[async_trait]
impl PurchaseOrderRepository for MemoryStore {
    async fn list(&self, filter: &OrderFilter) -> AppResult<Vec<PurchaseOrder>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<PurchaseOrderDetail>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).cloned().map(|order| tables.detail(order)))
    }

    async fn create(&self, order: &NewPurchaseOrder) -> AppResult<PurchaseOrderDetail> {
        let mut tables = self.tables.write().await;
        if tables.orders.values().any(|o| o.number == order.number) {
            return Err(duplicate());
        }
        if !tables.suppliers.contains_key(&order.supplier_id) {
            return Err(referenced());
        }
        tables.ensure_warehouse(order.warehouse_id)?;
        tables.ensure_products(&order.items)?;

        let now = Utc::now();
        let header = PurchaseOrder {
            id: Uuid::new_v4(),
            number: order.number.clone(),
            supplier_id: order.supplier_id,
            warehouse_id: order.warehouse_id,
            status: OrderStatus::Pendiente,
            total: order.total,
            notes: order.notes.clone(),
            created_by: order.created_by,
            approved_by: None,
            rejection_reason: None,
            approved_at: None,
            received_at: None,
            created_at: now,
            updated_at: now,
        };
        let items = Tables::build_items(header.id, &order.items);
        tables.orders.insert(header.id, header.clone());
        tables.order_items.insert(header.id, items.clone());
        Ok(PurchaseOrderDetail { order: header, items })
    }

    async fn update(&self, id: Uuid, changes: &OrderChanges) -> AppResult<PurchaseOrderDetail> {
        let mut tables = self.tables.write().await;
        let status = tables
            .orders
            .get(&id)
            .map(|o| o.status)
            .ok_or_else(|| AppError::not_found("Orden de compra"))?;
        if !status.is_editable() {
            return Err(AppError::conflict(format!(
                "Solo se pueden editar órdenes pendientes (estado actual: {})",
                status
            )));
        }
        if changes.supplier_id.is_some() {
            tables.ensure_supplier(changes.supplier_id)?;
        }
        tables.ensure_warehouse(changes.warehouse_id)?;
        if let Some((items, _)) = &changes.items {
            tables.ensure_products(items)?;
        }

        if let Some((items, _)) = &changes.items {
            let rows = Tables::build_items(id, items);
            tables.order_items.insert(id, rows);
        }
        let Some(order) = tables.orders.get_mut(&id) else {
            return Err(AppError::not_found("Orden de compra"));
        };
        if let Some(supplier_id) = changes.supplier_id {
            order.supplier_id = supplier_id;
        }
        if let Some(warehouse_id) = changes.warehouse_id {
            order.warehouse_id = Some(warehouse_id);
        }
        if let Some(notes) = &changes.notes {
            order.notes = Some(notes.clone());
        }
        if let Some((_, total)) = &changes.items {
            order.total = *total;
        }
        order.updated_at = Utc::now();
        let order = order.clone();
        Ok(tables.detail(order))
    }

    async fn approve(&self, id: Uuid, approved_by: Uuid) -> AppResult<PurchaseOrder> {
        let mut tables = self.tables.write().await;
        tables.transition(id, OrderStatus::Aprobada, |order| {
            order.approved_by = Some(approved_by);
            order.approved_at = Some(Utc::now());
        })
    }

    async fn reject(&self, id: Uuid, rejected_by: Uuid, reason: &str) -> AppResult<PurchaseOrder> {
        let mut tables = self.tables.write().await;
        let reason = reason.trim().to_string();
        tables.transition(id, OrderStatus::Rechazada, |order| {
            order.approved_by = Some(rejected_by);
            order.rejection_reason = Some(reason);
        })
    }

    async fn complete(&self, id: Uuid, received_by: Uuid) -> AppResult<(PurchaseOrder, Vec<Movement>)> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Orden de compra"))?;
        order.status.check_transition(OrderStatus::Completada)?;

        let items = tables.order_items.get(&id).cloned().unwrap_or_default();
        let entries: Vec<NewMovement> = items
            .iter()
            .map(|item| NewMovement {
                product_id: item.product_id,
                movement_type: MovementType::Entrada,
                quantity: item.quantity,
                reason: Some(format!("Recepción orden {}", order.number)),
                reference: Some(order.number.clone()),
                user_id: Some(received_by),
            })
            .collect();

        // Roll back to the snapshot if any line fails.
        let products_before = tables.products.clone();
        let ledger_len = tables.movements.len();
        let applied: AppResult<Vec<Movement>> =
            entries.iter().map(|entry| tables.apply_movement(entry)).collect();
        let movements = match applied {
            Ok(movements) => movements,
            Err(err) => {
                tables.products = products_before;
                tables.movements.truncate(ledger_len);
                return Err(err);
            }
        };

        let completed = tables.transition(id, OrderStatus::Completada, |order| {
            order.received_at = Some(Utc::now());
        })?;
        Ok((completed, movements))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(order) = tables.orders.get(&id) else {
            return Ok(false);
        };
        if !order.status.is_deletable() {
            return Err(AppError::conflict(format!(
                "No se puede eliminar una orden en estado '{}'",
                order.status
            )));
        }
        tables.orders.remove(&id);
        tables.order_items.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn append(&self, entry: &NewAuditEntry) -> AppResult<AuditEntry> {
        let mut tables = self.tables.write().await;
        let stored = AuditEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            action: entry.action.as_str().to_string(),
            entity: entry.entity.as_str().to_string(),
            entity_id: entry.entity_id,
            details: entry.details.clone().map(sqlx::types::Json),
            created_at: Utc::now(),
        };
        tables.audit.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, filter: &AuditFilter) -> AppResult<Vec<AuditEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product_input(code: &str) -> CreateProduct {
        CreateProduct {
            code: code.into(),
            name: "Cinta aislante".into(),
            description: None,
            category: Some("Eléctrico".into()),
            price: Decimal::from(3),
            cost: None,
            stock: 0,
            min_stock: 2,
            max_stock: None,
            supplier_id: None,
            warehouse_id: None,
            active: None,
        }
    }

    fn entrada(product_id: Uuid, quantity: i32) -> NewMovement {
        NewMovement {
            product_id,
            movement_type: MovementType::Entrada,
            quantity,
            reason: None,
            reference: None,
            user_id: None,
        }
    }

    #[tokio::test]
    async fn product_codes_are_unique() {
        let store = MemoryStore::new();
        ProductRepository::create(&store, &product_input("CIN-1")).await.unwrap();
        let err = ProductRepository::create(&store, &product_input("CIN-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn movements_update_stock_and_keep_history() {
        let store = MemoryStore::new();
        let product = ProductRepository::create(&store, &product_input("CIN-2")).await.unwrap();

        let first = store.record(&entrada(product.id, 10)).await.unwrap();
        assert_eq!((first.previous_stock, first.new_stock), (0, 10));

        let mut salida = entrada(product.id, 11);
        salida.movement_type = MovementType::Salida;
        let err = store.record(&salida).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));

        let stored = ProductRepository::get(&store, product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 10);
        let history = MovementRepository::list(&store, &MovementFilter::default()).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_salidas_never_oversell() {
        let store = MemoryStore::new();
        let product = ProductRepository::create(&store, &product_input("CIN-3")).await.unwrap();
        store.record(&entrada(product.id, 5)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let mut salida = entrada(product.id, 1);
            salida.movement_type = MovementType::Salida;
            handles.push(tokio::spawn(async move { store.record(&salida).await }));
        }
        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 5);
        let stored = ProductRepository::get(&store, product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 0);
    }

    #[tokio::test]
    async fn products_with_history_cannot_be_deleted() {
        let store = MemoryStore::new();
        let product = ProductRepository::create(&store, &product_input("CIN-4")).await.unwrap();
        store.record(&entrada(product.id, 1)).await.unwrap();
        let err = ProductRepository::delete(&store, product.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_a_warehouse_unlinks_products() {
        let store = MemoryStore::new();
        let warehouse = WarehouseRepository::create(
            &store,
            &WarehouseInput {
                name: "Central".into(),
                location: None,
                capacity: None,
                active: None,
            },
        )
        .await
        .unwrap();
        let mut input = product_input("CIN-5");
        input.warehouse_id = Some(warehouse.id);
        let product = ProductRepository::create(&store, &input).await.unwrap();

        assert!(WarehouseRepository::delete(&store, warehouse.id).await.unwrap());
        let stored = ProductRepository::get(&store, product.id).await.unwrap().unwrap();
        assert_eq!(stored.warehouse_id, None);
    }
}
