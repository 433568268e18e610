use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::Redirect,
};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Product, User, UserRole},
    state::AppState,
    utils::verify_token,
};

pub const AUTH_COOKIE: &str = "auth_token";

/// The authenticated, active user behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    pub fn require_role(&self, roles: &[UserRole]) -> AppResult<()> {
        if self.0.role.is_one_of(roles) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// The warehouse an operator is confined to, if any. Managers see everything.
    pub fn scoped_warehouse(&self) -> Option<Uuid> {
        match self.0.role {
            UserRole::Operador => self.0.warehouse_id,
            UserRole::Admin | UserRole::Supervisor => None,
        }
    }

    pub fn can_access_product(&self, product: &Product) -> bool {
        match self.scoped_warehouse() {
            Some(warehouse_id) => product.warehouse_id == Some(warehouse_id),
            None => true,
        }
    }

    pub fn ensure_product_access(&self, product: &Product) -> AppResult<()> {
        if self.can_access_product(product) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

async fn cookie_token(parts: &mut Parts, state: &AppState) -> Option<String> {
    let cookies = Cookies::from_request_parts(parts, state).await.ok()?;
    cookies.get(AUTH_COOKIE).map(|c| c.value().to_string())
}

/// Resolves the bearer token, falling back to the `auth_token` cookie, to an
/// active user.
async fn authenticate(parts: &mut Parts, state: &AppState) -> AppResult<User> {
    let token = match bearer_token(parts) {
        Some(token) => token,
        None => cookie_token(parts, state).await.ok_or(AppError::Unauthorized)?,
    };

    let claims = verify_token(&token, &state.config.jwt_secret).map_err(|e| {
        log::debug!("rejected token: {}", e);
        AppError::Unauthorized
    })?;
    let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;

    match state.db.users.get(user_id).await? {
        Some(user) if user.active => Ok(user),
        _ => Err(AppError::Unauthorized),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(CurrentUser)
    }
}

/// Same lookup for the HTML panel, which sends anonymous visitors to the
/// login form instead of answering 401.
#[derive(Debug, Clone)]
pub struct PanelUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for PanelUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await
            .map(PanelUser)
            .map_err(|_| Redirect::to("/panel/login"))
    }
}

impl From<PanelUser> for CurrentUser {
    fn from(user: PanelUser) -> Self {
        CurrentUser(user.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn user(role: UserRole, warehouse_id: Option<Uuid>) -> CurrentUser {
        CurrentUser(User {
            id: Uuid::new_v4(),
            name: "Pedro".into(),
            email: "pedro@example.com".into(),
            password_hash: String::new(),
            role,
            active: true,
            warehouse_id,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn product(warehouse_id: Option<Uuid>) -> Product {
        Product {
            id: Uuid::new_v4(),
            code: "P-1".into(),
            name: "Martillo".into(),
            description: None,
            category: None,
            price: Decimal::ONE,
            cost: None,
            stock: 1,
            min_stock: 0,
            max_stock: None,
            supplier_id: None,
            warehouse_id,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn operators_are_confined_to_their_warehouse() {
        let home = Uuid::new_v4();
        let operator = user(UserRole::Operador, Some(home));
        assert_eq!(operator.scoped_warehouse(), Some(home));
        assert!(operator.can_access_product(&product(Some(home))));
        assert!(operator.ensure_product_access(&product(Some(Uuid::new_v4()))).is_err());
        assert!(!operator.can_access_product(&product(None)));
    }

    #[test]
    fn managers_and_unassigned_operators_see_everything() {
        let supervisor = user(UserRole::Supervisor, Some(Uuid::new_v4()));
        assert_eq!(supervisor.scoped_warehouse(), None);
        assert!(supervisor.can_access_product(&product(None)));

        let floating = user(UserRole::Operador, None);
        assert!(floating.can_access_product(&product(Some(Uuid::new_v4()))));
    }

    #[test]
    fn role_checks() {
        assert!(user(UserRole::Admin, None).require_role(&[UserRole::Admin]).is_ok());
        assert!(matches!(
            user(UserRole::Operador, None).require_role(&[UserRole::Admin, UserRole::Supervisor]),
            Err(AppError::Forbidden)
        ));
    }
}
